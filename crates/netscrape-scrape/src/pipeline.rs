//! Concurrent fetch → map pipeline.
//!
//! ```text
//!               ┌──────────────┐  pages   ┌──────────────────────┐
//! PageSource ──►│   fetcher    │─────────►│ mpsc (cap = workers) │
//!               └──────┬───────┘          └──────────┬───────────┘
//!                      │                             │ shared receiver
//!                      │                  ┌──────────┼──────────┐
//!                      │                  ▼          ▼          ▼
//!                      │              worker 0   worker 1 … worker N-1
//!                      │                  │  RecordMapper::map  │
//!                      │                  └──────────┬──────────┘
//!                      ▼                             ▼
//!            watch<bool> cancel ◄──── first error ── Topology
//! ```
//!
//! The first task error is kept and flips the cancel signal; every task
//! races its awaits against that signal and returns quietly once it is set.
//! The run joins every task before reporting.

use crate::config::{ResolvedConfig, ScrapeConfig, Vocabulary};
use crate::error::{MapError, ScrapeError};
use crate::mapper::{RecordMapper, StarMapper};
use crate::record::StarredRepo;
use crate::source::{PageRequest, PageSource};
use netscrape_space::{AddOptions, Plan, Topology};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};

/// Lifecycle of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Planning,
    Fetching,
    Draining,
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Planning => "planning",
            RunState::Fetching => "fetching",
            RunState::Draining => "draining",
            RunState::Done => "done",
            RunState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub resources: usize,
    pub pages: usize,
    pub records: usize,
    pub workers: usize,
}

// ============================================================================
// Shared run state
// ============================================================================

struct Shared {
    cancel: watch::Sender<bool>,
    failure: Mutex<Option<ScrapeError>>,
    pages: AtomicUsize,
    records: AtomicUsize,
}

impl Shared {
    /// Keep `error` if it is the first one, then cancel the run.
    fn fail(&self, task: &str, error: ScrapeError) {
        {
            let mut slot = self.failure.lock();
            if slot.is_none() {
                tracing::error!(task, error = %error, "task failed, cancelling run");
                *slot = Some(error);
            } else {
                tracing::warn!(task, error = %error, "discarding error after first failure");
            }
        }
        self.cancel.send_replace(true);
    }
}

/// Resolves once the run is cancelled.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender gone: nobody can cancel any more.
            return std::future::pending().await;
        }
    }
}

async fn join_all(handles: Vec<JoinHandle<()>>) -> Vec<Result<(), JoinError>> {
    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await);
    }
    results
}

// ============================================================================
// Pipeline
// ============================================================================

/// Generic fetch → map run over any source and mapper with matching records.
pub struct Pipeline<S, M> {
    source: Arc<S>,
    mapper: Arc<M>,
    config: ResolvedConfig,
}

impl<S, M> Pipeline<S, M>
where
    S: PageSource + 'static,
    M: RecordMapper<Record = S::Record> + 'static,
{
    pub fn new(source: Arc<S>, mapper: Arc<M>, config: ResolvedConfig) -> Self {
        Self {
            source,
            mapper,
            config,
        }
    }

    pub async fn run(
        &self,
        plan: &Plan,
        topology: Arc<dyn Topology>,
    ) -> Result<RunReport, ScrapeError> {
        self.run_until(plan, topology, std::future::pending()).await
    }

    /// Run until the source is exhausted, a task fails, or `shutdown`
    /// resolves.
    pub async fn run_until<F>(
        &self,
        plan: &Plan,
        topology: Arc<dyn Topology>,
        shutdown: F,
    ) -> Result<RunReport, ScrapeError>
    where
        F: Future<Output = ()> + Send,
    {
        let workers = self.config.workers;
        tracing::info!(
            state = %RunState::Planning,
            origin = plan.origin(),
            resources = plan.resources().len(),
            "run started"
        );
        for resource in plan.resources() {
            topology
                .add(resource.clone().into(), AddOptions::merge())
                .await?;
        }

        let (cancel, cancel_rx) = watch::channel(false);
        let shared = Arc::new(Shared {
            cancel,
            failure: Mutex::new(None),
            pages: AtomicUsize::new(0),
            records: AtomicUsize::new(0),
        });
        let (tx, rx) = mpsc::channel::<Vec<S::Record>>(workers);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        tracing::info!(
            state = %RunState::Fetching,
            workers,
            per_page = self.config.page_size,
            "launching fetcher and workers"
        );
        let mut handles = Vec::with_capacity(workers + 1);
        {
            let source = Arc::clone(&self.source);
            let shared = Arc::clone(&shared);
            let cancel = cancel_rx.clone();
            let per_page = self.config.page_size;
            handles.push(tokio::spawn(async move {
                if let Err(e) = fetch(source, per_page, tx, cancel, &shared).await {
                    shared.fail("fetcher", e);
                }
            }));
        }
        for id in 0..workers {
            let mapper = Arc::clone(&self.mapper);
            let topology = Arc::clone(&topology);
            let rx = Arc::clone(&rx);
            let shared = Arc::clone(&shared);
            let cancel = cancel_rx.clone();
            handles.push(tokio::spawn(async move {
                if let Err(e) = work(id, mapper, topology, rx, cancel, &shared).await {
                    shared.fail(&format!("worker-{id}"), e);
                }
            }));
        }

        let mut joining = Box::pin(join_all(handles));
        let results = tokio::select! {
            results = &mut joining => results,
            _ = shutdown => {
                shared.fail("shutdown", ScrapeError::Cancelled);
                joining.await
            }
        };
        for result in results {
            if let Err(e) = result {
                shared.fail("join", ScrapeError::Join(e));
            }
        }

        let report = RunReport {
            resources: plan.resources().len(),
            pages: shared.pages.load(Ordering::Relaxed),
            records: shared.records.load(Ordering::Relaxed),
            workers,
        };
        let failure = shared.failure.lock().take();
        match failure {
            Some(error) => {
                tracing::info!(state = %RunState::Failed, error = %error, "run finished");
                Err(error)
            }
            None => {
                tracing::info!(
                    state = %RunState::Done,
                    pages = report.pages,
                    records = report.records,
                    "run finished"
                );
                Ok(report)
            }
        }
    }
}

async fn fetch<S: PageSource>(
    source: Arc<S>,
    per_page: usize,
    tx: mpsc::Sender<Vec<S::Record>>,
    mut cancel: watch::Receiver<bool>,
    shared: &Shared,
) -> Result<(), ScrapeError> {
    let mut cursor = None;
    loop {
        let request = PageRequest { cursor, per_page };
        let page = tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => return Ok(()),
            page = source.fetch_page(request) => page?,
        };
        let pages = shared.pages.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(page = pages, records = page.records.len(), next = ?page.next, "page fetched");

        if !page.records.is_empty() {
            tokio::select! {
                biased;
                _ = cancelled(&mut cancel) => return Ok(()),
                sent = tx.send(page.records) => {
                    if sent.is_err() {
                        return Ok(());
                    }
                }
            }
        }
        match page.next {
            Some(next) => cursor = Some(next),
            None => {
                tracing::info!(state = %RunState::Draining, pages, "source exhausted");
                return Ok(());
            }
        }
    }
}

async fn work<M: RecordMapper>(
    id: usize,
    mapper: Arc<M>,
    topology: Arc<dyn Topology>,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<Vec<M::Record>>>>,
    mut cancel: watch::Receiver<bool>,
    shared: &Shared,
) -> Result<(), ScrapeError> {
    loop {
        let batch = tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => return Ok(()),
            batch = async { rx.lock().await.recv().await } => batch,
        };
        let Some(records) = batch else {
            tracing::debug!(worker = id, "channel closed");
            return Ok(());
        };
        for record in records {
            let mapped = tokio::select! {
                biased;
                _ = cancelled(&mut cancel) => return Ok(()),
                mapped = mapper.map(record, topology.as_ref()) => mapped,
            };
            mapped.map_err(|e| match e {
                MapError::Store(e) => ScrapeError::Store(e),
                other => ScrapeError::Mapping(other),
            })?;
            shared.records.fetch_add(1, Ordering::Relaxed);
        }
    }
}

// ============================================================================
// GitHub stars
// ============================================================================

/// Scrapes a user's starred repositories into a topology.
pub struct Scraper<S> {
    config: ResolvedConfig,
    vocabulary: Vocabulary,
    source: Arc<S>,
}

impl<S> Scraper<S>
where
    S: PageSource<Record = StarredRepo> + 'static,
{
    pub fn new(config: &ScrapeConfig, vocabulary: Vocabulary, source: S) -> Self {
        Self {
            config: config.resolved(),
            vocabulary,
            source: Arc::new(source),
        }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// The resource plan for the configured user.
    pub fn plan(&self) -> Result<Plan, ScrapeError> {
        let origin = self.vocabulary.origin(&self.config.user);
        Ok(self.vocabulary.plan(origin)?)
    }

    pub async fn map(
        &self,
        plan: &Plan,
        topology: Arc<dyn Topology>,
    ) -> Result<RunReport, ScrapeError> {
        self.map_until(plan, topology, std::future::pending()).await
    }

    pub async fn map_until<F>(
        &self,
        plan: &Plan,
        topology: Arc<dyn Topology>,
        shutdown: F,
    ) -> Result<RunReport, ScrapeError>
    where
        F: Future<Output = ()> + Send,
    {
        let mapper = StarMapper::new(self.vocabulary.clone(), plan)?;
        Pipeline::new(Arc::clone(&self.source), Arc::new(mapper), self.config.clone())
            .run_until(plan, topology, shutdown)
            .await
    }
}

#[cfg(test)]
mod tests;

use super::*;
use crate::error::SourceError;
use crate::source::{Page, StaticPages};
use async_trait::async_trait;
use chrono::TimeZone;
use netscrape_space::{MemoryTopology, ObjectKind, Stats, Uid};
use netscrape_store::{ExecutorError, MemoryExecutor, Store};
use std::time::Duration;

fn star(id: &str, owner: &str, topics: &[&str], language: Option<&str>) -> StarredRepo {
    StarredRepo {
        node_id: id.into(),
        name: format!("name-{id}"),
        owner: owner.into(),
        organization: None,
        topics: topics.iter().map(|t| t.to_string()).collect(),
        language: language.map(str::to_string),
        url: format!("https://api.github.com/repos/{owner}/{id}"),
        starred_at: chrono::Utc.with_ymd_and_hms(2021, 1, 2, 3, 4, 5).unwrap(),
    }
}

fn config(workers: i64) -> ScrapeConfig {
    ScrapeConfig {
        user: "alice".into(),
        page_size: 2,
        workers,
    }
}

fn corpus() -> Vec<Vec<StarredRepo>> {
    let topics = ["go", "rust", "graph", "db", "cli"];
    let langs = [Some("Go"), Some("Rust"), None];
    (0..6)
        .map(|p| {
            (0..4)
                .map(|i| {
                    let n = p * 4 + i;
                    star(
                        &format!("R_{n}"),
                        ["alice", "bob", "acme"][n % 3],
                        &[topics[n % 5], topics[(n + 2) % 5]],
                        langs[n % 3],
                    )
                })
                .collect()
        })
        .collect()
}

async fn run_memory(pages: Vec<Vec<StarredRepo>>, workers: i64) -> Arc<MemoryTopology> {
    let scraper = Scraper::new(&config(workers), Vocabulary::default(), StaticPages::new(pages));
    let plan = scraper.plan().unwrap();
    let top = Arc::new(MemoryTopology::new());
    scraper.map(&plan, top.clone()).await.unwrap();
    top
}

// ============================================================================
// Sources and mappers used to drive failures
// ============================================================================

/// Never runs out of pages.
struct Endless;

#[async_trait]
impl PageSource for Endless {
    type Record = StarredRepo;

    async fn fetch_page(&self, req: PageRequest) -> Result<Page<StarredRepo>, SourceError> {
        let n: usize = req.cursor.as_deref().unwrap_or("0").parse().unwrap_or(0);
        Ok(Page {
            records: vec![star(&format!("R_{n}"), "alice", &["go"], None)],
            next: Some((n + 1).to_string()),
        })
    }
}

/// Fails after serving `ok` pages.
struct Broken {
    ok: usize,
}

#[async_trait]
impl PageSource for Broken {
    type Record = StarredRepo;

    async fn fetch_page(&self, req: PageRequest) -> Result<Page<StarredRepo>, SourceError> {
        let n: usize = req.cursor.as_deref().unwrap_or("0").parse().unwrap_or(0);
        if n >= self.ok {
            return Err(SourceError::Unavailable("rate limited".into()));
        }
        Ok(Page {
            records: vec![star(&format!("R_{n}"), "alice", &[], None)],
            next: Some((n + 1).to_string()),
        })
    }
}

/// Rejects one record, delegates the rest.
struct RejectOne {
    inner: StarMapper,
    bad: &'static str,
}

#[async_trait]
impl RecordMapper for RejectOne {
    type Record = StarredRepo;

    async fn map(&self, record: StarredRepo, topology: &dyn Topology) -> Result<(), MapError> {
        if record.node_id == self.bad {
            return Err(MapError::Record {
                record: record.node_id,
                reason: "rejected".into(),
            });
        }
        self.inner.map(record, topology).await
    }
}

/// Takes its time with every record.
struct Slow(StarMapper);

#[async_trait]
impl RecordMapper for Slow {
    type Record = StarredRepo;

    async fn map(&self, record: StarredRepo, topology: &dyn Topology) -> Result<(), MapError> {
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.0.map(record, topology).await
    }
}

fn plan_and_mapper() -> (Plan, StarMapper) {
    let vocab = Vocabulary::default();
    let plan = vocab.plan(vocab.origin("alice")).unwrap();
    let mapper = StarMapper::new(vocab, &plan).unwrap();
    (plan, mapper)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn two_page_scenario() {
    let pages = vec![
        vec![star("R_1", "alice", &["go", "graph"], None)],
        vec![star("R_2", "alice", &["go"], None)],
    ];
    let top = run_memory(pages, 5).await;
    let snap = top.snapshot();

    let entities = |resource: &str| {
        snap.nodes
            .iter()
            .filter(|n| n.kind == ObjectKind::Entity && n.uid.as_str().ends_with(resource))
            .count()
    };
    assert_eq!(entities("-topic"), 2);
    assert_eq!(entities("-lang"), 0);
    assert!(snap.nodes.iter().any(|n| n.uid.as_str() == "R_1"));
    assert!(snap.nodes.iter().any(|n| n.uid.as_str() == "R_2"));

    let into = |topic: &str| {
        let mut from: Vec<&str> = snap
            .edges
            .iter()
            .filter(|e| e.to.as_str() == format!("{topic}-topic"))
            .map(|e| e.from.as_str())
            .collect();
        from.sort();
        from
    };
    assert_eq!(into("go"), vec!["R_1", "R_2"]);
    assert_eq!(into("graph"), vec!["R_1"]);
}

#[tokio::test]
async fn zero_pages_leave_only_the_plan() {
    let top = run_memory(Vec::new(), 3).await;
    assert_eq!(
        top.stats(),
        Stats {
            resources: 4,
            entities: 0,
            edges: 0
        }
    );
}

#[tokio::test]
async fn empty_pages_are_skipped() {
    let pages = vec![Vec::new(), vec![star("R_1", "alice", &[], None)], Vec::new()];
    let scraper = Scraper::new(&config(2), Vocabulary::default(), StaticPages::new(pages));
    let plan = scraper.plan().unwrap();
    let report = scraper
        .map(&plan, Arc::new(MemoryTopology::new()))
        .await
        .unwrap();
    assert_eq!(
        report,
        RunReport {
            resources: 4,
            pages: 3,
            records: 1,
            workers: 2
        }
    );
}

#[tokio::test]
async fn worker_count_does_not_change_the_graph() {
    let one = run_memory(corpus(), 1).await.snapshot();
    let five = run_memory(corpus(), 5).await.snapshot();
    assert_eq!(one, five);
}

#[tokio::test]
async fn rerunning_a_source_is_idempotent() {
    let scraper = Scraper::new(&config(4), Vocabulary::default(), StaticPages::new(corpus()));
    let plan = scraper.plan().unwrap();
    let top = Arc::new(MemoryTopology::new());
    scraper.map(&plan, top.clone()).await.unwrap();
    let first = top.stats();
    scraper.map(&plan, top.clone()).await.unwrap();
    assert_eq!(top.stats(), first);
}

#[tokio::test]
async fn store_backed_run_matches_memory_run() {
    let scraper = Scraper::new(&config(5), Vocabulary::default(), StaticPages::new(corpus()));
    let plan = scraper.plan().unwrap();
    let store = Arc::new(Store::new(MemoryExecutor::new()));
    scraper.map(&plan, store.clone()).await.unwrap();
    scraper.map(&plan, store.clone()).await.unwrap();

    let memory = run_memory(corpus(), 5).await;
    assert_eq!(store.executor().snapshot(), memory.snapshot());
    assert_eq!(store.executor().count_xid("go-topic"), 1);
}

#[tokio::test]
async fn source_error_is_returned() {
    let (plan, mapper) = plan_and_mapper();
    let pipeline = Pipeline::new(Arc::new(Broken { ok: 3 }), Arc::new(mapper), config(2).resolved());
    let err = pipeline
        .run(&plan, Arc::new(MemoryTopology::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, ScrapeError::Source(SourceError::Unavailable(_))));
}

#[tokio::test]
async fn mapping_error_stops_an_endless_run() {
    let (plan, inner) = plan_and_mapper();
    let mapper = RejectOne { inner, bad: "R_7" };
    let pipeline = Pipeline::new(Arc::new(Endless), Arc::new(mapper), config(3).resolved());
    let run = pipeline.run(&plan, Arc::new(MemoryTopology::new()));
    let err = tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .expect("run must stop after the first error")
        .unwrap_err();
    assert!(matches!(err, ScrapeError::Mapping(MapError::Record { .. })));
}

#[tokio::test]
async fn external_shutdown_cancels() {
    let (plan, inner) = plan_and_mapper();
    let pipeline = Pipeline::new(Arc::new(Endless), Arc::new(Slow(inner)), config(2).resolved());
    let top = Arc::new(MemoryTopology::new());
    let run = pipeline.run_until(
        &plan,
        top.clone(),
        tokio::time::sleep(Duration::from_millis(50)),
    );
    let err = tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .expect("shutdown must stop the run")
        .unwrap_err();
    assert!(matches!(err, ScrapeError::Cancelled));
    assert!(top.stats().entities > 0, "some records mapped before shutdown");
}

#[tokio::test]
async fn store_failure_during_planning_is_a_store_error() {
    let scraper = Scraper::new(&config(2), Vocabulary::default(), StaticPages::new(corpus()));
    let plan = scraper.plan().unwrap();
    let store = Arc::new(Store::new(MemoryExecutor::new()));
    store
        .executor()
        .fail_next(ExecutorError::Transport("connection reset".into()));
    let err = scraper.map(&plan, store).await.unwrap_err();
    assert!(matches!(err, ScrapeError::Store(_)));
}

#[tokio::test]
async fn repo_uid_is_the_source_node_id() {
    let top = run_memory(vec![vec![star("MDEwOlJlcG9zaXRvcnkx", "alice", &[], Some("C"))]], 1).await;
    let repo = top
        .get(&Uid::from_external("MDEwOlJlcG9zaXRvcnkx").unwrap())
        .await
        .unwrap();
    assert_eq!(repo.name(), "name-MDEwOlJlcG9zaXRvcnkx");
}

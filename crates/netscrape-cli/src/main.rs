//! netscrape CLI
//!
//! - `plan`: print the resource plan of the configured vocabulary
//! - `scrape`: ingest a JSON fixture of starred repositories into a topology
//! - `schema`: print the graph-database schema

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use netscrape_scrape::{JsonFileSource, NetscrapeConfig, Scraper, StarredRepo};
use netscrape_space::{MemoryTopology, Snapshot, Stats, Topology};
use netscrape_store::{MemoryExecutor, Store, SCHEMA};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "netscrape")]
#[command(author, version, about = "netscrape: scrape paged records into a typed graph")]
struct Cli {
    /// Log at debug level (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resources a scrape registers.
    Plan {
        /// JSON config file (`{"scrape": {...}, "vocabulary": {...}}`)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override the configured user
        #[arg(long)]
        user: Option<String>,
    },

    /// Ingest starred repositories from a JSON file.
    Scrape {
        /// JSON array of starred repositories
        #[arg(long)]
        pages: PathBuf,
        /// JSON config file
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        user: Option<String>,
        /// Records per page (<= 0 selects the default)
        #[arg(long, allow_negative_numbers = true)]
        page_size: Option<i64>,
        /// Mapper workers (<= 0 selects the default)
        #[arg(long, allow_negative_numbers = true)]
        workers: Option<i64>,
        /// Where the graph is built
        #[arg(long, value_enum, default_value_t = BackendKind::Memory)]
        backend: BackendKind,
        /// Write the resulting snapshot as JSON
        #[arg(long)]
        dump: Option<PathBuf>,
    },

    /// Print the graph-database schema.
    Schema,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendKind {
    /// In-memory topology
    Memory,
    /// Store adapter over the in-process executor
    Store,
}

enum Backend {
    Memory(Arc<MemoryTopology>),
    Store(Arc<Store<MemoryExecutor>>),
}

impl Backend {
    fn new(kind: BackendKind) -> Self {
        match kind {
            BackendKind::Memory => Backend::Memory(Arc::new(MemoryTopology::new())),
            BackendKind::Store => Backend::Store(Arc::new(Store::new(MemoryExecutor::new()))),
        }
    }

    fn topology(&self) -> Arc<dyn Topology> {
        match self {
            Backend::Memory(t) => t.clone() as Arc<dyn Topology>,
            Backend::Store(s) => s.clone() as Arc<dyn Topology>,
        }
    }

    fn stats(&self) -> Stats {
        match self {
            Backend::Memory(t) => t.stats(),
            Backend::Store(s) => s.executor().stats(),
        }
    }

    fn snapshot(&self) -> Snapshot {
        match self {
            Backend::Memory(t) => t.snapshot(),
            Backend::Store(s) => s.executor().snapshot(),
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Read the config file if given, otherwise use defaults.
fn load_config(path: Option<&Path>) -> Result<NetscrapeConfig> {
    let Some(path) = path else {
        return Ok(NetscrapeConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    NetscrapeConfig::from_json(&text)
        .with_context(|| format!("invalid config {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Plan { config, user } => {
            let mut cfg = load_config(config.as_deref())?;
            if let Some(user) = user {
                cfg.scrape.user = user;
            }
            cmd_plan(&cfg)
        }
        Commands::Scrape {
            pages,
            config,
            user,
            page_size,
            workers,
            backend,
            dump,
        } => {
            let mut cfg = load_config(config.as_deref())?;
            if let Some(user) = user {
                cfg.scrape.user = user;
            }
            if let Some(n) = page_size {
                cfg.scrape.page_size = n;
            }
            if let Some(n) = workers {
                cfg.scrape.workers = n;
            }
            cmd_scrape(&cfg, &pages, backend, dump.as_deref()).await
        }
        Commands::Schema => {
            print!("{SCHEMA}");
            Ok(())
        }
    }
}

fn cmd_plan(cfg: &NetscrapeConfig) -> Result<()> {
    let vocab = &cfg.vocabulary;
    let plan = vocab.plan(vocab.origin(&cfg.scrape.user))?;
    println!("{} {}", "Plan".green().bold(), plan.origin());
    for r in plan.resources() {
        let scope = if r.namespaced() { "namespaced" } else { "global" };
        println!(
            "  {:<8} {}/{} {} ({}) {}",
            r.name().cyan(),
            r.group(),
            r.version(),
            r.kind(),
            scope,
            r.uid().as_str().dimmed()
        );
    }
    Ok(())
}

async fn cmd_scrape(
    cfg: &NetscrapeConfig,
    pages: &Path,
    kind: BackendKind,
    dump: Option<&Path>,
) -> Result<()> {
    println!(
        "{} stars from {}",
        "Scraping".green().bold(),
        pages.display()
    );
    let source = JsonFileSource::<StarredRepo>::open(pages)
        .await
        .with_context(|| format!("failed to load {}", pages.display()))?;
    let scraper = Scraper::new(&cfg.scrape, cfg.vocabulary.clone(), source);
    tracing::debug!(config = ?scraper.config(), backend = ?kind, "scrape configured");
    let plan = scraper.plan()?;

    let backend = Backend::new(kind);
    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let report = scraper
        .map_until(&plan, backend.topology(), shutdown)
        .await
        .context("scrape failed")?;

    let stats = backend.stats();
    println!(
        "{} {} records from {} pages with {} workers",
        "Mapped".green().bold(),
        report.records,
        report.pages,
        report.workers
    );
    println!(
        "  resources: {}  entities: {}  edges: {}",
        stats.resources.to_string().cyan(),
        stats.entities.to_string().cyan(),
        stats.edges.to_string().cyan()
    );

    if let Some(out) = dump {
        let json = serde_json::to_string_pretty(&backend.snapshot())?;
        fs::write(out, json).with_context(|| format!("failed to write {}", out.display()))?;
        println!("{} snapshot to {}", "Wrote".green().bold(), out.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn config_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"scrape": {{"user": "octocat", "workers": 2}}, "vocabulary": {{"owns": "maintains"}}}}"#
        )
        .unwrap();

        let cfg = load_config(Some(file.path())).unwrap();
        assert_eq!(cfg.scrape.user, "octocat");
        assert_eq!(cfg.scrape.workers, 2);
        assert_eq!(cfg.scrape.page_size, 50);
        assert_eq!(cfg.vocabulary.owns, "maintains");
        assert_eq!(cfg.vocabulary.has_topic, "hasTopic");
    }

    #[test]
    fn missing_or_broken_config_is_an_error() {
        assert!(load_config(Some(Path::new("/nonexistent/netscrape.json"))).is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = load_config(Some(file.path())).unwrap_err();
        assert!(err.to_string().starts_with("invalid config"));

        assert_eq!(load_config(None).unwrap(), NetscrapeConfig::default());
    }

    #[tokio::test]
    async fn scrape_dumps_a_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let pages = dir.path().join("stars.json");
        fs::write(
            &pages,
            r#"[
                {"node_id": "R_1", "name": "netscrape", "owner": "milos",
                 "topics": ["go", "graph"], "language": "Go",
                 "url": "https://api.github.com/repos/milos/netscrape",
                 "starred_at": "2020-06-01T12:00:00Z"},
                {"node_id": "R_2", "name": "other", "owner": "bob", "topics": ["go"],
                 "starred_at": "2020-06-02T12:00:00Z"}
            ]"#,
        )
        .unwrap();
        let out = dir.path().join("snapshot.json");

        for kind in [BackendKind::Memory, BackendKind::Store] {
            cmd_scrape(&NetscrapeConfig::default(), &pages, kind, Some(&out))
                .await
                .unwrap();
            let snap: Snapshot = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
            // 4 resources; 2 repos, 2 owners, 2 topics, 1 lang
            assert_eq!(snap.nodes.len(), 4 + 7);
        }
    }
}

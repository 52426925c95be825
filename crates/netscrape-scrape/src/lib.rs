//! netscrape scrape: paged records in, deduplicated topology out
//!
//! ```text
//! ┌────────────┐   ┌──────────┐   ┌────────────────┐   ┌────────────┐
//! │ PageSource │──►│ fetcher  │──►│ mapper workers │──►│  Topology  │
//! │ (cursor)   │   │ (1 task) │   │ (N tasks)      │   │ (merge)    │
//! └────────────┘   └──────────┘   └────────────────┘   └────────────┘
//! ```
//!
//! [`Scraper`] wires the GitHub stars [`Vocabulary`] and [`StarMapper`] into
//! the generic [`Pipeline`].

pub mod config;
pub mod error;
pub mod mapper;
pub mod pipeline;
pub mod record;
pub mod source;

pub use config::{
    NetscrapeConfig, ResolvedConfig, ResourceSpec, ScrapeConfig, Vocabulary, DEFAULT_PAGE_SIZE,
    DEFAULT_WORKERS,
};
pub use error::{MapError, ScrapeError, SourceError};
pub use mapper::{RecordMapper, StarMapper};
pub use pipeline::{Pipeline, RunReport, RunState, Scraper};
pub use record::StarredRepo;
pub use source::{JsonFileSource, Page, PageRequest, PageSource, StaticPages};

use netscrape_space::{SpaceError, StoreError};

/// Errors raised by a [`PageSource`](crate::PageSource).
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed page data: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("unknown cursor `{0}`")]
    Cursor(String),
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised while turning a record into graph objects.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("record {record}: {reason}")]
    Record { record: String, reason: String },
    #[error(transparent)]
    Space(#[from] SpaceError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of a failed run. Only the first task error is reported.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("page source failed: {0}")]
    Source(#[from] SourceError),
    #[error("mapping failed: {0}")]
    Mapping(#[from] MapError),
    #[error("planning failed: {0}")]
    Plan(#[from] SpaceError),
    #[error("store failed: {0}")]
    Store(#[from] StoreError),
    #[error("run cancelled")]
    Cancelled,
    #[error("task failed to join: {0}")]
    Join(#[from] tokio::task::JoinError),
}

use crate::uid::Uid;

/// Errors raised while building resources, entities and plans.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpaceError {
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("resource {0} is already registered")]
    ResourceExists(String),
    #[error("no resource matches {0}")]
    ResourceNotFound(String),
    #[error("{matches} resources match {query}, expected one")]
    AmbiguousQuery { query: String, matches: usize },
}

impl SpaceError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by a [`Topology`](crate::Topology) implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The value (or a decoded payload) is neither a resource nor an entity.
    #[error("unsupported value: {0}")]
    Unsupported(String),
    #[error("node {0} not found")]
    NotFound(Uid),
    /// More than one node carries a uid that must be unique. Never retried.
    #[error("duplicate node {uid}: {count} matches")]
    DuplicateNode { uid: Uid, count: usize },
    /// A conditional guard refused the write.
    #[error("precondition not met for {uid}: {reason}")]
    PreconditionNotMet { uid: Uid, reason: String },
    #[error("backend error: {0}")]
    Backend(String),
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
    #[error(transparent)]
    Space(#[from] SpaceError),
}

impl StoreError {
    pub fn precondition(uid: &Uid, reason: impl Into<String>) -> Self {
        Self::PreconditionNotMet {
            uid: uid.clone(),
            reason: reason.into(),
        }
    }

    /// True for invariant violations that no caller should try to recover from.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DuplicateNode { .. })
    }
}

use crate::request::{Request, Response};
use async_trait::async_trait;
use netscrape_space::StoreError;

/// Errors raised by an [`Executor`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecutorError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("transaction aborted: {0}")]
    Aborted(String),
}

impl From<ExecutorError> for StoreError {
    fn from(e: ExecutorError) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// Runs a [`Request`] atomically: the query binds variables, then each
/// mutation whose condition holds is applied, all in one transaction.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, request: Request) -> Result<Response, ExecutorError>;
}

#[async_trait]
impl<E: Executor + ?Sized> Executor for std::sync::Arc<E> {
    async fn execute(&self, request: Request) -> Result<Response, ExecutorError> {
        (**self).execute(request).await
    }
}

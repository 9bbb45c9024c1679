//! Query timeout helpers.
//!
//! Store calls run inside chat actors and timer jobs; a stalled query must
//! fail that one action instead of freezing the chat.

use std::{future::Future, time::Duration};
use tokio::time::timeout;

/// Budget for a single store query.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Error type for timeout operations
#[derive(Debug, thiserror::Error)]
pub enum TimeoutError {
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for timeout operations
pub type TimeoutResult<T> = Result<T, TimeoutError>;

/// Run a query future, failing with [`TimeoutError::Timeout`] if it has not
/// completed within `duration`.
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> TimeoutResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match timeout(duration, future).await {
        Ok(result) => result.map_err(TimeoutError::Database),
        Err(_) => Err(TimeoutError::Timeout(duration)),
    }
}

/// [`with_timeout`] with [`DEFAULT_QUERY_TIMEOUT`].
pub async fn with_default_timeout<F, T>(future: F) -> TimeoutResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    with_timeout(DEFAULT_QUERY_TIMEOUT, future).await
}

//! Database timeout helpers
//!
//! Bounds every repository call so a stuck connection surfaces as an error
//! instead of holding a tournament lock forever.

use crate::tournament::{TournamentError, TournamentResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Default timeout for single queries (5 seconds)
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for commit transactions (10 seconds)
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Execute a repository operation with timeout
///
/// # Arguments
///
/// * `duration` - Timeout duration
/// * `future` - Async operation to execute
///
/// # Returns
///
/// * `TournamentResult<T>` - Result, or `StorageTimeout` if `duration` elapsed
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> TournamentResult<T>
where
    F: Future<Output = TournamentResult<T>>,
{
    match timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(TournamentError::StorageTimeout(duration)),
    }
}

/// Execute a query with the default timeout (5 seconds)
pub async fn with_query_timeout<F, T>(future: F) -> TournamentResult<T>
where
    F: Future<Output = TournamentResult<T>>,
{
    with_timeout(DEFAULT_QUERY_TIMEOUT, future).await
}

/// Execute a commit with the transaction timeout (10 seconds)
pub async fn with_transaction_timeout<F, T>(future: F) -> TournamentResult<T>
where
    F: Future<Output = TournamentResult<T>>,
{
    with_timeout(DEFAULT_TRANSACTION_TIMEOUT, future).await
}

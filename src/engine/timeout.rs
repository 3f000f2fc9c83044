//! Timeout protection for database operations
//!
//! Operations are bounded but never retried: a failure is surfaced to the caller as-is.

use crate::error::GateError;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Run a database operation under a time budget
///
/// When the budget is exceeded the operation future is dropped, which releases any
/// connection or transaction it holds.
///
/// # Errors
/// * `GateError::Timeout` when `limit` elapses first
/// * the operation's own error otherwise
///
/// # Example
///
/// ```rust
/// # use readonly_sql_gate::engine::timeout::execute_with_timeout;
/// # use std::time::Duration;
/// # #[tokio::main]
/// # async fn main() -> Result<(), readonly_sql_gate::error::GateError> {
/// let rows = execute_with_timeout(
///     Duration::from_secs(5),
///     "Listing tables",
///     async { Ok::<Vec<String>, sqlx::Error>(vec![]) },
/// )
/// .await?;
/// assert!(rows.is_empty());
/// # Ok(())
/// # }
/// ```
pub async fn execute_with_timeout<T, E, Fut>(
    limit: Duration,
    operation: &str,
    fut: Fut,
) -> Result<T, GateError>
where
    Fut: Future<Output = Result<T, E>>,
    E: Into<GateError>,
{
    match timeout(limit, fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => {
            log::warn!("{} timed out after {:?}", operation, limit);
            Err(GateError::Timeout {
                operation: operation.to_string(),
                after: limit,
            })
        }
    }
}

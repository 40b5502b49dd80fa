//! Retry of write transactions on SQLite lock contention
//!
//! Mutations open a deferred transaction, read, then write. Under WAL a
//! concurrent commit between the read and the write fails the upgrade with
//! `SQLITE_BUSY_SNAPSHOT` (517), which the busy timeout never retries. The
//! whole transaction is rerun instead, with exponential backoff.

use std::future::Future;
use std::time::{Duration, Instant};

use crate::{Error, Result};

/// Longest time a mutation keeps retrying before giving up
pub const LOCK_WAIT: Duration = Duration::from_millis(10_000);

const INITIAL_BACKOFF_MS: u64 = 5;
const MAX_BACKOFF_MS: u64 = 500;

/// SQLITE_BUSY and its extended codes (BUSY_RECOVERY, BUSY_SNAPSHOT, BUSY_TIMEOUT)
fn is_busy_code(code: &str) -> bool {
    matches!(code, "5" | "261" | "517" | "773")
}

/// True for errors that rerunning the transaction can clear
pub fn is_lock_error(err: &Error) -> bool {
    match err {
        Error::Database(sqlx::Error::Database(db_err)) => {
            db_err.code().map(|c| is_busy_code(&c)).unwrap_or(false)
                || db_err.message().contains("database is locked")
        }
        _ => false,
    }
}

/// Run `operation` until it succeeds, fails with a non-lock error, or
/// `max_wait` elapses
///
/// `operation` must be safe to rerun from scratch: each attempt opens and
/// commits (or drops) its own transaction.
pub async fn retry_on_lock<F, Fut, T>(
    operation_name: &str,
    max_wait: Duration,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let start_time = Instant::now();
    let mut attempt = 0u32;
    let mut backoff_ms = INITIAL_BACKOFF_MS;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        "Database operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) if !is_lock_error(&err) => return Err(err),
            Err(err) => {
                let elapsed = start_time.elapsed();
                if elapsed >= max_wait {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Database still locked, giving up: {}",
                        err
                    );
                    return Err(Error::Internal(format!(
                        "{}: database locked after {} attempts ({} ms)",
                        operation_name,
                        attempt,
                        elapsed.as_millis()
                    )));
                }

                tracing::debug!(
                    operation = operation_name,
                    attempt,
                    backoff_ms,
                    "Database locked, retrying"
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_succeeds_first_attempt() {
        let result = retry_on_lock("test_op", LOCK_WAIT, || async { Ok::<i32, Error>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_non_lock_error_fails_immediately() {
        let mut attempts = 0;

        let result = retry_on_lock("test_op", LOCK_WAIT, || {
            attempts += 1;
            async { Err::<i32, Error>(Error::InvalidInput("bad".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert_eq!(attempts, 1);
    }

    #[test]
    fn test_busy_codes() {
        assert!(is_busy_code("5"));
        assert!(is_busy_code("517"));
        assert!(!is_busy_code("19"));
        assert!(!is_lock_error(&Error::Internal("database is locked".to_string())));
    }
}

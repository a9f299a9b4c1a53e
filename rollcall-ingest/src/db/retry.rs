//! Lock retry for SQLite writes
//!
//! Concurrent batch workers share one database file. A write that hits
//! "database is locked" is retried with exponential backoff until
//! `max_wait_ms` has elapsed; every other error is returned at once.

use crate::error::StorageError;
use std::future::Future;
use std::time::{Duration, Instant};

const INITIAL_BACKOFF_MS: u64 = 10;
const MAX_BACKOFF_MS: u64 = 1000;

/// Run `operation`, retrying while the database reports a lock
///
/// Backoff starts at 10ms and doubles up to 1s per attempt. Once
/// `max_wait_ms` has elapsed the last lock error becomes
/// [`StorageError::LockTimeout`].
pub async fn retry_on_lock<F, Fut, T>(
    operation_name: &str,
    max_wait_ms: u64,
    mut operation: F,
) -> Result<T, StorageError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StorageError>>,
{
    let start_time = Instant::now();
    let max_duration = Duration::from_millis(max_wait_ms);
    let mut attempt: u32 = 0;
    let mut backoff_ms = INITIAL_BACKOFF_MS;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    let elapsed_ms = start_time.elapsed().as_millis();
                    if elapsed_ms > 2000 {
                        tracing::warn!(
                            operation = operation_name,
                            attempt,
                            elapsed_ms,
                            "Database write succeeded after a long lock wait"
                        );
                    } else {
                        tracing::debug!(
                            operation = operation_name,
                            attempt,
                            elapsed_ms,
                            "Database write succeeded after retry"
                        );
                    }
                }
                return Ok(result);
            }
            Err(err) if is_lock_error(&err) => {
                let elapsed = start_time.elapsed();

                if elapsed >= max_duration {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = elapsed.as_millis(),
                        max_wait_ms,
                        "Giving up on locked database"
                    );
                    return Err(StorageError::LockTimeout {
                        attempts: attempt,
                        elapsed_ms: elapsed.as_millis(),
                        max_wait_ms,
                    });
                }

                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms,
                    remaining_ms = max_duration.saturating_sub(elapsed).as_millis(),
                    "Database locked, retrying"
                );

                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
            }
            Err(err) => return Err(err),
        }
    }
}

fn is_lock_error(err: &StorageError) -> bool {
    match err {
        StorageError::Database(db_err) => db_err.to_string().contains("database is locked"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn locked() -> StorageError {
        StorageError::Database(sqlx::Error::Protocol("database is locked".to_string()))
    }

    #[tokio::test]
    async fn test_succeeds_first_attempt() {
        let result = retry_on_lock("test_op", 5000, || async { Ok::<i32, StorageError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_succeeds_after_lock_errors() {
        let attempts = AtomicU32::new(0);

        let result = retry_on_lock("test_op", 5000, || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if attempt < 3 {
                    Err(locked())
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_times_out_when_lock_persists() {
        let result = retry_on_lock("test_op", 50, || async { Err::<i32, StorageError>(locked()) }).await;

        match result {
            Err(StorageError::LockTimeout { attempts, max_wait_ms, .. }) => {
                assert!(attempts > 1);
                assert_eq!(max_wait_ms, 50);
            }
            other => panic!("expected LockTimeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_other_errors_fail_immediately() {
        let attempts = AtomicU32::new(0);

        let result = retry_on_lock("test_op", 5000, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, StorageError>(StorageError::UnknownEvent("E1".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(StorageError::UnknownEvent(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}

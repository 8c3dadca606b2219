//! Retry of writes that hit SQLite writer contention
//!
//! Only "database is locked" / "database is busy" errors are retried; any
//! other error is returned on the first attempt.

use crate::{Error, Result};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const FIRST_DELAY: Duration = Duration::from_millis(10);
const MAX_DELAY: Duration = Duration::from_secs(1);

/// Doubling delays, 10 ms up to 1 s
#[derive(Debug, Clone)]
struct Backoff {
    next: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self { next: FIRST_DELAY }
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next;
        self.next = (current * 2).min(MAX_DELAY);
        Some(current)
    }
}

/// Run `operation` until it succeeds, fails with a non-lock error, or
/// `max_wait_ms` has passed since the first attempt
pub async fn retry_on_lock<F, Fut, T>(operation_name: &str, max_wait_ms: u64, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let deadline = started + Duration::from_millis(max_wait_ms);
    let mut delays = Backoff::default();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;

        let err = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Succeeded after lock retries"
                    );
                }
                return Ok(value);
            }
            Err(e) if e.is_lock_error() => e,
            Err(e) => return Err(e),
        };

        let now = Instant::now();
        if now >= deadline {
            warn!(operation = operation_name, attempt, max_wait_ms, "Giving up on locked database: {}", err);
            return Err(Error::Internal(format!(
                "{}: database locked after {} attempts in {} ms",
                operation_name,
                attempt,
                started.elapsed().as_millis()
            )));
        }

        let delay = delays.next().unwrap_or(MAX_DELAY).min(deadline - now);
        debug!(
            operation = operation_name,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "Database locked, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn locked() -> Error {
        Error::Database(sqlx::Error::Protocol("database is locked".to_string()))
    }

    #[test]
    fn test_backoff_doubles_to_cap() {
        let delays: Vec<u64> = Backoff::default().take(9).map(|d| d.as_millis() as u64).collect();
        assert_eq!(delays, vec![10, 20, 40, 80, 160, 320, 640, 1000, 1000]);
    }

    #[tokio::test]
    async fn test_lock_errors_are_retried() {
        let calls = AtomicU32::new(0);

        let value = retry_on_lock("upsert history", 5000, || {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if call < 2 {
                    Err(locked())
                } else {
                    Ok("written")
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, "written");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_at_deadline() {
        let started = Instant::now();
        let err = retry_on_lock("upsert news", 50, || async { Err::<(), _>(locked()) })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Internal(ref msg) if msg.starts_with("upsert news: database locked")));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let calls = AtomicU32::new(0);

        let err = retry_on_lock("upsert news", 5000, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(Error::InvalidInput("unknown column".to_string())) }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

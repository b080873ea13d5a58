//! Fail-open utilities for graceful degradation
//!
//! Evidence capture must never change the outcome of a case. Operations run
//! through these helpers log their failure via `tracing::warn!` and yield `None`.
//!
//! DO NOT use fail-open for:
//! - Control resolution (it has its own `NotFound` outcome)
//! - Actions (their errors decide the verdict)
//! - Structural verification reads

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::Result;

/// Execute an operation that should fail open
///
/// # Usage
///
/// ```no_run
/// use prosecheck_core::fail_open::fail_open;
/// use prosecheck_core::Result;
///
/// async fn save_screenshot() -> Result<()> {
///     Ok(())
/// }
///
/// async fn example() {
///     let saved = fail_open("evidence::save", || save_screenshot()).await;
///     // saved is None if save_screenshot() failed
/// }
/// ```
pub async fn fail_open<F, Fut, T>(operation_name: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match f().await {
        Ok(val) => Some(val),
        Err(e) => {
            warn!("{} failed (fail-open): {}", operation_name, e);
            None
        }
    }
}

/// Like fail_open but with linear backoff retries
///
/// The backoff before attempt `n + 1` is `backoff * n`.
pub async fn fail_open_with_retries<F, Fut, T>(
    operation_name: &str,
    mut f: F,
    max_retries: usize,
    backoff: Duration,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    for attempt in 1..=max_retries {
        match f().await {
            Ok(val) => return Some(val),
            Err(e) => {
                if attempt == max_retries {
                    warn!(
                        "{} failed after {} attempts (fail-open): {}",
                        operation_name, max_retries, e
                    );
                    return None;
                }
                warn!(
                    "{} failed (attempt {}/{}): {}",
                    operation_name, attempt, max_retries, e
                );
                tokio::time::sleep(backoff * attempt as u32).await;
            }
        }
    }
    None
}

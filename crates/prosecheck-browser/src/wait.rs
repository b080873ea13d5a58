//! Polling helpers for asynchronous UI updates

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Poll `probe` until it yields a value or `timeout` elapses
///
/// The probe always runs at least once, so a zero timeout is a single check.
pub async fn poll_for<F, Fut, T, E>(
    timeout: Duration,
    interval: Duration,
    mut probe: F,
) -> Result<Option<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = probe().await? {
            return Ok(Some(value));
        }
        if Instant::now() + interval > deadline {
            return Ok(None);
        }
        sleep(interval).await;
    }
}

/// Wait until `predicate` holds, giving up after `timeout`
///
/// Timing out is not an error: the caller proceeds and the structural
/// verification decides the outcome. Returns whether the predicate held.
pub async fn await_stable<F, Fut>(
    label: &str,
    timeout: Duration,
    interval: Duration,
    mut predicate: F,
) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let started = Instant::now();
    let held = poll_for(timeout, interval, || {
        let check = predicate();
        async move { Ok::<_, std::convert::Infallible>(check.await.then_some(())) }
    })
    .await
    .ok()
    .flatten()
    .is_some();

    if held {
        debug!("'{}' stable after {:?}", label, started.elapsed());
    } else {
        warn!("'{}' not stable after {:?}, continuing", label, timeout);
    }
    held
}

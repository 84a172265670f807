//! Wait-for-predicate polling.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep};

use crate::error::Result;

/// Poll `probe` every `interval` until it returns `true` or `timeout` elapses.
///
/// Returns `Ok(false)` on timeout. Errors from the probe end the wait
/// immediately.
pub async fn wait_until<F, Fut>(timeout: Duration, interval: Duration, mut probe: F) -> Result<bool>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if probe().await? {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            return Ok(false);
        }
        sleep(interval).await;
    }
}

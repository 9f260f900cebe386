//! Poll-with-interval primitive for chain time gates.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Re-evaluate `probe` every `interval` until it reports `true`.
///
/// Returns the number of probes made. There is no deadline: the wait only
/// ends when the condition holds or the probe fails.
pub async fn poll_until<F, Fut, E>(interval: Duration, mut probe: F) -> Result<u32, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let mut probes = 0u32;
    loop {
        probes += 1;
        if probe().await? {
            return Ok(probes);
        }
        tracing::debug!(probes = probes, "Condition not met yet, polling again");
        sleep(interval).await;
    }
}

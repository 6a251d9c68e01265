use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::error::TriggerError;

/// Call `probe` every `interval` until it yields a value.
///
/// The first probe runs immediately. With a `timeout`, one last probe runs at
/// the deadline before giving up with [`TriggerError::Timeout`]. Cancelling
/// `cancel` stops the wait between probes.
pub async fn poll_until<T, F, Fut>(
  interval: Duration,
  timeout: Option<Duration>,
  cancel: &CancellationToken,
  mut probe: F,
) -> Result<T, TriggerError>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<Option<T>, TriggerError>>,
{
  let started = Instant::now();
  let deadline = timeout.map(|t| started + t);

  loop {
    if cancel.is_cancelled() {
      return Err(TriggerError::Cancelled);
    }

    if let Some(value) = probe().await? {
      return Ok(value);
    }

    let now = Instant::now();
    if deadline.is_some_and(|deadline| now >= deadline) {
      return Err(TriggerError::Timeout {
        waited: now - started,
      });
    }

    let mut wake = now + interval;
    if let Some(deadline) = deadline {
      wake = wake.min(deadline);
    }

    tokio::select! {
      _ = cancel.cancelled() => return Err(TriggerError::Cancelled),
      _ = sleep_until(wake) => {}
    }
  }
}

//! Invocation by publishing to a function's trigger queue.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::TriggerError;
use crate::result::ExecutionResult;
use crate::transport::{InvokeContext, QueueHandle, QueueKind};
use crate::wait::poll_until;

/// A function fed by a message queue, reporting back on a result queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueTrigger {
  pub name: String,
  pub storage_account: String,
  pub region: String,
  pub queue: QueueHandle,
  pub result_queue: QueueHandle,
}

impl QueueTrigger {
  /// A trigger using the function's conventional `{name}-trigger` and
  /// `{name}-result` queues.
  pub fn new(
    name: impl Into<String>,
    storage_account: impl Into<String>,
    region: impl Into<String>,
  ) -> Self {
    let name = name.into();
    let storage_account = storage_account.into();
    let region = region.into();
    Self {
      queue: QueueHandle::for_function(&name, QueueKind::Trigger, &storage_account, &region),
      result_queue: QueueHandle::for_function(&name, QueueKind::Result, &storage_account, &region),
      name,
      storage_account,
      region,
    }
  }

  /// Provision both queues.
  #[instrument(name = "queue.create", skip_all, fields(function = %self.name))]
  pub async fn create(&self, ctx: &InvokeContext) -> Result<(), TriggerError> {
    let queues = ctx.transports.queues()?;
    for handle in [&self.queue, &self.result_queue] {
      queues
        .create_queue(handle)
        .await
        .map_err(|source| TriggerError::Provisioning {
          resource: handle.name.clone(),
          source,
        })?;
      info!(queue = %handle.name, "queue ready");
    }
    Ok(())
  }

  #[instrument(name = "queue.invoke", skip_all, fields(function = %self.name, queue = %self.queue.name))]
  pub async fn sync_invoke(
    &self,
    ctx: &InvokeContext,
    payload: &serde_json::Value,
    cancel: &CancellationToken,
  ) -> Result<ExecutionResult, TriggerError> {
    let queues = ctx.transports.queues()?;
    let message = STANDARD.encode(payload.to_string());

    let begin = Utc::now();
    if let Err(e) = queues.send_message(&self.queue, message).await {
      warn!(error = %e, "failed to publish invocation");
      return Ok(ExecutionResult::failed(begin, Utc::now()));
    }
    debug!("invocation published");

    await_result(ctx, &self.result_queue, begin, cancel).await
  }
}

/// Wait for a function's report on its result queue.
///
/// Shared by the queue and storage triggers. The first read happens right
/// away; later reads follow the result poll interval.
pub(crate) async fn await_result(
  ctx: &InvokeContext,
  result_queue: &QueueHandle,
  begin: chrono::DateTime<Utc>,
  cancel: &CancellationToken,
) -> Result<ExecutionResult, TriggerError> {
  let queues = ctx.transports.queues()?;

  let message = poll_until(
    ctx.config.result_poll_interval(),
    ctx.config.timeout(),
    cancel,
    move || async move {
      match queues.receive_message(result_queue).await {
        Ok(message) => Ok(message),
        Err(e) => {
          warn!(error = %e, queue = %result_queue.name, "result queue read failed");
          Ok(None)
        }
      }
    },
  )
  .await?;
  let end = Utc::now();

  let mut result = ExecutionResult::from_times(begin, end);
  match decode_report(&message) {
    Some(report) => result.parse_benchmark_output(report),
    None => {
      warn!(queue = %result_queue.name, "result message is not a JSON report");
      result.stats.failure = true;
    }
  }
  Ok(result)
}

/// Result messages are JSON, optionally base64 wrapped.
fn decode_report(message: &str) -> Option<serde_json::Value> {
  if let Ok(value) = serde_json::from_str(message) {
    return Some(value);
  }
  let bytes = STANDARD.decode(message.trim()).ok()?;
  serde_json::from_slice(&bytes).ok()
}

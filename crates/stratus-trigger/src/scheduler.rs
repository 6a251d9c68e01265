//! Bounded background execution of invocations.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span};

use crate::error::TriggerError;
use crate::result::ExecutionResult;
use crate::transport::InvokeContext;
use crate::trigger::Trigger;

/// Runs invocations on the tokio runtime, at most `max_in_flight` at once.
///
/// Submissions past the limit are accepted and wait for a free slot.
pub struct Scheduler {
  context: Arc<InvokeContext>,
  permits: Arc<Semaphore>,
  cancel: CancellationToken,
}

impl Scheduler {
  pub fn new(context: InvokeContext) -> Self {
    let slots = context
      .config
      .max_in_flight
      .clamp(1, Semaphore::MAX_PERMITS);
    let permits = Arc::new(Semaphore::new(slots));
    Self {
      context: Arc::new(context),
      permits,
      cancel: CancellationToken::new(),
    }
  }

  pub fn context(&self) -> &InvokeContext {
    &self.context
  }

  /// Start an invocation in the background.
  ///
  /// Must be called from within a tokio runtime.
  pub fn submit(
    &self,
    trigger: Trigger,
    payload: serde_json::Value,
  ) -> Result<InvocationHandle, TriggerError> {
    if self.cancel.is_cancelled() {
      return Err(TriggerError::SchedulerClosed);
    }

    let context = self.context.clone();
    let permits = self.permits.clone();
    let cancel = self.cancel.child_token();
    let task_cancel = cancel.clone();
    let span = info_span!("invocation", trigger = %trigger.trigger_type(), name = %trigger.name());

    let join = tokio::spawn(
      async move {
        let _permit = tokio::select! {
          biased;
          _ = task_cancel.cancelled() => return Err(TriggerError::Cancelled),
          permit = permits.acquire_owned() => permit.map_err(|_| TriggerError::SchedulerClosed)?,
        };
        debug!("slot acquired");
        trigger.sync_invoke(&context, &payload, &task_cancel).await
      }
      .instrument(span),
    );

    Ok(InvocationHandle { join, cancel })
  }

  /// Stop accepting work and cancel everything still running or queued.
  pub fn shutdown(&self) {
    self.cancel.cancel();
    self.permits.close();
  }

  pub fn is_shutdown(&self) -> bool {
    self.cancel.is_cancelled()
  }
}

/// A running invocation. Join it to obtain the result or its failure.
#[derive(Debug)]
pub struct InvocationHandle {
  join: JoinHandle<Result<ExecutionResult, TriggerError>>,
  cancel: CancellationToken,
}

impl InvocationHandle {
  /// Request cancellation. Joining then yields [`TriggerError::Cancelled`]
  /// unless the invocation already finished.
  pub fn cancel(&self) {
    self.cancel.cancel();
  }

  pub fn is_finished(&self) -> bool {
    self.join.is_finished()
  }

  pub async fn join(self) -> Result<ExecutionResult, TriggerError> {
    match self.join.await {
      Ok(result) => result,
      Err(e) if e.is_cancelled() => Err(TriggerError::Cancelled),
      Err(e) => Err(TriggerError::Join(e.to_string())),
    }
  }
}

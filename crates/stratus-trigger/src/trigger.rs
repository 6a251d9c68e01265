use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::error::TriggerError;
use crate::http::HttpTrigger;
use crate::library::LibraryTrigger;
use crate::queue::QueueTrigger;
use crate::result::ExecutionResult;
use crate::scheduler::{InvocationHandle, Scheduler};
use crate::storage::StorageTrigger;
use crate::transport::InvokeContext;

/// Discriminator of a trigger variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerType {
  Library,
  Http,
  Queue,
  Storage,
}

impl TriggerType {
  /// Name used in persisted records.
  pub fn as_str(self) -> &'static str {
    match self {
      TriggerType::Library => "Library",
      TriggerType::Http => "HTTP",
      TriggerType::Queue => "Queue",
      TriggerType::Storage => "Storage",
    }
  }
}

impl std::fmt::Display for TriggerType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// An invocation binding to one deployed function or workflow.
///
/// Persisted as a flat record `{"type": ..., "name": ..., ...}` that restores
/// the trigger with the same resource handles and without provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Trigger {
  Library(LibraryTrigger),
  #[serde(rename = "HTTP")]
  Http(HttpTrigger),
  Queue(QueueTrigger),
  Storage(StorageTrigger),
}

impl Trigger {
  /// Name of the deployed function or workflow.
  pub fn name(&self) -> &str {
    match self {
      Trigger::Library(t) => &t.name,
      Trigger::Http(t) => &t.name,
      Trigger::Queue(t) => &t.name,
      Trigger::Storage(t) => &t.name,
    }
  }

  pub fn trigger_type(&self) -> TriggerType {
    match self {
      Trigger::Library(_) => TriggerType::Library,
      Trigger::Http(_) => TriggerType::Http,
      Trigger::Queue(_) => TriggerType::Queue,
      Trigger::Storage(_) => TriggerType::Storage,
    }
  }

  /// The `type` field of this trigger's record.
  pub fn typename(&self) -> &'static str {
    self.trigger_type().as_str()
  }

  pub fn to_record(&self) -> Result<serde_json::Value, TriggerError> {
    serde_json::to_value(self).map_err(|e| TriggerError::InvalidRecord(e.to_string()))
  }

  pub fn from_record(record: &serde_json::Value) -> Result<Self, TriggerError> {
    Self::deserialize(record).map_err(|e| TriggerError::InvalidRecord(e.to_string()))
  }

  /// Provision the resources the trigger relies on.
  ///
  /// Queue and storage triggers create their queues and container. Library
  /// and HTTP triggers have nothing to provision.
  #[instrument(skip_all, fields(trigger = %self.trigger_type(), name = %self.name()))]
  pub async fn create(&self, ctx: &InvokeContext) -> Result<(), TriggerError> {
    match self {
      Trigger::Library(_) | Trigger::Http(_) => Ok(()),
      Trigger::Queue(t) => t.create(ctx).await,
      Trigger::Storage(t) => t.create(ctx).await,
    }
  }

  /// Invoke the target and wait for its result.
  ///
  /// Transport failures yield a result with the failure flag set. Errors are
  /// returned only for a missing client, a passed deadline or cancellation.
  #[instrument(skip_all, fields(trigger = %self.trigger_type(), name = %self.name()))]
  pub async fn sync_invoke(
    &self,
    ctx: &InvokeContext,
    payload: &serde_json::Value,
    cancel: &CancellationToken,
  ) -> Result<ExecutionResult, TriggerError> {
    let result = match self {
      Trigger::Library(t) => t.sync_invoke(ctx, payload, cancel).await,
      Trigger::Http(t) => t.sync_invoke(ctx, payload, cancel).await,
      Trigger::Queue(t) => t.sync_invoke(ctx, payload, cancel).await,
      Trigger::Storage(t) => t.sync_invoke(ctx, payload, cancel).await,
    }?;

    info!(
      request_id = %result.request_id,
      client_us = result.times.client_us,
      failure = result.stats.failure,
      "invocation finished"
    );
    Ok(result)
  }

  /// Run [`Trigger::sync_invoke`] on the scheduler's workers.
  pub fn async_invoke(
    &self,
    scheduler: &Scheduler,
    payload: serde_json::Value,
  ) -> Result<InvocationHandle, TriggerError> {
    scheduler.submit(self.clone(), payload)
  }
}

impl From<LibraryTrigger> for Trigger {
  fn from(trigger: LibraryTrigger) -> Self {
    Trigger::Library(trigger)
  }
}

impl From<HttpTrigger> for Trigger {
  fn from(trigger: HttpTrigger) -> Self {
    Trigger::Http(trigger)
  }
}

impl From<QueueTrigger> for Trigger {
  fn from(trigger: QueueTrigger) -> Self {
    Trigger::Queue(trigger)
  }
}

impl From<StorageTrigger> for Trigger {
  fn from(trigger: StorageTrigger) -> Self {
    Trigger::Storage(trigger)
  }
}

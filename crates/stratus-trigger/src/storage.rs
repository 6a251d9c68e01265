//! Invocation by uploading an object to a watched container.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::{TransportError, TriggerError};
use crate::queue::await_result;
use crate::result::ExecutionResult;
use crate::transport::{InvokeContext, QueueHandle, QueueKind};

/// Object key written for each invocation.
const PAYLOAD_KEY: &str = "payload.json";

/// A function fired by uploads to a container, reporting on a result queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageTrigger {
  pub name: String,
  pub storage_account: String,
  pub region: String,
  pub result_queue: QueueHandle,
  pub container_name: String,
}

impl StorageTrigger {
  pub fn new(
    name: impl Into<String>,
    storage_account: impl Into<String>,
    region: impl Into<String>,
    container_name: impl Into<String>,
  ) -> Self {
    let name = name.into();
    let storage_account = storage_account.into();
    let region = region.into();
    Self {
      result_queue: QueueHandle::for_function(&name, QueueKind::Result, &storage_account, &region),
      container_name: container_name.into(),
      name,
      storage_account,
      region,
    }
  }

  /// Provision the container and the result queue. An existing container is
  /// reused.
  #[instrument(name = "storage.create", skip_all, fields(function = %self.name, container = %self.container_name))]
  pub async fn create(&self, ctx: &InvokeContext) -> Result<(), TriggerError> {
    let storage = ctx.transports.storage()?;
    match storage
      .create_container(&self.storage_account, &self.container_name)
      .await
    {
      Ok(()) => info!("container created"),
      Err(TransportError::AlreadyExists(_)) => info!("container exists, reusing"),
      Err(source) => {
        return Err(TriggerError::Provisioning {
          resource: self.container_name.clone(),
          source,
        });
      }
    }

    ctx
      .transports
      .queues()?
      .create_queue(&self.result_queue)
      .await
      .map_err(|source| TriggerError::Provisioning {
        resource: self.result_queue.name.clone(),
        source,
      })?;
    info!(queue = %self.result_queue.name, "queue ready");
    Ok(())
  }

  #[instrument(name = "storage.invoke", skip_all, fields(function = %self.name, container = %self.container_name))]
  pub async fn sync_invoke(
    &self,
    ctx: &InvokeContext,
    payload: &serde_json::Value,
    cancel: &CancellationToken,
  ) -> Result<ExecutionResult, TriggerError> {
    let storage = ctx.transports.storage()?;
    // Fail on a missing queue client before anything is uploaded.
    ctx.transports.queues()?;

    let begin = Utc::now();
    if let Err(e) = storage
      .upload(
        &self.storage_account,
        &self.container_name,
        PAYLOAD_KEY,
        payload.to_string().into_bytes(),
      )
      .await
    {
      warn!(error = %e, "failed to upload payload");
      return Ok(ExecutionResult::failed(begin, Utc::now()));
    }
    debug!(key = PAYLOAD_KEY, "payload uploaded");

    await_result(ctx, &self.result_queue, begin, cancel).await
  }
}

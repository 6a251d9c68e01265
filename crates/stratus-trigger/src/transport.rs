//! Provider-facing clients used by triggers.
//!
//! Each trait wraps one kind of provider API. Deployments plug in adapters
//! over their SDK of choice; triggers only see these traits.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stratus_config::InvocationConfig;

use crate::error::{TransportError, TriggerError};

/// Response from a direct function call.
#[derive(Debug, Clone, Default)]
pub struct FunctionResponse {
  pub status_code: u16,
  pub request_id: String,
  /// Set when the function raised instead of returning.
  pub function_error: Option<String>,
  /// Tail of the execution log, base64 encoded.
  pub log_result: Option<String>,
  pub payload: Vec<u8>,
}

/// Calls a deployed function and waits for its response.
#[async_trait]
pub trait FunctionClient: Send + Sync {
  async fn invoke(&self, function: &str, payload: Vec<u8>)
  -> Result<FunctionResponse, TransportError>;
}

#[derive(Debug, Clone)]
pub struct StartedExecution {
  pub request_id: String,
  pub execution_id: String,
}

/// Status of an orchestration execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
  Running,
  Succeeded,
  Failed,
  TimedOut,
  Aborted,
  Other(String),
}

impl ExecutionStatus {
  pub fn is_running(&self) -> bool {
    matches!(self, ExecutionStatus::Running)
  }

  /// Only an explicit failure counts. Any other terminal status, timed out
  /// and aborted included, is reported as success.
  pub fn is_failure(&self) -> bool {
    matches!(self, ExecutionStatus::Failed)
  }
}

#[derive(Debug, Clone)]
pub struct ExecutionDescription {
  pub status: ExecutionStatus,
  pub output: Option<serde_json::Value>,
}

/// Starts orchestrations and reports on their progress.
#[async_trait]
pub trait WorkflowClient: Send + Sync {
  async fn start_execution(
    &self,
    workflow: &str,
    input: String,
  ) -> Result<StartedExecution, TransportError>;

  async fn describe_execution(
    &self,
    execution_id: &str,
  ) -> Result<ExecutionDescription, TransportError>;
}

/// Message queue operations.
#[async_trait]
pub trait QueueClient: Send + Sync {
  /// Create a queue. Creating an existing queue is not an error.
  async fn create_queue(&self, queue: &QueueHandle) -> Result<(), TransportError>;

  async fn send_message(&self, queue: &QueueHandle, body: String) -> Result<(), TransportError>;

  /// Take the next message, if any is waiting.
  async fn receive_message(&self, queue: &QueueHandle) -> Result<Option<String>, TransportError>;
}

/// Blob container operations.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
  /// Create a container. Fails with [`TransportError::AlreadyExists`] when it
  /// is already present.
  async fn create_container(&self, account: &str, container: &str)
  -> Result<(), TransportError>;

  async fn upload(
    &self,
    account: &str,
    container: &str,
    key: &str,
    body: Vec<u8>,
  ) -> Result<(), TransportError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueKind {
  Trigger,
  Result,
}

impl QueueKind {
  pub fn as_str(self) -> &'static str {
    match self {
      QueueKind::Trigger => "trigger",
      QueueKind::Result => "result",
    }
  }
}

/// A queue owned by one function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueHandle {
  pub name: String,
  pub kind: QueueKind,
  pub storage_account: String,
  pub region: String,
}

impl QueueHandle {
  /// The queue of `kind` belonging to `function`, named `{function}-{kind}`.
  pub fn for_function(
    function: &str,
    kind: QueueKind,
    storage_account: impl Into<String>,
    region: impl Into<String>,
  ) -> Self {
    Self {
      name: format!("{}-{}", function, kind.as_str()),
      kind,
      storage_account: storage_account.into(),
      region: region.into(),
    }
  }
}

/// The set of clients available to triggers.
///
/// Only the clients a trigger actually uses need to be present.
#[derive(Clone, Default)]
pub struct Transports {
  functions: Option<Arc<dyn FunctionClient>>,
  workflows: Option<Arc<dyn WorkflowClient>>,
  queues: Option<Arc<dyn QueueClient>>,
  storage: Option<Arc<dyn ObjectStorage>>,
  http: reqwest::Client,
}

impl Transports {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_functions(mut self, client: Arc<dyn FunctionClient>) -> Self {
    self.functions = Some(client);
    self
  }

  pub fn with_workflows(mut self, client: Arc<dyn WorkflowClient>) -> Self {
    self.workflows = Some(client);
    self
  }

  pub fn with_queues(mut self, client: Arc<dyn QueueClient>) -> Self {
    self.queues = Some(client);
    self
  }

  pub fn with_storage(mut self, client: Arc<dyn ObjectStorage>) -> Self {
    self.storage = Some(client);
    self
  }

  pub fn with_http(mut self, client: reqwest::Client) -> Self {
    self.http = client;
    self
  }

  pub fn functions(&self) -> Result<&Arc<dyn FunctionClient>, TriggerError> {
    self
      .functions
      .as_ref()
      .ok_or(TriggerError::MissingTransport("function"))
  }

  pub fn workflows(&self) -> Result<&Arc<dyn WorkflowClient>, TriggerError> {
    self
      .workflows
      .as_ref()
      .ok_or(TriggerError::MissingTransport("workflow"))
  }

  pub fn queues(&self) -> Result<&Arc<dyn QueueClient>, TriggerError> {
    self
      .queues
      .as_ref()
      .ok_or(TriggerError::MissingTransport("queue"))
  }

  pub fn storage(&self) -> Result<&Arc<dyn ObjectStorage>, TriggerError> {
    self
      .storage
      .as_ref()
      .ok_or(TriggerError::MissingTransport("object storage"))
  }

  pub fn http(&self) -> &reqwest::Client {
    &self.http
  }
}

impl std::fmt::Debug for Transports {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Transports")
      .field("functions", &self.functions.is_some())
      .field("workflows", &self.workflows.is_some())
      .field("queues", &self.queues.is_some())
      .field("storage", &self.storage.is_some())
      .finish()
  }
}

/// Everything a synchronous invocation needs besides the trigger itself.
#[derive(Debug, Clone, Default)]
pub struct InvokeContext {
  pub transports: Transports,
  pub config: InvocationConfig,
}

impl InvokeContext {
  pub fn new(transports: Transports, config: InvocationConfig) -> Self {
    Self { transports, config }
  }
}

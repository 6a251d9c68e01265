//! Invocation tests against in-memory transports.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::json;
use stratus_config::InvocationConfig;
use stratus_trigger::{
  ExecutionDescription, ExecutionStatus, FunctionClient, FunctionResponse, InvokeContext,
  LibraryTrigger, ObjectStorage, QueueClient, QueueHandle, QueueTrigger, Scheduler,
  StartedExecution, StorageTrigger, TransportError, Transports, Trigger, TriggerError,
  WorkflowClient,
};
use tokio_util::sync::CancellationToken;

// --- fakes ---

struct FakeFunctions {
  response: Result<FunctionResponse, String>,
  delay: Duration,
  in_flight: AtomicUsize,
  peak: AtomicUsize,
}

impl FakeFunctions {
  fn returning(response: FunctionResponse) -> Self {
    Self {
      response: Ok(response),
      delay: Duration::ZERO,
      in_flight: AtomicUsize::new(0),
      peak: AtomicUsize::new(0),
    }
  }

  fn failing(message: &str) -> Self {
    Self {
      response: Err(message.to_string()),
      ..Self::returning(FunctionResponse::default())
    }
  }

  fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = delay;
    self
  }
}

#[async_trait]
impl FunctionClient for FakeFunctions {
  async fn invoke(
    &self,
    _function: &str,
    _payload: Vec<u8>,
  ) -> Result<FunctionResponse, TransportError> {
    let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    self.peak.fetch_max(now, Ordering::SeqCst);
    if !self.delay.is_zero() {
      tokio::time::sleep(self.delay).await;
    }
    self.in_flight.fetch_sub(1, Ordering::SeqCst);

    self.response.clone().map_err(TransportError::Request)
  }
}

/// Reports each status in turn, repeating the last one.
struct FakeWorkflows {
  statuses: Mutex<VecDeque<ExecutionStatus>>,
  output: Option<serde_json::Value>,
  describe_calls: AtomicUsize,
}

impl FakeWorkflows {
  fn new(statuses: Vec<ExecutionStatus>) -> Self {
    Self {
      statuses: Mutex::new(statuses.into()),
      output: None,
      describe_calls: AtomicUsize::new(0),
    }
  }
}

#[async_trait]
impl WorkflowClient for FakeWorkflows {
  async fn start_execution(
    &self,
    workflow: &str,
    _input: String,
  ) -> Result<StartedExecution, TransportError> {
    Ok(StartedExecution {
      request_id: "req-wf".to_string(),
      execution_id: format!("{}:exec-1", workflow),
    })
  }

  async fn describe_execution(
    &self,
    _execution_id: &str,
  ) -> Result<ExecutionDescription, TransportError> {
    self.describe_calls.fetch_add(1, Ordering::SeqCst);
    let mut statuses = self.statuses.lock().unwrap();
    let status = if statuses.len() > 1 {
      statuses.pop_front().unwrap()
    } else {
      statuses.front().cloned().unwrap_or(ExecutionStatus::Running)
    };
    if status == ExecutionStatus::Other("unreachable".to_string()) {
      return Err(TransportError::Request("status endpoint unreachable".to_string()));
    }
    Ok(ExecutionDescription {
      status,
      output: self.output.clone(),
    })
  }
}

/// Result messages become visible after a number of reads.
#[derive(Default)]
struct FakeQueues {
  created: Mutex<Vec<String>>,
  sent: Mutex<Vec<(String, String)>>,
  results: Mutex<HashMap<String, VecDeque<String>>>,
  reads: AtomicUsize,
  visible_after: usize,
}

impl FakeQueues {
  fn replying(queue: &str, message: &str, visible_after: usize) -> Self {
    let queues = Self {
      visible_after,
      ..Self::default()
    };
    queues
      .results
      .lock()
      .unwrap()
      .entry(queue.to_string())
      .or_default()
      .push_back(message.to_string());
    queues
  }
}

#[async_trait]
impl QueueClient for FakeQueues {
  async fn create_queue(&self, queue: &QueueHandle) -> Result<(), TransportError> {
    self.created.lock().unwrap().push(queue.name.clone());
    Ok(())
  }

  async fn send_message(&self, queue: &QueueHandle, body: String) -> Result<(), TransportError> {
    self.sent.lock().unwrap().push((queue.name.clone(), body));
    Ok(())
  }

  async fn receive_message(&self, queue: &QueueHandle) -> Result<Option<String>, TransportError> {
    let read = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
    if read < self.visible_after {
      return Ok(None);
    }
    Ok(
      self
        .results
        .lock()
        .unwrap()
        .get_mut(&queue.name)
        .and_then(VecDeque::pop_front),
    )
  }
}

#[derive(Default)]
struct FakeStorage {
  containers: Mutex<Vec<String>>,
  uploads: Mutex<Vec<(String, String, Vec<u8>)>>,
}

#[async_trait]
impl ObjectStorage for FakeStorage {
  async fn create_container(&self, _account: &str, container: &str) -> Result<(), TransportError> {
    let mut containers = self.containers.lock().unwrap();
    if containers.iter().any(|c| c == container) {
      return Err(TransportError::AlreadyExists(container.to_string()));
    }
    containers.push(container.to_string());
    Ok(())
  }

  async fn upload(
    &self,
    _account: &str,
    container: &str,
    key: &str,
    body: Vec<u8>,
  ) -> Result<(), TransportError> {
    self
      .uploads
      .lock()
      .unwrap()
      .push((container.to_string(), key.to_string(), body));
    Ok(())
  }
}

fn ok_response(body: serde_json::Value) -> FunctionResponse {
  FunctionResponse {
    status_code: 200,
    request_id: "req-1".to_string(),
    function_error: None,
    log_result: None,
    payload: body.to_string().into_bytes(),
  }
}

fn context(transports: Transports) -> InvokeContext {
  InvokeContext::new(transports, InvocationConfig::default())
}

fn fast_config() -> InvocationConfig {
  InvocationConfig {
    workflow_poll_interval_ms: 10,
    result_poll_interval_ms: 10,
    timeout_ms: Some(5_000),
    ..InvocationConfig::default()
  }
}

// --- library: function ---

#[tokio::test]
async fn test_function_invocation_success() {
  let body = json!({
    "body": "{\"is_cold\": true, \"begin\": 1.0, \"end\": 1.5, \"result\": {\"output\": 1}}"
  });
  let ctx = context(Transports::new().with_functions(Arc::new(FakeFunctions::returning(ok_response(body)))));
  let trigger: Trigger = LibraryTrigger::function("resize").into();

  let result = trigger
    .sync_invoke(&ctx, &json!({"size": 10}), &CancellationToken::new())
    .await
    .unwrap();

  assert!(result.is_success());
  assert!(result.stats.cold_start);
  assert_eq!(result.request_id, "req-1");
  assert_eq!(result.times.benchmark_us, 500_000);
  assert_eq!(result.output["result"]["output"], json!(1));
}

#[tokio::test]
async fn test_function_error_status_sets_failure() {
  let mut response = ok_response(json!({"body": {}}));
  response.status_code = 500;
  let ctx = context(Transports::new().with_functions(Arc::new(FakeFunctions::returning(response))));
  let trigger: Trigger = LibraryTrigger::function("resize").into();

  let result = trigger
    .sync_invoke(&ctx, &json!({}), &CancellationToken::new())
    .await
    .unwrap();

  assert!(!result.is_success());
}

#[tokio::test]
async fn test_platform_function_error_sets_failure() {
  let mut response = ok_response(json!({"errorMessage": "boom"}));
  response.function_error = Some("Unhandled".to_string());
  let ctx = context(Transports::new().with_functions(Arc::new(FakeFunctions::returning(response))));
  let trigger: Trigger = LibraryTrigger::function("resize").into();

  let result = trigger
    .sync_invoke(&ctx, &json!({}), &CancellationToken::new())
    .await
    .unwrap();

  assert!(result.stats.failure);
  assert_eq!(result.request_id, "req-1");
}

#[tokio::test]
async fn test_transport_failure_is_absorbed() {
  let ctx = context(Transports::new().with_functions(Arc::new(FakeFunctions::failing("connection reset"))));
  let trigger: Trigger = LibraryTrigger::function("resize").into();

  let result = trigger
    .sync_invoke(&ctx, &json!({}), &CancellationToken::new())
    .await
    .unwrap();

  assert!(result.stats.failure);
}

#[tokio::test]
async fn test_report_log_fills_provider_times() {
  let log = "START RequestId: r\nREPORT RequestId: r\tDuration: 2.5 ms\tBilled Duration: 3 ms\tMax Memory Used: 40 MB\t\n";
  let mut response = ok_response(json!({"body": {}}));
  response.log_result = Some(STANDARD.encode(log));
  let ctx = context(Transports::new().with_functions(Arc::new(FakeFunctions::returning(response))));
  let trigger: Trigger = LibraryTrigger::function("resize").into();

  let result = trigger
    .sync_invoke(&ctx, &json!({}), &CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(result.provider_times.execution_us, Some(2_500));
  assert_eq!(result.stats.memory_used_mb, Some(40.0));
}

#[tokio::test]
async fn test_missing_client_is_an_error() {
  let ctx = context(Transports::new());
  let trigger: Trigger = LibraryTrigger::function("resize").into();

  let err = trigger
    .sync_invoke(&ctx, &json!({}), &CancellationToken::new())
    .await
    .unwrap_err();

  assert!(matches!(err, TriggerError::MissingTransport("function")));
}

// --- library: workflow ---

#[tokio::test]
async fn test_workflow_polls_until_terminal() {
  let mut workflows = FakeWorkflows::new(vec![
    ExecutionStatus::Running,
    ExecutionStatus::Running,
    ExecutionStatus::Succeeded,
  ]);
  workflows.output = Some(json!({"payload": [1, 2]}));
  let workflows = Arc::new(workflows);
  let ctx = InvokeContext::new(Transports::new().with_workflows(workflows.clone()), fast_config());
  let trigger: Trigger = LibraryTrigger::workflow("pipeline").into();

  let result = trigger
    .sync_invoke(&ctx, &json!({}), &CancellationToken::new())
    .await
    .unwrap();

  assert!(result.is_success());
  assert_eq!(result.request_id, "req-wf");
  assert_eq!(result.output, json!({"payload": [1, 2]}));
  assert_eq!(workflows.describe_calls.load(Ordering::SeqCst), 3);
  assert!(result.duration() >= chrono::Duration::milliseconds(20));
}

#[tokio::test]
async fn test_workflow_failure_sets_flag() {
  let workflows = Arc::new(FakeWorkflows::new(vec![ExecutionStatus::Failed]));
  let ctx = InvokeContext::new(Transports::new().with_workflows(workflows), fast_config());
  let trigger: Trigger = LibraryTrigger::workflow("pipeline").into();

  let result = trigger
    .sync_invoke(&ctx, &json!({}), &CancellationToken::new())
    .await
    .unwrap();

  assert!(result.stats.failure);
}

#[tokio::test]
async fn test_other_terminal_statuses_count_as_success() {
  let statuses = vec![
    ExecutionStatus::Succeeded,
    ExecutionStatus::TimedOut,
    ExecutionStatus::Aborted,
    ExecutionStatus::Other("PENDING_REDRIVE".to_string()),
  ];

  for status in statuses {
    let workflows = Arc::new(FakeWorkflows::new(vec![status.clone()]));
    let ctx = InvokeContext::new(Transports::new().with_workflows(workflows), fast_config());
    let trigger: Trigger = LibraryTrigger::workflow("pipeline").into();

    let result = trigger
      .sync_invoke(&ctx, &json!({}), &CancellationToken::new())
      .await
      .unwrap();

    assert!(!result.stats.failure, "{:?} should not set the failure flag", status);
  }
}

#[tokio::test]
async fn test_unreachable_status_counts_as_running() {
  let workflows = Arc::new(FakeWorkflows::new(vec![
    ExecutionStatus::Other("unreachable".to_string()),
    ExecutionStatus::Succeeded,
  ]));
  let ctx = InvokeContext::new(Transports::new().with_workflows(workflows.clone()), fast_config());
  let trigger: Trigger = LibraryTrigger::workflow("pipeline").into();

  let result = trigger
    .sync_invoke(&ctx, &json!({}), &CancellationToken::new())
    .await
    .unwrap();

  assert!(result.is_success());
  assert_eq!(workflows.describe_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_workflow_wait_times_out() {
  let workflows = Arc::new(FakeWorkflows::new(vec![ExecutionStatus::Running]));
  let config = InvocationConfig {
    timeout_ms: Some(60),
    ..fast_config()
  };
  let ctx = InvokeContext::new(Transports::new().with_workflows(workflows), config);
  let trigger: Trigger = LibraryTrigger::workflow("pipeline").into();

  let err = trigger
    .sync_invoke(&ctx, &json!({}), &CancellationToken::new())
    .await
    .unwrap_err();

  assert!(matches!(err, TriggerError::Timeout { .. }));
}

// --- queue and storage ---

#[tokio::test]
async fn test_queue_trigger_waits_at_least_one_interval() {
  let report = json!({"is_cold": false, "request_id": "req-q", "begin": 10, "end": 11}).to_string();
  let queues = Arc::new(FakeQueues::replying("thumbnailer-result", &report, 2));
  let config = InvocationConfig {
    result_poll_interval_ms: 50,
    ..fast_config()
  };
  let ctx = InvokeContext::new(Transports::new().with_queues(queues.clone()), config);
  let trigger: Trigger = QueueTrigger::new("thumbnailer", "acct", "eu-west-1").into();

  let result = trigger
    .sync_invoke(&ctx, &json!({"image": "cat.png"}), &CancellationToken::new())
    .await
    .unwrap();

  assert!(result.is_success());
  assert_eq!(result.request_id, "req-q");
  assert_eq!(result.times.benchmark_us, 1_000_000);
  assert!(result.times.client_us >= 50_000);
  assert_eq!(queues.reads.load(Ordering::SeqCst), 2);

  let sent = queues.sent.lock().unwrap();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].0, "thumbnailer-trigger");
  let decoded = STANDARD.decode(&sent[0].1).unwrap();
  let payload: serde_json::Value = serde_json::from_slice(&decoded).unwrap();
  assert_eq!(payload, json!({"image": "cat.png"}));
}

#[tokio::test]
async fn test_queue_trigger_creates_both_queues() {
  let queues = Arc::new(FakeQueues::default());
  let ctx = context(Transports::new().with_queues(queues.clone()));
  let trigger: Trigger = QueueTrigger::new("thumbnailer", "acct", "eu-west-1").into();

  trigger.create(&ctx).await.unwrap();

  assert_eq!(
    *queues.created.lock().unwrap(),
    vec!["thumbnailer-trigger".to_string(), "thumbnailer-result".to_string()]
  );
}

#[tokio::test]
async fn test_storage_trigger_uploads_and_waits() {
  let report = json!({"is_cold": true}).to_string();
  let queues = Arc::new(FakeQueues::replying("compress-result", &report, 1));
  let storage = Arc::new(FakeStorage::default());
  let ctx = InvokeContext::new(
    Transports::new()
      .with_queues(queues.clone())
      .with_storage(storage.clone()),
    fast_config(),
  );
  let trigger: Trigger = StorageTrigger::new("compress", "acct", "eu-west-1", "compress-input").into();

  trigger.create(&ctx).await.unwrap();
  // A second provisioning run reuses the container.
  trigger.create(&ctx).await.unwrap();

  let result = trigger
    .sync_invoke(&ctx, &json!({"level": 9}), &CancellationToken::new())
    .await
    .unwrap();

  assert!(result.stats.cold_start);
  let uploads = storage.uploads.lock().unwrap();
  assert_eq!(uploads.len(), 1);
  assert_eq!(uploads[0].0, "compress-input");
  assert_eq!(uploads[0].1, "payload.json");
  assert_eq!(storage.containers.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_restored_trigger_invokes_same_target() {
  let report = json!({"request_id": "req-r"}).to_string();
  let queues = Arc::new(FakeQueues::replying("thumbnailer-result", &report, 1));
  let ctx = InvokeContext::new(Transports::new().with_queues(queues.clone()), fast_config());

  let original: Trigger = QueueTrigger::new("thumbnailer", "acct", "eu-west-1").into();
  let restored = Trigger::from_record(&original.to_record().unwrap()).unwrap();

  let result = restored
    .sync_invoke(&ctx, &json!({}), &CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(result.request_id, "req-r");
  assert_eq!(queues.sent.lock().unwrap()[0].0, "thumbnailer-trigger");
  // Restoring provisions nothing.
  assert!(queues.created.lock().unwrap().is_empty());
}

// --- scheduler ---

#[tokio::test]
async fn test_scheduler_bounds_in_flight_invocations() {
  let functions = Arc::new(
    FakeFunctions::returning(ok_response(json!({"body": {}}))).with_delay(Duration::from_millis(20)),
  );
  let config = InvocationConfig {
    max_in_flight: 2,
    ..InvocationConfig::default()
  };
  let scheduler = Scheduler::new(InvokeContext::new(
    Transports::new().with_functions(functions.clone()),
    config,
  ));
  let trigger: Trigger = LibraryTrigger::function("resize").into();

  let handles: Vec<_> = (0..6)
    .map(|i| trigger.async_invoke(&scheduler, json!({"i": i})).unwrap())
    .collect();

  for handle in handles {
    let result = handle.join().await.unwrap();
    assert!(result.is_success());
  }
  assert!(functions.peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn test_async_handle_propagates_errors() {
  let scheduler = Scheduler::new(context(Transports::new()));
  let trigger: Trigger = LibraryTrigger::function("resize").into();

  let err = trigger
    .async_invoke(&scheduler, json!({}))
    .unwrap()
    .join()
    .await
    .unwrap_err();

  assert!(matches!(err, TriggerError::MissingTransport(_)));
}

#[tokio::test]
async fn test_cancel_handle_stops_polling() {
  let workflows = Arc::new(FakeWorkflows::new(vec![ExecutionStatus::Running]));
  let config = InvocationConfig {
    timeout_ms: None,
    ..fast_config()
  };
  let scheduler = Scheduler::new(InvokeContext::new(Transports::new().with_workflows(workflows), config));
  let trigger: Trigger = LibraryTrigger::workflow("pipeline").into();

  let handle = trigger.async_invoke(&scheduler, json!({})).unwrap();
  tokio::time::sleep(Duration::from_millis(30)).await;
  handle.cancel();

  let err = handle.join().await.unwrap_err();
  assert!(matches!(err, TriggerError::Cancelled));
}

#[tokio::test]
async fn test_submit_after_shutdown_is_rejected() {
  let scheduler = Scheduler::new(context(Transports::new()));
  scheduler.shutdown();

  let trigger: Trigger = LibraryTrigger::function("resize").into();
  let err = trigger.async_invoke(&scheduler, json!({})).unwrap_err();
  assert!(matches!(err, TriggerError::SchedulerClosed));
}

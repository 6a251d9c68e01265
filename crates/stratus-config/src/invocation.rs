//! Invocation settings.
//!
//! Every field has a default, so an empty JSON object (or no file at all)
//! yields a usable configuration.
//!
//! ```json
//! {
//!   "workflow_poll_interval_ms": 10000,
//!   "result_poll_interval_ms": 5000,
//!   "timeout_ms": 900000,
//!   "max_in_flight": 16
//! }
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvocationConfig {
  /// Interval between orchestration status checks.
  pub workflow_poll_interval_ms: u64,
  /// Interval between result queue reads (queue and storage triggers).
  pub result_poll_interval_ms: u64,
  /// Deadline for any polling wait. `None` waits without bound.
  pub timeout_ms: Option<u64>,
  /// Maximum number of asynchronous invocations running at once.
  pub max_in_flight: usize,
  /// Per-request timeout for HTTP triggers.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub http_timeout_ms: Option<u64>,
}

impl Default for InvocationConfig {
  fn default() -> Self {
    Self {
      workflow_poll_interval_ms: 10_000,
      result_poll_interval_ms: 5_000,
      timeout_ms: Some(900_000),
      max_in_flight: 16,
      http_timeout_ms: None,
    }
  }
}

impl InvocationConfig {
  pub fn workflow_poll_interval(&self) -> Duration {
    Duration::from_millis(self.workflow_poll_interval_ms)
  }

  pub fn result_poll_interval(&self) -> Duration {
    Duration::from_millis(self.result_poll_interval_ms)
  }

  pub fn timeout(&self) -> Option<Duration> {
    self.timeout_ms.map(Duration::from_millis)
  }

  pub fn http_timeout(&self) -> Option<Duration> {
    self.http_timeout_ms.map(Duration::from_millis)
  }
}

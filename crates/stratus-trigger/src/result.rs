//! Normalized invocation results.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timings measured by the client and reported by the benchmark.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTimes {
  /// Wall time observed by the caller, in microseconds.
  pub client_us: i64,
  /// Time spent inside the benchmark function, in microseconds.
  pub benchmark_us: i64,
  pub initialization_us: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStats {
  pub cold_start: bool,
  pub failure: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub memory_used_mb: Option<f64>,
}

/// Timings reported by the provider rather than measured locally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderTimes {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub execution_us: Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub initialization_us: Option<i64>,
  /// Any further provider metric, in microseconds.
  #[serde(default, flatten)]
  pub extra: BTreeMap<String, i64>,
}

/// Outcome of one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
  pub begin: DateTime<Utc>,
  pub end: DateTime<Utc>,
  pub request_id: String,
  pub times: ExecutionTimes,
  pub stats: ExecutionStats,
  pub provider_times: ProviderTimes,
  /// Output returned by the benchmark, as reported.
  pub output: serde_json::Value,
}

impl ExecutionResult {
  /// A result covering `begin..end`, with nothing else known yet.
  pub fn from_times(begin: DateTime<Utc>, end: DateTime<Utc>) -> Self {
    let client_us = (end - begin).num_microseconds().unwrap_or(i64::MAX);
    Self {
      begin,
      end,
      request_id: String::new(),
      times: ExecutionTimes {
        client_us,
        ..Default::default()
      },
      stats: ExecutionStats::default(),
      provider_times: ProviderTimes::default(),
      output: serde_json::Value::Null,
    }
  }

  /// A failed result covering `begin..end`.
  pub fn failed(begin: DateTime<Utc>, end: DateTime<Utc>) -> Self {
    let mut result = Self::from_times(begin, end);
    result.stats.failure = true;
    result
  }

  pub fn is_success(&self) -> bool {
    !self.stats.failure
  }

  pub fn duration(&self) -> chrono::Duration {
    self.end - self.begin
  }

  /// Record the benchmark's own report.
  ///
  /// The report carries `is_cold`, `begin`/`end` as epoch seconds (numbers
  /// or strings) and the provider's `request_id`. Missing fields are left at
  /// their current value.
  pub fn parse_benchmark_output(&mut self, output: serde_json::Value) {
    if let Some(cold) = output.get("is_cold").and_then(serde_json::Value::as_bool) {
      self.stats.cold_start = cold;
    }

    let begin = output.get("begin").and_then(epoch_seconds);
    let end = output.get("end").and_then(epoch_seconds);
    if let (Some(begin), Some(end)) = (begin, end) {
      self.times.benchmark_us = ((end - begin) * 1_000_000.0).round() as i64;
    }

    if self.request_id.is_empty() {
      if let Some(id) = output.get("request_id").and_then(serde_json::Value::as_str) {
        self.request_id = id.to_string();
      }
    }

    self.output = output;
  }
}

fn epoch_seconds(value: &serde_json::Value) -> Option<f64> {
  match value {
    serde_json::Value::Number(n) => n.as_f64(),
    serde_json::Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}

//! Direct SDK invocation of a function or an orchestration.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::error::TriggerError;
use crate::report::parse_report;
use crate::result::ExecutionResult;
use crate::transport::{ExecutionDescription, InvokeContext};
use crate::wait::poll_until;

/// What a library trigger calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LibraryTarget {
  #[default]
  Function,
  Workflow,
}

/// Calls a function or starts a workflow through the provider SDK.
///
/// For a workflow the result's `end` is taken when a terminal status is
/// observed, so `client_us` covers the whole execution plus up to one
/// workflow poll interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryTrigger {
  pub name: String,
  #[serde(default)]
  pub target: LibraryTarget,
}

impl LibraryTrigger {
  pub fn function(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      target: LibraryTarget::Function,
    }
  }

  pub fn workflow(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      target: LibraryTarget::Workflow,
    }
  }

  pub async fn sync_invoke(
    &self,
    ctx: &InvokeContext,
    payload: &serde_json::Value,
    cancel: &CancellationToken,
  ) -> Result<ExecutionResult, TriggerError> {
    match self.target {
      LibraryTarget::Function => self.invoke_function(ctx, payload, cancel).await,
      LibraryTarget::Workflow => self.invoke_workflow(ctx, payload, cancel).await,
    }
  }

  #[instrument(name = "library.function", skip_all, fields(function = %self.name))]
  async fn invoke_function(
    &self,
    ctx: &InvokeContext,
    payload: &serde_json::Value,
    cancel: &CancellationToken,
  ) -> Result<ExecutionResult, TriggerError> {
    let client = ctx.transports.functions()?;
    let body = payload.to_string().into_bytes();

    let begin = Utc::now();
    let response = tokio::select! {
      _ = cancel.cancelled() => return Err(TriggerError::Cancelled),
      response = client.invoke(&self.name, body) => response,
    };
    let end = Utc::now();

    let response = match response {
      Ok(response) => response,
      Err(e) => {
        warn!(error = %e, "function invocation failed");
        return Ok(ExecutionResult::failed(begin, end));
      }
    };

    let mut result = ExecutionResult::from_times(begin, end);
    result.request_id = response.request_id.clone();

    if response.status_code != 200 || response.function_error.is_some() {
      warn!(
        status = response.status_code,
        function_error = ?response.function_error,
        "function reported failure"
      );
      result.stats.failure = true;
    }

    if let Some(log) = &response.log_result {
      match STANDARD.decode(log) {
        Ok(bytes) => {
          parse_report(&String::from_utf8_lossy(&bytes), &mut result);
        }
        Err(e) => debug!(error = %e, "log tail is not valid base64"),
      }
    }

    match serde_json::from_slice::<serde_json::Value>(&response.payload) {
      Ok(output) => result.parse_benchmark_output(benchmark_body(output)),
      Err(e) => {
        warn!(error = %e, "function returned a non-JSON payload");
        result.stats.failure = true;
      }
    }

    Ok(result)
  }

  #[instrument(name = "library.workflow", skip_all, fields(workflow = %self.name))]
  async fn invoke_workflow(
    &self,
    ctx: &InvokeContext,
    payload: &serde_json::Value,
    cancel: &CancellationToken,
  ) -> Result<ExecutionResult, TriggerError> {
    let client = ctx.transports.workflows()?;

    let begin = Utc::now();
    let started = tokio::select! {
      _ = cancel.cancelled() => return Err(TriggerError::Cancelled),
      started = client.start_execution(&self.name, payload.to_string()) => started,
    };

    let started = match started {
      Ok(started) => started,
      Err(e) => {
        warn!(error = %e, "failed to start execution");
        return Ok(ExecutionResult::failed(begin, Utc::now()));
      }
    };
    debug!(execution_id = %started.execution_id, "execution started");

    let execution_id = started.execution_id.as_str();
    let description: ExecutionDescription = poll_until(
      ctx.config.workflow_poll_interval(),
      ctx.config.timeout(),
      cancel,
      move || async move {
        match client.describe_execution(execution_id).await {
          Ok(description) if description.status.is_running() => Ok(None),
          Ok(description) => Ok(Some(description)),
          Err(e) => {
            warn!(error = %e, "status check failed, still waiting");
            Ok(None)
          }
        }
      },
    )
    .await?;
    let end = Utc::now();

    let mut result = ExecutionResult::from_times(begin, end);
    result.request_id = started.request_id;
    if description.status.is_failure() {
      warn!(status = ?description.status, "execution did not succeed");
      result.stats.failure = true;
    }
    if let Some(output) = description.output {
      result.output = output;
    }

    Ok(result)
  }
}

/// The benchmark's report inside a function response.
///
/// Functions behind an HTTP-style wrapper return `{"body": "<json>"}` or
/// `{"body": {...}}`; bare functions return the report itself.
fn benchmark_body(output: serde_json::Value) -> serde_json::Value {
  match output {
    serde_json::Value::Object(mut map) if map.contains_key("body") => {
      match map.remove("body").unwrap_or_default() {
        serde_json::Value::String(s) => {
          serde_json::from_str(&s).unwrap_or(serde_json::Value::String(s))
        }
        body => body,
      }
    }
    other => other,
  }
}

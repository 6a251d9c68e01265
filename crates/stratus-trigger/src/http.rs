//! Invocation through an HTTP endpoint.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use crate::error::{TransportError, TriggerError};
use crate::result::ExecutionResult;
use crate::transport::InvokeContext;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpTrigger {
  pub name: String,
  pub url: String,
  /// Provider identifier of the API gateway in front of the function.
  #[serde(rename = "api-id", default, skip_serializing_if = "Option::is_none")]
  pub api_id: Option<String>,
}

impl HttpTrigger {
  pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      url: url.into(),
      api_id: None,
    }
  }

  pub fn with_api_id(mut self, api_id: impl Into<String>) -> Self {
    self.api_id = Some(api_id.into());
    self
  }

  #[instrument(name = "http.invoke", skip_all, fields(function = %self.name, url = %self.url))]
  pub async fn sync_invoke(
    &self,
    ctx: &InvokeContext,
    payload: &serde_json::Value,
    cancel: &CancellationToken,
  ) -> Result<ExecutionResult, TriggerError> {
    let mut request = ctx.transports.http().post(&self.url).json(payload);
    if let Some(timeout) = ctx.config.http_timeout() {
      request = request.timeout(timeout);
    }

    let begin = Utc::now();
    let response = tokio::select! {
      _ = cancel.cancelled() => return Err(TriggerError::Cancelled),
      response = round_trip(request) => response,
    };
    let end = Utc::now();

    let (status, body) = match response {
      Ok(response) => response,
      Err(e) => {
        warn!(error = %e, "request failed");
        return Ok(ExecutionResult::failed(begin, end));
      }
    };

    let mut result = ExecutionResult::from_times(begin, end);
    if status != reqwest::StatusCode::OK {
      warn!(%status, "endpoint returned an error status");
      result.stats.failure = true;
    }

    match serde_json::from_slice::<serde_json::Value>(&body) {
      Ok(output) => result.parse_benchmark_output(output),
      Err(e) => {
        warn!(error = %e, "response body is not JSON");
        result.stats.failure = true;
      }
    }

    Ok(result)
  }
}

/// Send the request and read the whole body.
async fn round_trip(
  request: reqwest::RequestBuilder,
) -> Result<(reqwest::StatusCode, Vec<u8>), TransportError> {
  let response = request.send().await?;
  let status = response.status();
  let body = response.bytes().await?;
  Ok((status, body.to_vec()))
}

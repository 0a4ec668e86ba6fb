//! Warehouse query executor over HTTP.
//!
//! Sends `{"sql": ...}` to a warehouse proxy endpoint and expects a JSON
//! array of row objects back. A JSON object carrying an `error` field is a
//! failed query.

use std::time::Duration;

use async_trait::async_trait;
use hotquery_core::{ConfigError, ExecutionError, HotqueryError, HotqueryResult};
use hotquery_storage::{QueryExecutor, Rows};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::constants::DEFAULT_EXECUTOR_TIMEOUT_SECS;

#[derive(Serialize)]
struct QueryBody<'a> {
    sql: &'a str,
}

/// Executes SQL by POSTing it to a warehouse proxy.
#[derive(Clone)]
pub struct HttpQueryExecutor {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpQueryExecutor {
    /// Create an executor for `endpoint` with the given request timeout.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> HotqueryResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            ExecutionError::ExecutorUnavailable {
                reason: format!("Failed to build HTTP client: {}", e),
            }
        })?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout,
        })
    }

    /// Read `HOTQUERY_WAREHOUSE_URL` (required) and
    /// `HOTQUERY_WAREHOUSE_TIMEOUT_SECS`.
    pub fn from_env() -> HotqueryResult<Self> {
        let endpoint = std::env::var("HOTQUERY_WAREHOUSE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingRequired {
                field: "HOTQUERY_WAREHOUSE_URL".to_string(),
            })?;
        let timeout = Duration::from_secs(
            std::env::var("HOTQUERY_WAREHOUSE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_EXECUTOR_TIMEOUT_SECS),
        );
        Self::new(endpoint, timeout)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl QueryExecutor for HttpQueryExecutor {
    async fn execute(&self, sql: &str) -> HotqueryResult<Rows> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&QueryBody { sql })
            .send()
            .await
            .map_err(|e| ExecutionError::ExecutorUnavailable {
                reason: format!("HTTP request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error(status, error_text));
        }

        let body: Value = response.json().await.map_err(|e| ExecutionError::InvalidResponse {
            reason: format!("Failed to parse response: {}", e),
        })?;
        parse_rows(body)
    }
}

impl std::fmt::Debug for HttpQueryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpQueryExecutor")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Classify a non-success HTTP status.
///
/// Server-side and gateway failures are the warehouse being unavailable;
/// anything else is the query's fault.
fn status_error(status: StatusCode, body: String) -> HotqueryError {
    let reason = format!("HTTP {}: {}", status.as_u16(), body);
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        ExecutionError::ExecutorUnavailable { reason }.into()
    } else {
        ExecutionError::QueryFailed { reason }.into()
    }
}

/// Extract rows from a proxy response body.
fn parse_rows(body: Value) -> HotqueryResult<Rows> {
    match body {
        Value::Array(rows) => Ok(rows),
        Value::Object(mut object) => {
            if let Some(error) = object.remove("error") {
                let reason = match error {
                    Value::String(message) => message,
                    other => other.to_string(),
                };
                return Err(ExecutionError::QueryFailed { reason }.into());
            }
            match object.remove("rows") {
                Some(Value::Array(rows)) => Ok(rows),
                _ => Err(ExecutionError::InvalidResponse {
                    reason: "expected a JSON array of rows".to_string(),
                }
                .into()),
            }
        }
        other => Err(ExecutionError::InvalidResponse {
            reason: format!("expected a JSON array of rows, got {}", json_kind(&other)),
        }
        .into()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// TESTS
// =============================================================================

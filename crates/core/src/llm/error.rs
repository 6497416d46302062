use crate::llm::Provider;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone)]
pub struct LlmDiagnosticsError {
    pub provider: Provider,
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
    pub raw_response_json: Option<Value>,
    /// Transport-level failure worth one more attempt (429, 5xx).
    pub retryable: bool,
}

impl LlmDiagnosticsError {
    pub fn http(provider: Provider, status: reqwest::StatusCode, body: String) -> Self {
        let raw_response_json = serde_json::from_str::<Value>(&body).ok();
        Self {
            provider,
            stage: "http",
            detail: format!("status={status}"),
            raw_output: Some(body),
            raw_response_json,
            retryable: status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error(),
        }
    }
}

impl fmt::Display for LlmDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LLM error (provider={:?}, stage={}): {}",
            self.provider, self.stage, self.detail
        )
    }
}

impl std::error::Error for LlmDiagnosticsError {}

/// Whether a failed model call is a transient transport failure: a retryable HTTP status, or a
/// timeout / connection error from the HTTP client.
pub fn is_transient(err: &anyhow::Error) -> bool {
    err.chain().any(|e| {
        if let Some(diag) = e.downcast_ref::<LlmDiagnosticsError>() {
            return diag.retryable;
        }
        if let Some(req) = e.downcast_ref::<reqwest::Error>() {
            return req.is_timeout() || req.is_connect() || req.is_request();
        }
        false
    })
}

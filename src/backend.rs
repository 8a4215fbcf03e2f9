//! HTTP client for backend execution entry points.
//!
//! A backend accepts the task payload as JSON and answers with a body that
//! carries the result value, or with an error. Every way a call can go wrong
//! is folded into [`Reply::Failed`] so the worker never sees an `Err`.

use std::time::Duration;

use serde_json::{Value, json};
use tracing::debug;

use crate::error::Result;
use crate::model::OK_SENTINEL;

/// Outcome of one backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Backend reported success. Holds the result value.
    Completed(Value),
    /// Backend or transport failure. Holds the failure detail.
    Failed(Value),
}

/// Something a worker can hand a task to.
pub trait Backend: Clone + Send + Sync + 'static {
    /// Run `payload` at `entry_point` on `address`. Never fails: every error
    /// is reported as [`Reply::Failed`].
    fn invoke(
        &self,
        address: &str,
        entry_point: &str,
        payload: &Value,
    ) -> impl Future<Output = Reply> + Send;
}

/// Shared HTTP client with a bounded per-call timeout.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl BackendClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn transport_error(&self, e: &reqwest::Error) -> Value {
        if e.is_timeout() {
            json!({ "error": format!("backend timed out after {}s: {e}", self.timeout.as_secs_f64()) })
        } else {
            json!({ "error": e.to_string() })
        }
    }
}

impl Backend for BackendClient {
    /// POST `payload` to the backend's entry point and classify the answer.
    async fn invoke(&self, address: &str, entry_point: &str, payload: &Value) -> Reply {
        let url = endpoint_url(address, entry_point);
        debug!(%url, "calling backend");

        let response = match self.client.post(&url).json(payload).send().await {
            Ok(r) => r,
            Err(e) => return Reply::Failed(self.transport_error(&e)),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => return Reply::Failed(self.transport_error(&e)),
        };

        if !status.is_success() {
            return Reply::Failed(http_failure(status.as_u16(), body));
        }

        let parsed: Value = match serde_json::from_str(&body) {
            Ok(v) => v,
            Err(e) => {
                return Reply::Failed(json!({ "error": format!("malformed backend response: {e}") }));
            }
        };

        if reports_failure(&parsed) {
            return Reply::Failed(http_failure(status.as_u16(), body));
        }

        match parsed.get("result") {
            Some(v) if !v.is_null() => Reply::Completed(v.clone()),
            _ => Reply::Completed(json!(OK_SENTINEL)),
        }
    }
}

fn http_failure(status: u16, body: String) -> Value {
    json!({ "http_status": status, "response_text": body })
}

/// A 2xx body whose own `status` field says the run failed.
fn reports_failure(body: &Value) -> bool {
    matches!(
        body.get("status").and_then(Value::as_str),
        Some("failed" | "error")
    )
}

/// Join a directory address and entry point into a URL.
pub fn endpoint_url(address: &str, entry_point: &str) -> String {
    let base = address.trim().trim_end_matches('/');
    let path = entry_point.trim_start_matches('/');
    if base.starts_with("http://") || base.starts_with("https://") {
        format!("{base}/{path}")
    } else {
        format!("http://{base}/{path}")
    }
}

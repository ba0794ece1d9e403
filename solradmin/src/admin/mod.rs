//! Admin API client
//!
//! Talks to `/admin/collections` and `/admin/cores`. Transport failures are
//! retried through [`RetryPolicy`]; HTTP and API-level rejections are handed
//! back as [`AdminResponse`] for the caller to judge.

mod client;
mod request;
mod retry;

pub use client::SolrAdminClient;
pub use request::{AdminEndpoint, AdminRequest};
pub use retry::RetryPolicy;

use crate::error::{ClusterError, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Operations the migration engine and reports need from the cluster
#[async_trait]
pub trait AdminApi: Send + Sync {
    /// `ADDREPLICA`; `node` lets the cluster pick when absent
    async fn add_replica(
        &self,
        collection: &str,
        shard: &str,
        node: Option<&str>,
        async_id: Option<&str>,
    ) -> Result<AdminResponse>;

    /// `DELETEREPLICA`
    async fn delete_replica(
        &self,
        collection: &str,
        shard: &str,
        replica: &str,
        only_if_down: bool,
        async_id: Option<&str>,
    ) -> Result<AdminResponse>;

    /// `REQUESTSTATUS` for an async request id
    async fn request_status(&self, request_id: &str) -> Result<AsyncRequestStatus>;

    /// Drop every stored async request status
    async fn flush_request_status(&self) -> Result<AdminResponse>;

    /// Core `STATUS`, sent to `node` when given
    async fn core_status(&self, node: Option<&str>, core: Option<&str>) -> Result<AdminResponse>;

    async fn list_collections(&self) -> Result<Vec<String>>;
}

/// Raw outcome of an admin call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminResponse {
    pub http_status: u16,
    /// Parsed JSON body, or the raw text as a string when it was not JSON
    pub body: Value,
}

impl AdminResponse {
    pub fn new(http_status: u16, body: Value) -> Self {
        Self { http_status, body }
    }

    /// A 200 response carrying `body`
    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    /// `responseHeader.status`; 0 means accepted
    pub fn status(&self) -> Option<i64> {
        self.body
            .pointer("/responseHeader/status")
            .and_then(Value::as_i64)
    }

    pub fn error(&self) -> Option<&Value> {
        self.body.get("error")
    }

    /// Human readable rejection reason
    pub fn error_message(&self) -> String {
        if let Some(error) = self.error() {
            return error
                .get("msg")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
        }
        if let Some(failure) = self.body.get("failure") {
            return failure.to_string();
        }
        match (self.status(), &self.body) {
            (_, Value::String(text)) => format!("HTTP {}: {}", self.http_status, text),
            (Some(status), _) => format!("HTTP {}, status {}", self.http_status, status),
            (None, _) => format!("HTTP {}, no responseHeader", self.http_status),
        }
    }

    /// 2xx, `responseHeader.status == 0` and no `error` key
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.http_status) && self.status() == Some(0) && self.error().is_none()
    }
}

/// State of an async admin request as reported by `REQUESTSTATUS`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum AsyncState {
    Submitted,
    Running,
    Completed,
    Failed,
    NotFound,
    Other(String),
}

impl AsyncState {
    pub fn as_str(&self) -> &str {
        match self {
            AsyncState::Submitted => "submitted",
            AsyncState::Running => "running",
            AsyncState::Completed => "completed",
            AsyncState::Failed => "failed",
            AsyncState::NotFound => "notfound",
            AsyncState::Other(s) => s,
        }
    }

    /// Still queued or executing on the cluster
    pub fn is_pending(&self) -> bool {
        matches!(self, AsyncState::Submitted | AsyncState::Running)
    }
}

impl From<&str> for AsyncState {
    fn from(s: &str) -> Self {
        match s {
            "submitted" => AsyncState::Submitted,
            "running" => AsyncState::Running,
            "completed" => AsyncState::Completed,
            "failed" => AsyncState::Failed,
            "notfound" => AsyncState::NotFound,
            other => AsyncState::Other(other.to_string()),
        }
    }
}

impl From<AsyncState> for String {
    fn from(state: AsyncState) -> Self {
        state.as_str().to_string()
    }
}

impl std::fmt::Display for AsyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AsyncRequestStatus {
    pub request_id: String,
    pub state: AsyncState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AsyncRequestStatus {
    pub fn new(request_id: &str, state: AsyncState) -> Self {
        Self {
            request_id: request_id.to_string(),
            state,
            message: None,
        }
    }

    /// Read `status.state` / `status.msg` out of a `REQUESTSTATUS` response
    pub fn from_response(request_id: &str, response: &AdminResponse) -> Result<Self> {
        let state = response
            .body
            .pointer("/status/state")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ClusterError::UnexpectedResponse(format!(
                    "REQUESTSTATUS {}: no status.state ({})",
                    request_id,
                    response.error_message()
                ))
            })?;
        let message = response
            .body
            .pointer("/status/msg")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            request_id: request_id.to_string(),
            state: AsyncState::from(state),
            message,
        })
    }
}

/// Prepend `http://` when no scheme is present and drop trailing slashes
pub fn normalize_base_url(url: &str) -> String {
    let url = url.trim();
    let url = if url.contains("://") {
        url.to_string()
    } else {
        format!("http://{}", url)
    };
    url.trim_end_matches('/').to_string()
}

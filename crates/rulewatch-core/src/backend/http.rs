//! HTTP agent service client.
//!
//! Implements [`AgentBackend`] by POSTing to `<base_url>/agent`. Plain
//! requests are sent as JSON; requests with an attachment are sent as a
//! multipart form with the document in a `file` part.

use std::time::Duration;

use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use zeroize::Zeroizing;

use crate::BoxFuture;

use super::client::{AgentBackend, BackendError, BackendRequest};

const AGENT_PATH: &str = "/agent";
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// HTTP client for the agent service.
pub struct HttpBackend {
    client: Client,
    endpoint: String,
    api_key: Option<Zeroizing<String>>,
}

impl HttpBackend {
    /// Create a client for the service at `base_url` with a request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Network(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}{AGENT_PATH}", base_url.trim_end_matches('/')),
            api_key: None,
        })
    }

    /// Send `Authorization: Bearer <key>` with every request.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(Zeroizing::new(api_key.into()));
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build(&self, request: &BackendRequest) -> reqwest::RequestBuilder {
        let mut builder = self.client.post(&self.endpoint);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key.as_str());
        }
        match request.attachment {
            Some(ref attachment) => {
                let part = Part::bytes(attachment.bytes.clone()).file_name(attachment.filename.clone());
                let form = Form::new()
                    .text("message", request.message.clone())
                    .text("agent_id", request.capability_id.clone())
                    .part("file", part);
                builder.multipart(form)
            }
            None => builder.json(&AgentRequestBody {
                message: &request.message,
                agent_id: &request.capability_id,
            }),
        }
    }
}

impl AgentBackend for HttpBackend {
    fn name(&self) -> &str {
        "HTTP"
    }

    fn call(&self, request: &BackendRequest) -> BoxFuture<'_, Result<Value, BackendError>> {
        let builder = self.build(request);
        let agent_id = request.capability_id.clone();
        Box::pin(async move {
            debug!(endpoint = %self.endpoint, agent_id = %agent_id, "Agent request");

            let resp = builder.send().await.map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout
                } else {
                    BackendError::Network(e.to_string())
                }
            })?;

            let status = resp.status().as_u16();
            if !resp.status().is_success() {
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let body = resp.text().await.unwrap_or_default();
                return Err(status_error(status, retry_after.as_deref(), body));
            }

            let body: Value = resp
                .json()
                .await
                .map_err(|e| BackendError::Parse(e.to_string()))?;
            Ok(unwrap_reply(body))
        })
    }
}

#[derive(Debug, Serialize)]
struct AgentRequestBody<'a> {
    message: &'a str,
    agent_id: &'a str,
}

/// Map a non-success status to a [`BackendError`].
fn status_error(status: u16, retry_after: Option<&str>, body: String) -> BackendError {
    match status {
        401 | 403 => BackendError::Auth(body),
        429 => BackendError::RateLimited {
            retry_after_secs: retry_after
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        _ => BackendError::Remote {
            status,
            message: body,
        },
    }
}

/// Strip the service envelope: `response.result`, then `result`, then the
/// body itself.
fn unwrap_reply(mut body: Value) -> Value {
    if let Some(result) = body.pointer_mut("/response/result") {
        return result.take();
    }
    if let Some(result) = body.get_mut("result") {
        return result.take();
    }
    body
}

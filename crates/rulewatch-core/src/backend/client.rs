//! Backend client trait: the single request/response call to the reasoning
//! service.

use std::fmt;

use serde_json::Value;

use crate::BoxFuture;

/// A document sent along with a request.
#[derive(Clone)]
pub struct Attachment {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("filename", &self.filename)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// One call to the backend.
#[derive(Debug, Clone)]
pub struct BackendRequest {
    /// The user's text, verbatim.
    pub message: String,
    /// Identifier of the capability to invoke, from the capability table.
    pub capability_id: String,
    pub attachment: Option<Attachment>,
}

/// Errors from backend calls.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("network error: {0}")]
    Network(String),

    #[error("authentication failed (check API key): {0}")]
    Auth(String),

    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("backend error {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("response parse error: {0}")]
    Parse(String),

    #[error("timeout")]
    Timeout,
}

/// A reasoning backend.
///
/// Uses `BoxFuture` so the session can hold a `dyn AgentBackend`. The reply
/// is returned unstructured; interpreting it is the classifier's job.
pub trait AgentBackend: Send + Sync {
    /// Display name for logs.
    fn name(&self) -> &str;

    /// Send one request and wait for the reply payload.
    fn call(&self, request: &BackendRequest) -> BoxFuture<'_, Result<Value, BackendError>>;
}

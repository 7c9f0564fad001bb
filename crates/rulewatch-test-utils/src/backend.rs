//! Scripted backend for session and CLI tests.
//!
//! Replies are served in the order they were queued; every request is
//! recorded for later assertions. An exhausted script answers with a
//! network error, which the session turns into a fallback turn.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use rulewatch_core::{AgentBackend, BackendError, BackendRequest, BoxFuture};

/// A backend double that replays queued outcomes.
#[derive(Default)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Result<Value, BackendError>>>,
    requests: Mutex<Vec<BackendRequest>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a successful reply.
    pub fn reply(self: &Arc<Self>, payload: Value) -> Arc<Self> {
        self.push(Ok(payload))
    }

    /// Queue a failure.
    pub fn fail(self: &Arc<Self>, error: BackendError) -> Arc<Self> {
        self.push(Err(error))
    }

    fn push(self: &Arc<Self>, outcome: Result<Value, BackendError>) -> Arc<Self> {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(outcome);
        }
        Arc::clone(self)
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<BackendRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl AgentBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "Scripted"
    }

    fn call(&self, request: &BackendRequest) -> BoxFuture<'_, Result<Value, BackendError>> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let outcome = self
            .script
            .lock()
            .ok()
            .and_then(|mut s| s.pop_front())
            .unwrap_or_else(|| Err(BackendError::Network("script exhausted".to_string())));
        Box::pin(async move { outcome })
    }
}

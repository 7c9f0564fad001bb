//! Conversation session.
//!
//! A session owns the conversation log and the active version selection and
//! is driven by a single logical actor (every mutation takes `&mut self`).
//! At most one backend call is outstanding at a time:
//!
//! ```text
//!            begin()                 complete(ticket, reply)
//!   Idle ─────────────▶ AwaitingReply ─────────────────────▶ Idle
//!    ▲                       │            (turn appended)
//!    └───────── cancel() ────┘
//!                 (late reply discarded)
//! ```
//!
//! Leaving `AwaitingReply` through [`Session::complete`] happens in the same
//! step as appending the resulting turn, so turn order always matches
//! submission order.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use rulewatch_config::CapabilityTable;

use crate::backend::{AgentBackend, Attachment, BackendError, BackendRequest};
use crate::catalog::{CatalogError, VersionCatalog};
use crate::conversation::{ConversationLog, TurnId};
use crate::response::classify;
use crate::router::{Capability, route};
use crate::rule::Version;

/// Assistant text appended when the backend call fails.
pub const FALLBACK_NOTICE: &str = "Sorry, I encountered an error processing your request.";

/// Identifies one outstanding backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallTicket(u64);

/// Pending-call state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingReply {
        ticket: CallTicket,
        capability: Capability,
    },
}

/// A routed request waiting to be sent to the backend.
#[derive(Debug, Clone)]
pub struct PendingCall {
    pub ticket: CallTicket,
    pub capability: Capability,
    pub request: BackendRequest,
}

/// Errors from session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("a request is already awaiting a reply")]
    Busy,

    #[error("nothing to send: message is empty and no document is attached")]
    EmptyInput,

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// A single conversation with the reasoning backend.
pub struct Session {
    log: ConversationLog,
    state: SessionState,
    next_ticket: u64,
    catalog: VersionCatalog,
    selected_version: Option<String>,
    capabilities: CapabilityTable,
    backend: Arc<dyn AgentBackend>,
}

impl Session {
    pub fn new(
        backend: Arc<dyn AgentBackend>,
        capabilities: CapabilityTable,
        catalog: VersionCatalog,
    ) -> Self {
        Self {
            log: ConversationLog::new(),
            state: SessionState::Idle,
            next_ticket: 0,
            catalog,
            selected_version: None,
            capabilities,
            backend,
        }
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, SessionState::AwaitingReply { .. })
    }

    pub fn catalog(&self) -> &VersionCatalog {
        &self.catalog
    }

    /// Shared handle to the backend, for callers that run the call themselves
    /// (e.g. on a spawned task) and hand the result back to [`Session::complete`].
    pub fn backend(&self) -> Arc<dyn AgentBackend> {
        Arc::clone(&self.backend)
    }

    /// Select the version under review. The id must exist in the catalog.
    pub fn select_version(&mut self, id: &str) -> Result<&Version, SessionError> {
        let version = self.catalog.get(id)?;
        self.selected_version = Some(version.id.clone());
        info!(version = %version.id, label = %version.label, "Active version selected");
        Ok(version)
    }

    /// The selected version, or the latest one if none was selected.
    pub fn active_version(&self) -> Option<&Version> {
        match self.selected_version {
            Some(ref id) => self.catalog.find(id),
            None => self.catalog.latest(),
        }
    }

    /// Append the user's turn, route it, and enter `AwaitingReply`.
    ///
    /// Rejected with [`SessionError::Busy`] while another call is outstanding;
    /// nothing is appended in that case.
    pub fn begin(
        &mut self,
        text: &str,
        attachment: Option<Attachment>,
    ) -> Result<PendingCall, SessionError> {
        if self.is_pending() {
            return Err(SessionError::Busy);
        }
        if text.trim().is_empty() && attachment.is_none() {
            return Err(SessionError::EmptyInput);
        }

        let filename = attachment.as_ref().map(|a| a.filename.as_str());
        let turn = self.log.append_user_turn(text, filename);

        let capability = route(text, attachment.is_some());
        self.next_ticket += 1;
        let ticket = CallTicket(self.next_ticket);
        self.state = SessionState::AwaitingReply { ticket, capability };

        info!(turn = %turn, capability = %capability, "Request routed");

        Ok(PendingCall {
            ticket,
            capability,
            request: BackendRequest {
                message: text.to_string(),
                capability_id: capability.agent_id(&self.capabilities).to_string(),
                attachment,
            },
        })
    }

    /// Deliver the outcome of the call identified by `ticket`.
    ///
    /// If the session is awaiting exactly that ticket, the reply is classified
    /// (or replaced by [`FALLBACK_NOTICE`] on error), appended, and the session
    /// returns to `Idle`. A reply for a cancelled or superseded call is
    /// discarded and `None` is returned.
    pub fn complete(
        &mut self,
        ticket: CallTicket,
        outcome: Result<Value, BackendError>,
    ) -> Option<TurnId> {
        let capability = match self.state {
            SessionState::AwaitingReply {
                ticket: awaited,
                capability,
            } if awaited == ticket => capability,
            _ => {
                debug!(?ticket, "Discarding reply for a call no longer awaited");
                return None;
            }
        };

        let turn = match outcome {
            Ok(raw) => {
                let response = classify(raw);
                info!(
                    capability = %capability,
                    kind = response.kind().as_str(),
                    "Reply classified"
                );
                self.log
                    .append_assistant_turn(response.summary(), Some(response))
            }
            Err(e) => {
                warn!(capability = %capability, error = %e, "Backend call failed");
                self.log.append_assistant_turn(FALLBACK_NOTICE, None)
            }
        };
        self.state = SessionState::Idle;
        Some(turn)
    }

    /// Abandon the outstanding call, if any. Its eventual reply is discarded.
    pub fn cancel(&mut self) {
        if let SessionState::AwaitingReply { ticket, .. } = self.state {
            info!(?ticket, "Outstanding call cancelled");
            self.state = SessionState::Idle;
        }
    }

    /// Route, call the backend, and append the reply in one step.
    ///
    /// Backend failures never surface here; they become a fallback turn.
    /// Dropping the returned future before the reply arrives (a timeout, a
    /// `select!` branch losing) cancels the call, leaving the session `Idle`.
    pub async fn submit(
        &mut self,
        text: &str,
        attachment: Option<Attachment>,
    ) -> Result<TurnId, SessionError> {
        let pending = self.begin(text, attachment)?;
        let backend = self.backend();
        let mut guard = CancelOnDrop {
            session: self,
            ticket: pending.ticket,
        };
        let outcome = backend.call(&pending.request).await;
        guard
            .session
            .complete(pending.ticket, outcome)
            .ok_or(SessionError::Busy)
    }
}

/// Cancels the guarded call on drop unless it was completed first.
struct CancelOnDrop<'a> {
    session: &'a mut Session,
    ticket: CallTicket,
}

impl Drop for CancelOnDrop<'_> {
    fn drop(&mut self) {
        if matches!(
            self.session.state,
            SessionState::AwaitingReply { ticket, .. } if ticket == self.ticket
        ) {
            self.session.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::BoxFuture;
    use crate::conversation::Role;
    use crate::response::ResponseKind;

    /// Replies with a fixed payload and records every request.
    struct FixedBackend {
        reply: Value,
        seen: Mutex<Vec<BackendRequest>>,
    }

    impl FixedBackend {
        fn new(reply: Value) -> Arc<Self> {
            Arc::new(Self {
                reply,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl AgentBackend for FixedBackend {
        fn name(&self) -> &str {
            "fixed"
        }

        fn call(&self, request: &BackendRequest) -> BoxFuture<'_, Result<Value, BackendError>> {
            self.seen.lock().unwrap().push(request.clone());
            let reply = self.reply.clone();
            Box::pin(async move { Ok(reply) })
        }
    }

    struct FailingBackend;

    impl AgentBackend for FailingBackend {
        fn name(&self) -> &str {
            "failing"
        }

        fn call(&self, _request: &BackendRequest) -> BoxFuture<'_, Result<Value, BackendError>> {
            Box::pin(async { Err(BackendError::Network("connection refused".to_string())) })
        }
    }

    fn session_with(backend: Arc<dyn AgentBackend>) -> Session {
        Session::new(backend, CapabilityTable::default(), VersionCatalog::default())
    }

    #[test]
    fn test_begin_routes_and_enters_pending() {
        let mut session = session_with(FixedBackend::new(json!({})));
        let pending = session.begin("check fund status", None).unwrap();

        assert_eq!(pending.capability, Capability::CheckCompliance);
        assert_eq!(
            pending.request.capability_id,
            CapabilityTable::default().check_compliance
        );
        assert!(session.is_pending());
        assert_eq!(session.log().len(), 1);
        assert_eq!(session.log().turns()[0].role, Role::User);
    }

    #[test]
    fn test_second_begin_is_rejected_while_pending() {
        let mut session = session_with(FixedBackend::new(json!({})));
        session.begin("first", None).unwrap();

        let second = session.begin("second", None);
        assert!(matches!(second, Err(SessionError::Busy)));
        assert_eq!(session.log().len(), 1);
    }

    #[test]
    fn test_empty_input_rejected() {
        let mut session = session_with(FixedBackend::new(json!({})));
        assert!(matches!(session.begin("  ", None), Err(SessionError::EmptyInput)));
        assert!(session.log().is_empty());
        assert!(!session.is_pending());
    }

    #[test]
    fn test_attachment_only_is_extraction() {
        let mut session = session_with(FixedBackend::new(json!({})));
        let pending = session
            .begin("", Some(Attachment::new("guidelines.pdf", b"%PDF".to_vec())))
            .unwrap();
        assert_eq!(pending.capability, Capability::ExtractRules);
        assert_eq!(session.log().turns()[0].content, " [Attached: guidelines.pdf]");
    }

    #[test]
    fn test_complete_appends_and_returns_to_idle() {
        let mut session = session_with(FixedBackend::new(json!({})));
        let pending = session.begin("what is the cash limit", None).unwrap();

        let turn = session
            .complete(pending.ticket, Ok(json!({"response_type": "qa", "answer": "10%"})))
            .unwrap();

        assert_eq!(session.state(), SessionState::Idle);
        let turn = session.log().get(turn).unwrap();
        assert_eq!(turn.role, Role::Assistant);
        assert_eq!(turn.content, "10%");
        assert_eq!(
            turn.response.as_ref().unwrap().kind(),
            ResponseKind::QuestionAnswer
        );
    }

    #[test]
    fn test_cancelled_reply_is_discarded() {
        let mut session = session_with(FixedBackend::new(json!({})));
        let first = session.begin("first", None).unwrap();
        session.cancel();
        assert_eq!(session.state(), SessionState::Idle);

        let second = session.begin("second", None).unwrap();
        assert!(session.complete(first.ticket, Ok(json!({}))).is_none());
        assert!(session.is_pending());

        session.complete(second.ticket, Ok(json!({}))).unwrap();
        let roles: Vec<Role> = session.log().turns().iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::User, Role::User, Role::Assistant]);
    }

    #[test]
    fn test_complete_without_pending_call_is_ignored() {
        let mut session = session_with(FixedBackend::new(json!({})));
        assert!(session.complete(CallTicket(1), Ok(json!({}))).is_none());
        assert!(session.log().is_empty());
    }

    #[test]
    fn test_cancel_when_idle_is_noop() {
        let mut session = session_with(FixedBackend::new(json!({})));
        session.cancel();
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_submit_round_trip() {
        let backend = FixedBackend::new(json!({"compliance_score": 0}));
        let mut session = session_with(backend.clone());

        let turn = session.submit("run a compliance check", None).await.unwrap();

        let turn = session.log().get(turn).unwrap();
        assert_eq!(
            turn.response.as_ref().unwrap().kind(),
            ResponseKind::ComplianceCheck
        );
        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].message, "run a compliance check");
    }

    #[test_log::test(tokio::test)]
    async fn test_backend_failure_becomes_fallback_turn() {
        let mut session = session_with(Arc::new(FailingBackend));

        let turn = session.submit("what is the cash limit", None).await.unwrap();
        let turn = session.log().get(turn).unwrap();
        assert_eq!(turn.content, FALLBACK_NOTICE);
        assert!(turn.response.is_none());

        // Still usable afterwards.
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.submit("again", None).await.is_ok());
        assert_eq!(session.log().len(), 4);
    }

    /// Never replies.
    struct SilentBackend;

    impl AgentBackend for SilentBackend {
        fn name(&self) -> &str {
            "silent"
        }

        fn call(&self, _request: &BackendRequest) -> BoxFuture<'_, Result<Value, BackendError>> {
            Box::pin(std::future::pending())
        }
    }

    #[tokio::test]
    async fn test_dropped_submit_returns_to_idle() {
        let mut session = session_with(Arc::new(SilentBackend));

        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), session.submit("hi", None)).await;
        assert!(timed_out.is_err());

        assert_eq!(session.state(), SessionState::Idle);
        let roles: Vec<Role> = session.log().turns().iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::User]);
        assert!(session.begin("hello again", None).is_ok());
    }

    #[test]
    fn test_select_unknown_version_fails() {
        let mut session = session_with(FixedBackend::new(json!({})));
        let err = session.select_version("v9").unwrap_err();
        assert!(matches!(err, SessionError::Catalog(CatalogError::VersionNotFound(_))));
        assert!(session.active_version().is_none());
    }
}

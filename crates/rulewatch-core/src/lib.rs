#![deny(unsafe_code)]

//! RuleWatch core.
//!
//! Reconciles machine-extracted regulatory rules across document versions,
//! routes free-text requests to one of the reasoning backend's capabilities,
//! and resolves the backend's untagged replies into a closed set of response
//! variants. The [`Session`] ties these together behind a single-actor
//! conversation log.

use std::future::Future;
use std::pin::Pin;

/// A type-erased, `Send`-safe, boxed future used by object-safe async traits
/// such as [`AgentBackend`].
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Reasoning backend client trait and HTTP implementation.
pub mod backend;
/// Version catalog: reverse-chronological collection with id lookup.
pub mod catalog;
/// Append-only conversation log.
pub mod conversation;
/// Rule-set difference between two versions.
pub mod diff;
mod lenient;
/// Backend response variants and structural classification.
pub mod response;
/// Free-text request routing to backend capabilities.
pub mod router;
/// Extracted rules and the versions that own them.
pub mod rule;
/// Conversation session with an explicit pending-call state machine.
pub mod session;

pub use backend::{AgentBackend, Attachment, BackendError, BackendRequest, HttpBackend};
pub use catalog::{CatalogError, VersionCatalog};
pub use conversation::{ConversationLog, ConversationTurn, Role, TurnId};
pub use diff::{DiffResult, ModifiedRule, diff};
pub use response::{AgentResponse, ResponseKind, classify};
pub use router::{Capability, route};
pub use rule::{Rule, RuleFilter, RuleType, Version};
pub use session::{PendingCall, Session, SessionError, SessionState};

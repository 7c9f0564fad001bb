//! Reasoning backend integration.
//!
//! The session talks to the backend through the [`AgentBackend`] trait: one
//! request carrying the user's message, a capability identifier, and an
//! optional attachment; one unstructured JSON reply.
//!
//! ```text
//! ┌─────────┐     ┌──────────────┐
//! │ Session │────▶│ AgentBackend │  (trait)
//! └─────────┘     └──────┬───────┘
//!                        │
//!              ┌─────────┴─────────┐
//!              ▼                   ▼
//!     ┌──────────────┐    ┌──────────────┐
//!     │ HttpBackend  │    │ test doubles │
//!     └──────────────┘    └──────────────┘
//! ```

pub mod client;
pub mod http;

use std::time::Duration;

pub use client::{AgentBackend, Attachment, BackendError, BackendRequest};
pub use http::HttpBackend;

/// Create the backend client from config.
pub fn create_backend(
    config: &rulewatch_config::BackendConfig,
) -> Result<Box<dyn AgentBackend>, BackendError> {
    let mut backend =
        HttpBackend::new(&config.base_url, Duration::from_secs(config.timeout_secs))?;
    if let Some(key) = config.resolved_api_key() {
        backend = backend.with_api_key(key);
    }
    Ok(Box::new(backend))
}

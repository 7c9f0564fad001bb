#![deny(unsafe_code)]

//! Shared test utilities for the RuleWatch workspace.
//!
//! Provides reusable fixtures, config builders, a scripted backend, and
//! tracing helpers so that individual crate tests stay concise and consistent.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! rulewatch-test-utils = { workspace = true }
//! ```

pub mod backend;
pub mod config;
pub mod fixtures;
pub mod tracing_setup;

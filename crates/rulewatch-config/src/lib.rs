#![deny(unsafe_code)]

//! Configuration loading and validation for RuleWatch.
//!
//! Loads TOML configuration files and validates them. [`AppConfig`] is the
//! central configuration structure; [`CapabilityTable`] is the static mapping
//! from logical backend capability to the identifier the reasoning service
//! expects.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Environment variable consulted when `backend.api_key` is empty.
pub const API_KEY_ENV: &str = "RULEWATCH_API_KEY";

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Reasoning backend configuration.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Version catalog source.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection settings for the reasoning backend.
///
/// ## TOML Example
///
/// ```toml
/// [backend]
/// base_url = "https://agents.internal.example"
/// timeout_secs = 90
///
/// [backend.capabilities]
/// extract_rules = "rule-extraction"
/// check_compliance = "compliance-checker"
/// answer_question = "compliance-manager"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the agent service.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token. Empty means "read from `RULEWATCH_API_KEY`".
    #[serde(default)]
    pub api_key: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Capability identifier table.
    #[serde(default)]
    pub capabilities: CapabilityTable,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
            capabilities: CapabilityTable::default(),
        }
    }
}

impl BackendConfig {
    /// The API key to use: the configured value, or the environment fallback.
    ///
    /// Returns `None` when neither is set.
    pub fn resolved_api_key(&self) -> Option<String> {
        if !self.api_key.is_empty() {
            return Some(self.api_key.clone());
        }
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.is_empty() => {
                debug!(var = API_KEY_ENV, "Using API key from environment");
                Some(key)
            }
            _ => None,
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8700".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

/// Static table of backend agent identifiers, one per capability.
///
/// The defaults are the identifiers of the stock agent deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityTable {
    /// Agent that extracts rules from guideline documents.
    #[serde(default = "default_extract_rules_id")]
    pub extract_rules: String,

    /// Agent that checks portfolios against the current rules.
    #[serde(default = "default_check_compliance_id")]
    pub check_compliance: String,

    /// Conversational agent answering free-form questions.
    #[serde(default = "default_answer_question_id")]
    pub answer_question: String,
}

impl Default for CapabilityTable {
    fn default() -> Self {
        Self {
            extract_rules: default_extract_rules_id(),
            check_compliance: default_check_compliance_id(),
            answer_question: default_answer_question_id(),
        }
    }
}

fn default_extract_rules_id() -> String {
    "6967f2adf038ff7259fe2dc2".to_string()
}

fn default_check_compliance_id() -> String {
    "6967f2cd55d255804bb17162".to_string()
}

fn default_answer_question_id() -> String {
    "6967f34255d255804bb1716c".to_string()
}

/// Where the externally supplied version catalog lives.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Path to a `.toml` or `.json` catalog file.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = &self.backend.base_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "backend.base_url must be an http(s) URL, got {url:?}"
            )));
        }
        if self.backend.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "backend.timeout_secs must be non-zero".to_string(),
            ));
        }

        let caps = &self.backend.capabilities;
        let ids = [
            ("extract_rules", &caps.extract_rules),
            ("check_compliance", &caps.check_compliance),
            ("answer_question", &caps.answer_question),
        ];
        for (name, id) in ids {
            if id.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "backend.capabilities.{name} must not be empty"
                )));
            }
        }
        for (i, (a_name, a)) in ids.iter().enumerate() {
            for (b_name, b) in &ids[i + 1..] {
                if a == b {
                    return Err(ConfigError::Validation(format!(
                        "backend.capabilities.{a_name} and {b_name} share the id {a:?}"
                    )));
                }
            }
        }

        if let Some(ref path) = self.catalog.path {
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if ext != "toml" && ext != "json" {
                return Err(ConfigError::Validation(format!(
                    "catalog.path must end in .toml or .json, got {}",
                    path.display()
                )));
            }
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {:?}, got {:?}",
                valid_levels, self.logging.level
            )));
        }

        Ok(())
    }
}

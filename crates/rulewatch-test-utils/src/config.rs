//! Configuration builders for tests.

use std::path::PathBuf;

use rulewatch_config::{AppConfig, CapabilityTable};

/// Fluent builder for [`AppConfig`] in tests.
///
/// # Example
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .base_url("http://127.0.0.1:9")
///     .timeout_secs(1)
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn base_url(mut self, url: &str) -> Self {
        self.config.backend.base_url = url.to_string();
        self
    }

    pub fn api_key(mut self, key: &str) -> Self {
        self.config.backend.api_key = key.to_string();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.backend.timeout_secs = secs;
        self
    }

    /// Short, readable capability ids: `extract`, `check`, `answer`.
    pub fn short_capability_ids(mut self) -> Self {
        self.config.backend.capabilities = CapabilityTable {
            extract_rules: "extract".to_string(),
            check_compliance: "check".to_string(),
            answer_question: "answer".to_string(),
        };
        self
    }

    pub fn catalog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.catalog.path = Some(path.into());
        self
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.config.logging.level = level.to_string();
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//! Version catalog.
//!
//! Versions are supplied already materialized (from a TOML or JSON file, or
//! built in memory). The catalog keeps them newest first and validates the
//! identity rules the diff engine relies on.
//!
//! ## TOML Example
//!
//! ```toml
//! [[versions]]
//! id = "v4"
//! label = "v2024.4"
//! source_filename = "IMA_Guidelines_Dec2024.pdf"
//! created_at = "2024-12-15T00:00:00Z"
//! uploader = "Sarah Chen"
//!
//! [[versions.rules]]
//! rule_id = "R001"
//! rule_name = "Cash Holdings Limit"
//! rule_type = "Limit"
//! value_threshold = "Max 10% NAV"
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::diff::{self, DiffResult};
use crate::rule::Version;

/// Errors from building, loading, or querying a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("version not found: {0}")]
    VersionNotFound(String),

    #[error("duplicate version id: {0}")]
    DuplicateVersion(String),

    #[error("version {version}: rule without an id")]
    MissingRuleId { version: String },

    #[error("version {version}: duplicate rule id {rule_id}")]
    DuplicateRule { version: String, rule_id: String },

    #[error("version {version}: rule {rule_id} has confidence {score} (must be 0–100)")]
    ConfidenceOutOfRange {
        version: String,
        rule_id: String,
        score: u8,
    },

    #[error("unsupported catalog format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML catalog: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to parse JSON catalog: {0}")]
    Json(#[from] serde_json::Error),
}

/// On-disk shape of a catalog file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    versions: Vec<Version>,
}

/// Reverse-chronological collection of versions. The head is the latest.
#[derive(Debug, Clone, Default)]
pub struct VersionCatalog {
    versions: Vec<Version>,
}

impl VersionCatalog {
    /// Build a catalog, validating ids and sorting newest first.
    ///
    /// Versions sharing a timestamp keep their input order.
    pub fn new(mut versions: Vec<Version>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for version in &versions {
            if !seen.insert(version.id.as_str()) {
                return Err(CatalogError::DuplicateVersion(version.id.clone()));
            }
            validate_rules(version)?;
        }
        versions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        debug!(count = versions.len(), "Version catalog built");
        Ok(Self { versions })
    }

    /// Parse a TOML catalog (`[[versions]]` tables).
    pub fn from_toml_str(s: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(s)?;
        Self::new(file.versions)
    }

    /// Parse a JSON catalog (`{"versions": [...]}`).
    pub fn from_json_str(s: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(s)?;
        Self::new(file.versions)
    }

    /// Load a catalog file; the format is chosen by extension.
    pub async fn load(path: &Path) -> Result<Self, CatalogError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let content = tokio::fs::read_to_string(path).await?;
        let catalog = match ext.as_str() {
            "toml" => Self::from_toml_str(&content)?,
            "json" => Self::from_json_str(&content)?,
            other => return Err(CatalogError::UnsupportedFormat(other.to_string())),
        };
        info!(path = %path.display(), versions = catalog.len(), "Loaded version catalog");
        Ok(catalog)
    }

    /// The most recent version, if any.
    pub fn latest(&self) -> Option<&Version> {
        self.versions.first()
    }

    pub fn find(&self, id: &str) -> Option<&Version> {
        self.versions.iter().find(|v| v.id == id)
    }

    /// Look up a version, failing with [`CatalogError::VersionNotFound`].
    pub fn get(&self, id: &str) -> Result<&Version, CatalogError> {
        self.find(id)
            .ok_or_else(|| CatalogError::VersionNotFound(id.to_string()))
    }

    /// Versions, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &Version> {
        self.versions.iter()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Diff two catalog versions by id.
    ///
    /// A missing id is a lookup failure, distinct from "no changes"; no diff is
    /// computed in that case.
    pub fn diff(&self, older_id: &str, newer_id: &str) -> Result<DiffResult, CatalogError> {
        let older = self.get(older_id)?;
        let newer = self.get(newer_id)?;
        Ok(diff::diff(older, newer))
    }
}

fn validate_rules(version: &Version) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for rule in &version.rules {
        if rule.rule_id.trim().is_empty() {
            return Err(CatalogError::MissingRuleId {
                version: version.id.clone(),
            });
        }
        if !seen.insert(rule.rule_id.as_str()) {
            return Err(CatalogError::DuplicateRule {
                version: version.id.clone(),
                rule_id: rule.rule_id.clone(),
            });
        }
        if rule.confidence_score > 100 {
            return Err(CatalogError::ConfidenceOutOfRange {
                version: version.id.clone(),
                rule_id: rule.rule_id.clone(),
                score: rule.confidence_score,
            });
        }
    }
    Ok(())
}

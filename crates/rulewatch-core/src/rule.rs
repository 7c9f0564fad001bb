//! Extracted rules and the document versions that own them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::lenient;

/// Category of an extracted guideline.
///
/// The extractor's label set is open: anything outside the three known
/// categories is kept verbatim as [`RuleType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleType {
    /// A numeric ceiling or floor (e.g. "Max 10% NAV").
    Limit,
    /// A prohibited practice (e.g. "No naked shorts").
    Restriction,
    /// A mandatory property (e.g. "Min BBB-").
    Requirement,
    /// Any other label, e.g. "Prohibition". Empty when the label was missing.
    Other(String),
}

impl RuleType {
    pub const ALL: [RuleType; 3] = [RuleType::Limit, RuleType::Restriction, RuleType::Requirement];

    pub fn as_str(&self) -> &str {
        match self {
            RuleType::Limit => "Limit",
            RuleType::Restriction => "Restriction",
            RuleType::Requirement => "Requirement",
            RuleType::Other(label) => label,
        }
    }

    /// Map a wire label to a type. Known names match case-insensitively.
    pub fn from_label(label: &str) -> Self {
        label
            .parse()
            .unwrap_or_else(|_| RuleType::Other(label.trim().to_string()))
    }
}

impl Default for RuleType {
    fn default() -> Self {
        RuleType::Other(String::new())
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RuleType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RuleType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = lenient::string(deserializer)?;
        Ok(RuleType::from_label(&label))
    }
}

/// Error returned when parsing an unknown rule type name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown rule type {0:?} (expected Limit, Restriction or Requirement)")]
pub struct UnknownRuleType(pub String);

/// Strict parse of the three known categories, for user-supplied filters.
impl FromStr for RuleType {
    type Err = UnknownRuleType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        RuleType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownRuleType(s.to_string()))
    }
}

/// One extracted compliance guideline.
///
/// Identity is `rule_id` within the owning [`Version`]. Every field decodes
/// leniently, since extraction replies are loosely typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default, deserialize_with = "lenient::string")]
    pub rule_id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub rule_name: String,
    #[serde(default)]
    pub rule_type: RuleType,
    #[serde(default, deserialize_with = "lenient::string")]
    pub value_threshold: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub applicable_funds: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub source_section: String,
    /// Extraction confidence, 0–100.
    #[serde(default, deserialize_with = "lenient::percent")]
    pub confidence_score: u8,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub ambiguous_flag: bool,
}

/// A timestamped snapshot of the rules extracted from one source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub id: String,
    /// Display label, e.g. `v2024.4`.
    pub label: String,
    pub source_filename: String,
    pub created_at: DateTime<Utc>,
    pub uploader: String,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl Version {
    /// Look up a rule by id.
    pub fn rule(&self, rule_id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.rule_id == rule_id)
    }

    /// Number of rules flagged as ambiguous by the extractor.
    pub fn ambiguous_count(&self) -> usize {
        self.rules.iter().filter(|r| r.ambiguous_flag).count()
    }

    /// Rules matching `filter`, in version order.
    pub fn filter_rules<'a>(&'a self, filter: &RuleFilter) -> Vec<&'a Rule> {
        self.rules.iter().filter(|r| filter.matches(r)).collect()
    }
}

/// Search/type filter over a version's rules.
///
/// `search` matches case-insensitively against the rule name or id; an empty
/// filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleFilter {
    pub search: Option<String>,
    pub rule_type: Option<RuleType>,
}

impl RuleFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn with_type(mut self, rule_type: RuleType) -> Self {
        self.rule_type = Some(rule_type);
        self
    }

    pub fn matches(&self, rule: &Rule) -> bool {
        let type_ok = self.rule_type.as_ref().is_none_or(|t| *t == rule.rule_type);
        let search_ok = match self.search.as_deref() {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                rule.rule_name.to_lowercase().contains(&term)
                    || rule.rule_id.to_lowercase().contains(&term)
            }
        };
        type_ok && search_ok
    }
}

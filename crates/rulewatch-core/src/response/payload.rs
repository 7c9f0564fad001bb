//! Payload records for each recognized backend response variant.
//!
//! Every field is optional on the wire and decodes leniently: missing,
//! `null`, or oddly typed values become their defaults, so a partially
//! filled reply still lands in its variant.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::lenient;
use crate::rule::Rule;

/// Rules extracted from an uploaded guideline document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedRules {
    #[serde(deserialize_with = "lenient::list")]
    pub extracted_rules: Vec<Rule>,
    #[serde(deserialize_with = "lenient::count")]
    pub total_rules_extracted: u32,
    #[serde(deserialize_with = "lenient::count")]
    pub ambiguous_rules_count: u32,
}

/// Outcome of checking portfolios against the current rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceReport {
    /// Overall score, 0–100.
    #[serde(deserialize_with = "lenient::float")]
    pub compliance_score: f64,
    #[serde(deserialize_with = "lenient::count")]
    pub total_rules_checked: u32,
    #[serde(deserialize_with = "lenient::count")]
    pub rules_passed: u32,
    #[serde(deserialize_with = "lenient::count")]
    pub rules_failed: u32,
    #[serde(deserialize_with = "lenient::list")]
    pub breach_report: Vec<Breach>,
    #[serde(deserialize_with = "lenient::list")]
    pub rebalancing_actions: Vec<RebalancingAction>,
    #[serde(deserialize_with = "lenient::list")]
    pub ambiguity_flags: Vec<AmbiguityFlag>,
}

impl ComplianceReport {
    pub fn band(&self) -> ScoreBand {
        ScoreBand::of(self.compliance_score)
    }
}

/// A single rule breach found during a compliance check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Breach {
    #[serde(deserialize_with = "lenient::string")]
    pub fund_name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub rule_violated: String,
    #[serde(deserialize_with = "lenient::string")]
    pub rule_id: String,
    #[serde(deserialize_with = "lenient::string")]
    pub current_portfolio_value: String,
    #[serde(deserialize_with = "lenient::string")]
    pub rule_limit: String,
    #[serde(deserialize_with = "lenient::string")]
    pub variance_percentage: String,
    #[serde(deserialize_with = "lenient::string")]
    pub severity_level: String,
    #[serde(deserialize_with = "lenient::string")]
    pub root_cause_analysis: String,
    #[serde(deserialize_with = "lenient::string")]
    pub remediation_suggestion: String,
}

impl Breach {
    pub fn severity(&self) -> Severity {
        Severity::parse(&self.severity_level)
    }
}

/// A suggested trade to cure a breach.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebalancingAction {
    #[serde(deserialize_with = "lenient::string")]
    pub fund: String,
    #[serde(deserialize_with = "lenient::string")]
    pub action: String,
    #[serde(deserialize_with = "lenient::string")]
    pub estimated_trade_impact: String,
    #[serde(deserialize_with = "lenient::string")]
    pub priority: String,
    #[serde(deserialize_with = "lenient::string")]
    pub timeline: String,
}

/// A rule the checker could not evaluate with confidence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbiguityFlag {
    #[serde(deserialize_with = "lenient::string")]
    pub rule_id: String,
    #[serde(deserialize_with = "lenient::string")]
    pub rule_name: String,
    #[serde(deserialize_with = "lenient::percent")]
    pub confidence_score: u8,
    #[serde(deserialize_with = "lenient::string")]
    pub ambiguity_note: String,
}

/// Conversational answer to a free-form question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Answer {
    #[serde(deserialize_with = "lenient::string")]
    pub answer: String,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub question: Option<String>,
    #[serde(deserialize_with = "lenient::record")]
    pub compliance_status: Option<ComplianceStatus>,
    #[serde(deserialize_with = "lenient::list")]
    pub source_references: Vec<SourceReference>,
    #[serde(deserialize_with = "lenient::list")]
    pub action_items: Vec<serde_json::Value>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub conversation_context: Option<String>,
}

/// Point-in-time status of one fund against one rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceStatus {
    #[serde(deserialize_with = "lenient::string")]
    pub fund_name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub rule_checked: String,
    #[serde(deserialize_with = "lenient::string")]
    pub current_value: String,
    #[serde(deserialize_with = "lenient::string")]
    pub limit: String,
    #[serde(deserialize_with = "lenient::string")]
    pub status: String,
    #[serde(deserialize_with = "lenient::string")]
    pub headroom: String,
}

impl ComplianceStatus {
    pub fn is_compliant(&self) -> bool {
        self.status == "Compliant"
    }
}

/// Guideline text cited by an answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceReference {
    #[serde(deserialize_with = "lenient::string")]
    pub section: String,
    #[serde(deserialize_with = "lenient::string")]
    pub rule_id: String,
    #[serde(deserialize_with = "lenient::string")]
    pub rule_name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub rule_text: String,
}

/// Coarse health band of a compliance score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    /// 80 and above.
    Healthy,
    /// 60 up to 80.
    Warning,
    /// Below 60.
    Critical,
}

impl ScoreBand {
    pub fn of(score: f64) -> Self {
        if score >= 80.0 {
            ScoreBand::Healthy
        } else if score >= 60.0 {
            ScoreBand::Warning
        } else {
            ScoreBand::Critical
        }
    }
}

/// Breach severity as reported by the checker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    /// Any label outside the known four, kept verbatim.
    Unknown(String),
}

impl Severity {
    pub fn parse(label: &str) -> Self {
        match label {
            "Critical" => Severity::Critical,
            "High" => Severity::High,
            "Medium" => Severity::Medium,
            "Low" => Severity::Low,
            other => Severity::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Critical => f.write_str("Critical"),
            Severity::High => f.write_str("High"),
            Severity::Medium => f.write_str("Medium"),
            Severity::Low => f.write_str("Low"),
            Severity::Unknown(label) => f.write_str(label),
        }
    }
}

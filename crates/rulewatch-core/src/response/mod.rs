//! Backend response variants and structural classification.
//!
//! The reasoning backend sends no variant tag, so [`classify`] is the single
//! place that guesses the shape of a reply. It runs ordered predicate checks
//! on key presence and falls back to [`AgentResponse::Unrecognized`], which
//! keeps the raw payload for diagnostic display. Classification never fails.

pub mod payload;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

pub use payload::{
    AmbiguityFlag, Answer, Breach, ComplianceReport, ComplianceStatus, ExtractedRules,
    RebalancingAction, ScoreBand, Severity, SourceReference,
};

/// A classified backend reply.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentResponse {
    RuleExtraction(ExtractedRules),
    ComplianceCheck(ComplianceReport),
    QuestionAnswer(Answer),
    /// A reply matching no known shape, carried unchanged.
    Unrecognized(Value),
}

/// Fieldless discriminant of [`AgentResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    RuleExtraction,
    ComplianceCheck,
    QuestionAnswer,
    Unrecognized,
}

impl ResponseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseKind::RuleExtraction => "rule_extraction",
            ResponseKind::ComplianceCheck => "compliance_check",
            ResponseKind::QuestionAnswer => "question_answer",
            ResponseKind::Unrecognized => "unrecognized",
        }
    }
}

impl AgentResponse {
    pub fn kind(&self) -> ResponseKind {
        match self {
            AgentResponse::RuleExtraction(_) => ResponseKind::RuleExtraction,
            AgentResponse::ComplianceCheck(_) => ResponseKind::ComplianceCheck,
            AgentResponse::QuestionAnswer(_) => ResponseKind::QuestionAnswer,
            AgentResponse::Unrecognized(_) => ResponseKind::Unrecognized,
        }
    }

    /// The raw payload of an unrecognized reply.
    pub fn raw(&self) -> Option<&Value> {
        match self {
            AgentResponse::Unrecognized(raw) => Some(raw),
            _ => None,
        }
    }

    /// One-line description used as the assistant turn's text.
    pub fn summary(&self) -> String {
        match self {
            AgentResponse::RuleExtraction(r) => format!(
                "Extracted {} rules ({} flagged for review)",
                r.total_rules_extracted, r.ambiguous_rules_count
            ),
            AgentResponse::ComplianceCheck(r) => format!(
                "Compliance score {}%: {} of {} rules passed, {} breaches",
                r.compliance_score,
                r.rules_passed,
                r.total_rules_checked,
                r.breach_report.len()
            ),
            AgentResponse::QuestionAnswer(a) => a.answer.clone(),
            AgentResponse::Unrecognized(raw) => raw.to_string(),
        }
    }
}

/// Resolve a raw reply to exactly one variant.
///
/// Checked in order, first match wins:
///
/// 1. key `extracted_rules` present → [`AgentResponse::RuleExtraction`]
/// 2. key `compliance_score` present, whatever its value (a score of `0`
///    is present, not absent) → [`AgentResponse::ComplianceCheck`]
/// 3. `response_type == "qa"` → [`AgentResponse::QuestionAnswer`]
/// 4. otherwise → [`AgentResponse::Unrecognized`]
///
/// Once a marker matches, the reply is that variant: fields that are
/// missing, `null`, or of an unexpected type decode to their defaults.
pub fn classify(raw: Value) -> AgentResponse {
    let Some(fields) = raw.as_object() else {
        debug!("Reply is not a JSON object");
        return AgentResponse::Unrecognized(raw);
    };

    if fields.contains_key("extracted_rules") {
        decode(raw, ResponseKind::RuleExtraction, AgentResponse::RuleExtraction)
    } else if fields.contains_key("compliance_score") {
        decode(raw, ResponseKind::ComplianceCheck, AgentResponse::ComplianceCheck)
    } else if fields.get("response_type").and_then(Value::as_str) == Some("qa") {
        decode(raw, ResponseKind::QuestionAnswer, AgentResponse::QuestionAnswer)
    } else {
        debug!(keys = ?fields.keys().collect::<Vec<_>>(), "Reply matches no known shape");
        AgentResponse::Unrecognized(raw)
    }
}

fn decode<T: DeserializeOwned + Default>(
    raw: Value,
    kind: ResponseKind,
    wrap: fn(T) -> AgentResponse,
) -> AgentResponse {
    let payload = T::deserialize(raw).unwrap_or_else(|e| {
        warn!(kind = kind.as_str(), error = %e, "Reply payload unreadable, using defaults");
        T::default()
    });
    wrap(payload)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::rule::RuleType;

    #[test]
    fn test_rule_extraction() {
        let raw = json!({
            "extracted_rules": [{
                "rule_id": "R001",
                "rule_name": "Cash Holdings Limit",
                "rule_type": "Limit",
                "value_threshold": "Max 10% NAV",
                "applicable_funds": "All Funds",
                "source_section": "§4.2",
                "confidence_score": 95,
                "ambiguous_flag": false
            }],
            "total_rules_extracted": 1,
            "ambiguous_rules_count": 0
        });
        let AgentResponse::RuleExtraction(payload) = classify(raw) else {
            panic!("expected RuleExtraction");
        };
        assert_eq!(payload.total_rules_extracted, 1);
        assert_eq!(payload.extracted_rules[0].rule_type, RuleType::Limit);
    }

    #[test]
    fn test_compliance_check() {
        let raw = json!({
            "compliance_score": 73,
            "total_rules_checked": 5,
            "rules_passed": 3,
            "rules_failed": 2,
            "breach_report": [{
                "fund_name": "China Growth Fund",
                "rule_violated": "Cash Holdings Limit",
                "rule_id": "R001",
                "current_portfolio_value": "12%",
                "rule_limit": "10%",
                "variance_percentage": "+2%",
                "severity_level": "Medium",
                "root_cause_analysis": "Recent redemptions increased cash position",
                "remediation_suggestion": "Deploy $2.4M into equity positions"
            }],
            "rebalancing_actions": [],
            "ambiguity_flags": []
        });
        let response = classify(raw);
        assert_eq!(response.kind(), ResponseKind::ComplianceCheck);
        let AgentResponse::ComplianceCheck(report) = response else {
            unreachable!();
        };
        assert_eq!(report.rules_failed, 2);
        assert_eq!(report.breach_report[0].severity(), Severity::Medium);
        assert_eq!(report.band(), ScoreBand::Warning);
    }

    #[test]
    fn test_zero_score_is_still_compliance_check() {
        let response = classify(json!({"compliance_score": 0, "rules_failed": 7}));
        let AgentResponse::ComplianceCheck(report) = response else {
            panic!("zero score must not fall through to Unrecognized");
        };
        assert_eq!(report.compliance_score, 0.0);
        assert_eq!(report.band(), ScoreBand::Critical);
    }

    #[test]
    fn test_null_score_counts_as_present() {
        let response = classify(json!({"compliance_score": null}));
        assert_eq!(response.kind(), ResponseKind::ComplianceCheck);
    }

    #[test]
    fn test_question_answer() {
        let raw = json!({
            "response_type": "qa",
            "answer": "Cash is capped at 10% of NAV.",
            "compliance_status": {
                "fund_name": "China Growth Fund",
                "rule_checked": "Cash Holdings Limit",
                "current_value": "12%",
                "limit": "10%",
                "status": "Breach",
                "headroom": "-2%"
            },
            "source_references": [{
                "section": "§4.2",
                "rule_id": "R001",
                "rule_name": "Cash Holdings Limit",
                "rule_text": "Cash shall not exceed 10% of NAV."
            }]
        });
        let AgentResponse::QuestionAnswer(answer) = classify(raw) else {
            panic!("expected QuestionAnswer");
        };
        assert_eq!(answer.answer, "Cash is capped at 10% of NAV.");
        assert!(!answer.compliance_status.unwrap().is_compliant());
        assert_eq!(answer.source_references.len(), 1);
    }

    #[test]
    fn test_question_answer_optional_parts_absent() {
        let AgentResponse::QuestionAnswer(answer) =
            classify(json!({"response_type": "qa", "answer": "Yes."}))
        else {
            panic!("expected QuestionAnswer");
        };
        assert!(answer.compliance_status.is_none());
        assert!(answer.source_references.is_empty());
    }

    #[test]
    fn test_priority_order() {
        let both = json!({"extracted_rules": [], "compliance_score": 90, "response_type": "qa"});
        assert_eq!(classify(both).kind(), ResponseKind::RuleExtraction);

        let score_and_qa = json!({"compliance_score": 90, "response_type": "qa"});
        assert_eq!(classify(score_and_qa).kind(), ResponseKind::ComplianceCheck);
    }

    #[test]
    fn test_empty_object_is_unrecognized_and_preserved() {
        let raw = json!({});
        let response = classify(raw.clone());
        assert_eq!(response.kind(), ResponseKind::Unrecognized);
        assert_eq!(response.raw(), Some(&raw));
    }

    #[test]
    fn test_other_response_type_is_unrecognized() {
        let raw = json!({"response_type": "chitchat", "answer": "hi"});
        assert_eq!(classify(raw.clone()).raw(), Some(&raw));
    }

    #[test]
    fn test_non_object_is_unrecognized() {
        for raw in [json!(null), json!("text"), json!([1, 2]), json!(42)] {
            assert_eq!(classify(raw.clone()).raw(), Some(&raw));
        }
    }

    #[test_log::test]
    fn test_marker_with_wrong_shaped_body_keeps_variant() {
        let AgentResponse::RuleExtraction(payload) =
            classify(json!({"extracted_rules": "not a list"}))
        else {
            panic!("expected RuleExtraction");
        };
        assert!(payload.extracted_rules.is_empty());
    }

    #[test]
    fn test_unknown_rule_type_is_still_extraction() {
        let raw = json!({"extracted_rules": [{"rule_id": "R1", "rule_type": "Prohibition"}]});
        let AgentResponse::RuleExtraction(payload) = classify(raw) else {
            panic!("expected RuleExtraction");
        };
        assert_eq!(
            payload.extracted_rules[0].rule_type,
            RuleType::Other("Prohibition".to_string())
        );
    }

    #[test]
    fn test_rule_without_id_is_still_extraction() {
        let raw = json!({"extracted_rules": [{"rule_name": "no id", "rule_type": "Limit"}]});
        let AgentResponse::RuleExtraction(payload) = classify(raw) else {
            panic!("expected RuleExtraction");
        };
        assert_eq!(payload.extracted_rules[0].rule_id, "");
        assert_eq!(payload.extracted_rules[0].rule_name, "no id");
    }

    #[test]
    fn test_fractional_confidence_is_still_extraction() {
        let raw = json!({"extracted_rules": [{
            "rule_id": "R1", "rule_name": "Cash", "rule_type": "Limit",
            "confidence_score": 0.95
        }]});
        let AgentResponse::RuleExtraction(payload) = classify(raw) else {
            panic!("expected RuleExtraction");
        };
        assert_eq!(payload.extracted_rules.len(), 1);
        assert_eq!(payload.extracted_rules[0].confidence_score, 1);
    }

    #[test]
    fn test_score_as_string() {
        let AgentResponse::ComplianceCheck(report) = classify(json!({"compliance_score": "85"}))
        else {
            panic!("expected ComplianceCheck");
        };
        assert_eq!(report.compliance_score, 85.0);
        assert_eq!(report.band(), ScoreBand::Healthy);
    }

    #[test]
    fn test_float_counters() {
        let raw = json!({"compliance_score": 72.5, "total_rules_checked": 5.0});
        let AgentResponse::ComplianceCheck(report) = classify(raw) else {
            panic!("expected ComplianceCheck");
        };
        assert_eq!(report.compliance_score, 72.5);
        assert_eq!(report.total_rules_checked, 5);
    }

    #[test]
    fn test_null_breach_field() {
        let raw = json!({"compliance_score": 50, "breach_report": [{"rule_id": null}]});
        let AgentResponse::ComplianceCheck(report) = classify(raw) else {
            panic!("expected ComplianceCheck");
        };
        assert_eq!(report.breach_report.len(), 1);
        assert_eq!(report.breach_report[0].rule_id, "");
    }

    #[test]
    fn test_null_headroom_in_answer_status() {
        let raw = json!({
            "response_type": "qa",
            "answer": "yes",
            "compliance_status": {"headroom": null}
        });
        let AgentResponse::QuestionAnswer(answer) = classify(raw) else {
            panic!("expected QuestionAnswer");
        };
        assert_eq!(answer.answer, "yes");
        assert_eq!(answer.compliance_status.unwrap().headroom, "");
    }

    #[test]
    fn test_summary_lines() {
        let r = classify(json!({"compliance_score": 100, "total_rules_checked": 4, "rules_passed": 4}));
        assert_eq!(
            r.summary(),
            "Compliance score 100%: 4 of 4 rules passed, 0 breaches"
        );

        let r = classify(json!({"extracted_rules": [], "total_rules_extracted": 0}));
        assert_eq!(r.summary(), "Extracted 0 rules (0 flagged for review)");
    }
}

//! Rule, version, and reply fixtures.
//!
//! [`sample_catalog`] is a four-version guideline history with one change of
//! each kind between neighbours, useful for diff and session tests.

use chrono::{TimeZone, Utc};
use serde_json::{Value, json};

use rulewatch_core::{Rule, RuleType, Version, VersionCatalog};

/// A rule with the fields the diff engine compares, and plausible defaults
/// for the rest.
pub fn rule(id: &str, name: &str, rule_type: RuleType, threshold: &str) -> Rule {
    Rule {
        rule_id: id.to_string(),
        rule_name: name.to_string(),
        rule_type,
        value_threshold: threshold.to_string(),
        applicable_funds: "All Funds".to_string(),
        source_section: "§1.1".to_string(),
        confidence_score: 90,
        ambiguous_flag: false,
    }
}

/// A version dated `y-m-d` at midnight UTC.
pub fn version(id: &str, label: &str, (y, m, d): (i32, u32, u32), rules: Vec<Rule>) -> Version {
    let created_at = Utc
        .with_ymd_and_hms(y, m, d, 0, 0, 0)
        .single()
        .unwrap_or_else(|| panic!("invalid fixture date {y}-{m}-{d}"));
    Version {
        id: id.to_string(),
        label: label.to_string(),
        source_filename: format!("IMA_Guidelines_{label}.pdf"),
        created_at,
        uploader: "Sarah Chen".to_string(),
        rules,
    }
}

/// Versions `v1`..`v4`, oldest to newest:
///
/// - `v1 → v2`: R002 7% → 5%, R003 threshold text changed
/// - `v2 → v3`: R001 15% → 10%, R005 added
/// - `v3 → v4`: R004 added, R005 20% → 25%
pub fn sample_versions() -> Vec<Version> {
    let cash = |t: &str| rule("R001", "Cash Holdings Limit", RuleType::Limit, t);
    let issuer = |t: &str| rule("R002", "Single Issuer Exposure", RuleType::Limit, t);
    let derivatives = |t: &str| rule("R003", "Derivative Prohibition", RuleType::Restriction, t);
    let sector = |t: &str| rule("R005", "Sector Concentration Limit", RuleType::Limit, t);
    let mut rating = rule("R004", "Credit Rating Floor", RuleType::Requirement, "Min BBB-");
    rating.confidence_score = 78;
    rating.ambiguous_flag = true;

    vec![
        version(
            "v1",
            "v2024.1",
            (2024, 3, 1),
            vec![cash("Max 15% NAV"), issuer("Max 7% NAV"), derivatives("No leverage")],
        ),
        version(
            "v2",
            "v2024.2",
            (2024, 6, 5),
            vec![cash("Max 15% NAV"), issuer("Max 5% NAV"), derivatives("No naked shorts")],
        ),
        version(
            "v3",
            "v2024.3",
            (2024, 9, 10),
            vec![
                cash("Max 10% NAV"),
                issuer("Max 5% NAV"),
                derivatives("No naked shorts"),
                sector("Max 20% per sector"),
            ],
        ),
        version(
            "v4",
            "v2024.4",
            (2024, 12, 15),
            vec![
                cash("Max 10% NAV"),
                issuer("Max 5% NAV"),
                derivatives("No naked shorts"),
                rating,
                sector("Max 25% per sector"),
            ],
        ),
    ]
}

/// [`sample_versions`] as a catalog (latest first).
pub fn sample_catalog() -> VersionCatalog {
    VersionCatalog::new(sample_versions()).unwrap_or_else(|e| panic!("invalid fixture: {e}"))
}

/// A rule-extraction reply with one ambiguous rule.
pub fn extraction_reply() -> Value {
    json!({
        "extracted_rules": [
            {
                "rule_id": "R001", "rule_name": "Cash Holdings Limit", "rule_type": "Limit",
                "value_threshold": "Max 10% NAV", "applicable_funds": "All Funds",
                "source_section": "§4.2", "confidence_score": 95, "ambiguous_flag": false
            },
            {
                "rule_id": "R004", "rule_name": "Credit Rating Floor", "rule_type": "Requirement",
                "value_threshold": "Min BBB-", "applicable_funds": "Bond Funds",
                "source_section": "§7.1", "confidence_score": 78, "ambiguous_flag": true
            }
        ],
        "total_rules_extracted": 2,
        "ambiguous_rules_count": 1
    })
}

/// A compliance-check reply with the given score and one breach.
pub fn compliance_reply(score: u32) -> Value {
    json!({
        "compliance_score": score,
        "total_rules_checked": 5,
        "rules_passed": 4,
        "rules_failed": 1,
        "breach_report": [{
            "fund_name": "Global Bond Fund",
            "rule_violated": "Credit Rating Floor",
            "rule_id": "R004",
            "current_portfolio_value": "BB+",
            "rule_limit": "BBB-",
            "variance_percentage": "N/A",
            "severity_level": "High",
            "root_cause_analysis": "Issuer downgrade from BBB- to BB+",
            "remediation_suggestion": "Divest $5.1M BB+ rated holding"
        }],
        "rebalancing_actions": [{
            "fund": "Global Bond Fund",
            "action": "Sell Telecom Italia Bond",
            "estimated_trade_impact": "$5.1M",
            "priority": "High",
            "timeline": "5 business days"
        }],
        "ambiguity_flags": []
    })
}

/// A question-answer reply.
pub fn qa_reply(answer: &str) -> Value {
    json!({
        "response_type": "qa",
        "answer": answer,
        "source_references": [{
            "section": "§4.2",
            "rule_id": "R001",
            "rule_name": "Cash Holdings Limit",
            "rule_text": "Cash and equivalents shall not exceed 10% of NAV."
        }]
    })
}

//! Plain-text rendering for versions, rules, diffs, and conversation turns.
//!
//! Every renderer returns a `String` so the console loop decides where it
//! goes. Long lists are cut at [`MAX_LIST_ITEMS`] with a "… N more" footer.

use std::fmt::Write;

use rulewatch_core::diff::ChangedField;
use rulewatch_core::response::{Answer, ComplianceReport, ExtractedRules, ScoreBand};
use rulewatch_core::{AgentResponse, ConversationTurn, DiffResult, Role, Rule, Version};

const MAX_LIST_ITEMS: usize = 10;

// ── Versions ──

/// One line per version, newest first, with the latest marked.
pub fn render_versions<'a>(versions: impl IntoIterator<Item = &'a Version>) -> String {
    let mut out = String::new();
    for (i, v) in versions.into_iter().enumerate() {
        let marker = if i == 0 { "*" } else { " " };
        let _ = writeln!(
            out,
            "{marker} {:<6} {:<10} {}  {:>3} rules  {:>2} ambiguous  {} ({})",
            v.id,
            v.label,
            v.created_at.format("%Y-%m-%d"),
            v.rules.len(),
            v.ambiguous_count(),
            v.source_filename,
            v.uploader,
        );
    }
    if out.is_empty() {
        out.push_str("No versions in catalog.\n");
    }
    out
}

// ── Rules ──

fn rule_line(rule: &Rule) -> String {
    let flag = if rule.ambiguous_flag { " [ambiguous]" } else { "" };
    format!(
        "{:<6} {:<12} {} ({}){flag}\n         {} | {} | confidence {}%",
        rule.rule_id,
        rule.rule_type.as_str(),
        rule.rule_name,
        rule.value_threshold,
        rule.applicable_funds,
        rule.source_section,
        rule.confidence_score,
    )
}

/// Rule table for one version.
pub fn render_rules(version: &Version, rules: &[&Rule]) -> String {
    let mut out = format!(
        "{} ({}): {} of {} rules\n",
        version.label,
        version.id,
        rules.len(),
        version.rules.len()
    );
    for rule in rules {
        let _ = writeln!(out, "  {}", rule_line(rule));
    }
    out
}

// ── Diff ──

/// Added / removed / modified sections for a comparison of two versions.
pub fn render_diff(older: &str, newer: &str, result: &DiffResult) -> String {
    let mut out = format!("{older} → {newer}: {}\n", result.summary());
    if result.is_empty() {
        out.push_str("  No rule changes.\n");
        return out;
    }

    if !result.added.is_empty() {
        out.push_str("\n  Added\n");
        for rule in &result.added {
            let _ = writeln!(out, "    + {} {} ({})", rule.rule_id, rule.rule_name, rule.value_threshold);
        }
    }
    if !result.removed.is_empty() {
        out.push_str("\n  Removed\n");
        for rule in &result.removed {
            let _ = writeln!(out, "    - {} {} ({})", rule.rule_id, rule.rule_name, rule.value_threshold);
        }
    }
    if !result.modified.is_empty() {
        out.push_str("\n  Modified\n");
        for m in &result.modified {
            let _ = writeln!(out, "    ~ {}", m.rule_id());
            for field in m.changed_fields() {
                let (label, old, new) = match field {
                    ChangedField::Name => ("name", &m.old.rule_name, &m.new.rule_name),
                    ChangedField::Threshold => {
                        ("threshold", &m.old.value_threshold, &m.new.value_threshold)
                    }
                };
                let _ = writeln!(out, "        {label}: {old} → {new}");
            }
        }
    }
    out
}

// ── Conversation ──

/// A turn as shown in the console.
pub fn render_turn(turn: &ConversationTurn) -> String {
    let time = turn.timestamp.format("%H:%M:%S");
    match (turn.role, &turn.response) {
        (Role::User, _) => format!("[{time}] you: {}\n", turn.content),
        (Role::Assistant, None) => format!("[{time}] agent: {}\n", turn.content),
        (Role::Assistant, Some(response)) => {
            format!("[{time}] agent:\n{}", render_response(response))
        }
    }
}

/// Variant-specific rendering of a classified reply.
pub fn render_response(response: &AgentResponse) -> String {
    match response {
        AgentResponse::RuleExtraction(r) => render_extraction(r),
        AgentResponse::ComplianceCheck(r) => render_compliance(r),
        AgentResponse::QuestionAnswer(a) => render_answer(a),
        AgentResponse::Unrecognized(raw) => {
            let pretty = serde_json::to_string_pretty(raw).unwrap_or_else(|_| raw.to_string());
            format!("  Unrecognized reply:\n{}\n", indent(&pretty, 4))
        }
    }
}

fn render_extraction(r: &ExtractedRules) -> String {
    let mut out = format!(
        "  Extracted {} rules, {} flagged for review\n",
        r.total_rules_extracted, r.ambiguous_rules_count
    );
    push_capped(&mut out, &r.extracted_rules, |out, rule| {
        let _ = writeln!(out, "    {}", rule_line(rule));
    });
    out
}

fn render_compliance(r: &ComplianceReport) -> String {
    let band = match r.band() {
        ScoreBand::Healthy => "healthy",
        ScoreBand::Warning => "warning",
        ScoreBand::Critical => "critical",
    };
    let mut out = format!(
        "  Compliance score {}% ({band}): {} checked, {} passed, {} failed\n",
        r.compliance_score, r.total_rules_checked, r.rules_passed, r.rules_failed
    );

    if !r.breach_report.is_empty() {
        out.push_str("  Breaches\n");
        push_capped(&mut out, &r.breach_report, |out, b| {
            let _ = writeln!(
                out,
                "    [{}] {} · {} ({}): {} vs limit {}",
                b.severity(),
                b.fund_name,
                b.rule_violated,
                b.rule_id,
                b.current_portfolio_value,
                b.rule_limit
            );
            if !b.root_cause_analysis.is_empty() {
                let _ = writeln!(out, "      cause: {}", b.root_cause_analysis);
            }
            if !b.remediation_suggestion.is_empty() {
                let _ = writeln!(out, "      fix:   {}", b.remediation_suggestion);
            }
        });
    }
    if !r.rebalancing_actions.is_empty() {
        out.push_str("  Rebalancing\n");
        push_capped(&mut out, &r.rebalancing_actions, |out, a| {
            let _ = writeln!(
                out,
                "    {} · {} ({}, {} priority, {})",
                a.fund, a.action, a.estimated_trade_impact, a.priority, a.timeline
            );
        });
    }
    if !r.ambiguity_flags.is_empty() {
        out.push_str("  Needs review\n");
        push_capped(&mut out, &r.ambiguity_flags, |out, f| {
            let _ = writeln!(
                out,
                "    {} {} ({}%): {}",
                f.rule_id, f.rule_name, f.confidence_score, f.ambiguity_note
            );
        });
    }
    out
}

fn render_answer(a: &Answer) -> String {
    let mut out = format!("{}\n", indent(&a.answer, 2));
    if let Some(ref status) = a.compliance_status {
        let mark = if status.is_compliant() { "✓" } else { "✗" };
        let _ = writeln!(
            out,
            "  {mark} {} · {}: {} (limit {}, headroom {})",
            status.fund_name, status.rule_checked, status.current_value, status.limit, status.headroom
        );
    }
    if !a.source_references.is_empty() {
        out.push_str("  Sources\n");
        push_capped(&mut out, &a.source_references, |out, s| {
            let _ = writeln!(out, "    {} {} ({})", s.section, s.rule_name, s.rule_id);
        });
    }
    out
}

// ── Helpers ──

fn push_capped<T>(out: &mut String, items: &[T], mut line: impl FnMut(&mut String, &T)) {
    for item in items.iter().take(MAX_LIST_ITEMS) {
        line(out, item);
    }
    if items.len() > MAX_LIST_ITEMS {
        let _ = writeln!(out, "    … {} more", items.len() - MAX_LIST_ITEMS);
    }
}

fn indent(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.lines()
        .map(|l| format!("{pad}{l}"))
        .collect::<Vec<_>>()
        .join("\n")
}

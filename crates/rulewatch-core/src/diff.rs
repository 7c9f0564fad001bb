//! Rule-set difference between two versions.
//!
//! Rules are matched by `rule_id` only. A matched pair counts as modified when
//! its `rule_name` or `value_threshold` differs; every other field is ignored
//! for change detection. The result is derived data and is never stored.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::rule::{Rule, Version};

/// A rule whose id exists in both versions with a changed name or threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModifiedRule {
    pub old: Rule,
    pub new: Rule,
}

/// Which compared field of a [`ModifiedRule`] changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangedField {
    Name,
    Threshold,
}

impl ModifiedRule {
    pub fn rule_id(&self) -> &str {
        &self.new.rule_id
    }

    pub fn changed_fields(&self) -> Vec<ChangedField> {
        let mut fields = Vec::with_capacity(2);
        if self.old.rule_name != self.new.rule_name {
            fields.push(ChangedField::Name);
        }
        if self.old.value_threshold != self.new.value_threshold {
            fields.push(ChangedField::Threshold);
        }
        fields
    }
}

/// Added / removed / modified classification of two rule sets.
///
/// The three lists are disjoint by `rule_id`; unchanged rules are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffResult {
    pub added: Vec<Rule>,
    pub removed: Vec<Rule>,
    pub modified: Vec<ModifiedRule>,
}

/// Change counts of a [`DiffResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffSummary {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
}

impl fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} added, {} removed, {} modified",
            self.added, self.removed, self.modified
        )
    }
}

impl DiffResult {
    /// True when the two versions carry the same rules (as far as the
    /// compared fields go).
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    pub fn summary(&self) -> DiffSummary {
        DiffSummary {
            added: self.added.len(),
            removed: self.removed.len(),
            modified: self.modified.len(),
        }
    }
}

/// Compare two versions. `older` is the baseline.
pub fn diff(older: &Version, newer: &Version) -> DiffResult {
    diff_rules(&older.rules, &newer.rules)
}

/// Compare two rule sets. An absent version is an empty slice.
///
/// Output order: `added` and `modified` follow `newer`, `removed` follows
/// `older`.
pub fn diff_rules(older: &[Rule], newer: &[Rule]) -> DiffResult {
    let older_index: HashMap<&str, &Rule> =
        older.iter().map(|r| (r.rule_id.as_str(), r)).collect();
    let newer_index: HashMap<&str, &Rule> =
        newer.iter().map(|r| (r.rule_id.as_str(), r)).collect();

    let mut result = DiffResult::default();

    for rule in newer {
        match older_index.get(rule.rule_id.as_str()) {
            None => result.added.push(rule.clone()),
            Some(old) => {
                if old.rule_name != rule.rule_name || old.value_threshold != rule.value_threshold
                {
                    result.modified.push(ModifiedRule {
                        old: (*old).clone(),
                        new: rule.clone(),
                    });
                }
            }
        }
    }

    result.removed = older
        .iter()
        .filter(|r| !newer_index.contains_key(r.rule_id.as_str()))
        .cloned()
        .collect();

    result
}

//! Request routing.
//!
//! Maps a free-text request (plus whether a document is attached) to one of
//! the backend's three capabilities using a lexical keyword heuristic. This is
//! a conversational UX convenience, not a safety-critical classifier: there is
//! no confidence signal, and a misrouted request is corrected by the user
//! re-asking. Every input maps to exactly one capability.

use std::fmt;

use rulewatch_config::CapabilityTable;

/// A backend operation selectable by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Extract rules from a guideline document.
    ExtractRules,
    /// Check portfolios against the current rules.
    CheckCompliance,
    /// Answer a free-form question. Default when nothing else matches.
    AnswerQuestion,
}

impl Capability {
    pub const ALL: [Capability; 3] = [
        Capability::ExtractRules,
        Capability::CheckCompliance,
        Capability::AnswerQuestion,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Capability::ExtractRules => "extract_rules",
            Capability::CheckCompliance => "check_compliance",
            Capability::AnswerQuestion => "answer_question",
        }
    }

    /// The backend identifier for this capability in `table`.
    pub fn agent_id(self, table: &CapabilityTable) -> &str {
        match self {
            Capability::ExtractRules => &table.extract_rules,
            Capability::CheckCompliance => &table.check_compliance,
            Capability::AnswerQuestion => &table.answer_question,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the capability for a request. First match wins:
///
/// 1. an attachment, or "extract" in the text → [`Capability::ExtractRules`]
/// 2. "check" or "compliance" in the text → [`Capability::CheckCompliance`]
/// 3. anything else → [`Capability::AnswerQuestion`]
///
/// Matching is case-insensitive substring search.
pub fn route(user_text: &str, has_attachment: bool) -> Capability {
    let text = user_text.to_lowercase();
    if has_attachment || text.contains("extract") {
        Capability::ExtractRules
    } else if text.contains("check") || text.contains("compliance") {
        Capability::CheckCompliance
    } else {
        Capability::AnswerQuestion
    }
}

//! Append-only conversation log.
//!
//! Turns are only ever appended; there is no edit or delete operation. Turn
//! ids are assigned from a per-log counter so they increase strictly with
//! insertion order.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::response::AgentResponse;

/// Identifier of a turn within its log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TurnId(u64);

impl TurnId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One entry in the conversation.
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    pub id: TurnId,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Classified backend reply. Always `None` for user turns and for
    /// failure notices.
    pub response: Option<AgentResponse>,
}

/// Ordered, append-only sequence of turns.
#[derive(Debug, Default)]
pub struct ConversationLog {
    turns: Vec<ConversationTurn>,
    next_id: u64,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user turn. An attachment name is recorded in the content as
    /// `"<text> [Attached: <name>]"`.
    pub fn append_user_turn(&mut self, text: &str, attachment: Option<&str>) -> TurnId {
        let content = match attachment {
            Some(name) => format!("{text} [Attached: {name}]"),
            None => text.to_string(),
        };
        self.push(Role::User, content, None)
    }

    /// Append an assistant turn carrying an optional classified reply.
    pub fn append_assistant_turn(
        &mut self,
        content: impl Into<String>,
        response: Option<AgentResponse>,
    ) -> TurnId {
        self.push(Role::Assistant, content.into(), response)
    }

    fn push(&mut self, role: Role, content: String, response: Option<AgentResponse>) -> TurnId {
        self.next_id += 1;
        let id = TurnId(self.next_id);
        self.turns.push(ConversationTurn {
            id,
            role,
            content,
            timestamp: Utc::now(),
            response,
        });
        id
    }

    /// All turns in insertion order.
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn get(&self, id: TurnId) -> Option<&ConversationTurn> {
        // Ids are dense and start at 1.
        let index = usize::try_from(id.0).ok()?.checked_sub(1)?;
        self.turns.get(index)
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

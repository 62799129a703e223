//! Conversation turn types.
//!
//! A turn is one entry in the chat transcript. Turns are append-only and
//! never reordered.

use serde::{Deserialize, Serialize};

/// Represents the author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// Turn from the user.
    User,
    /// Turn from the drafting agent.
    Assistant,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single entry in the drafting conversation.
///
/// Assistant turns produced by agent questions carry the question's reason
/// and the section/subsection it targets so the transcript can show where
/// in the document the question belongs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// The author of the turn.
    pub role: TurnRole,
    /// The text of the turn.
    pub content: String,
    /// Why the agent asked, when this turn is an agent question.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// The contract section the turn refers to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// The subsection the turn refers to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsection: Option<String>,
}

impl ConversationTurn {
    /// Creates a plain user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
            reason: None,
            section: None,
            subsection: None,
        }
    }

    /// Creates a plain assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
            reason: None,
            section: None,
            subsection: None,
        }
    }

    /// Creates an assistant turn for an agent question.
    pub fn assistant_question(
        content: impl Into<String>,
        reason: Option<String>,
        section: Option<String>,
        subsection: Option<String>,
    ) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
            reason,
            section,
            subsection,
        }
    }
}

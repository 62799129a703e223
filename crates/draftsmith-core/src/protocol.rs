//! Wire protocol for the conversational drafting agent.
//!
//! The agent answers each `/chat` turn with a single server-sent event whose
//! payload is a JSON object discriminated by `type`/`action` string tags.
//! This module turns that loosely-tagged payload into the closed
//! [`AgentReply`] sum type so every variant's fields are required-or-absent
//! by construction and matching is exhaustive at compile time.

use crate::error::{DraftError, Result};
use crate::session::section::ContractSection;
use crate::user_context::UserContext;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;

/// The structuring payload sent when the user approves the proposed outline
/// and starts drafting: the (possibly edited) idea, title and section list,
/// plus the read-only user context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeaStructuring {
    pub idea: String,
    pub title: String,
    pub all_sections: Vec<ContractSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_context: Option<UserContext>,
}

/// One outbound conversational turn.
///
/// `session_id` is serialized as an empty string until the agent has issued
/// one; the agent treats an unknown/empty id as "create a new session".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRequest {
    pub session_id: Option<String>,
    pub query: String,
    pub is_interrupt: bool,
    pub idea_structuring: Option<IdeaStructuring>,
}

impl TurnRequest {
    /// A fresh idea submission (no session yet, not resuming an interrupt).
    pub fn idea(query: impl Into<String>) -> Self {
        Self {
            session_id: None,
            query: query.into(),
            is_interrupt: false,
            idea_structuring: None,
        }
    }

    /// An answer resuming a pending agent interrupt.
    pub fn answer(session_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            query: query.into(),
            is_interrupt: true,
            idea_structuring: None,
        }
    }

    /// The structure-approval turn that moves the workflow into drafting.
    pub fn start_drafting(session_id: impl Into<String>, structuring: IdeaStructuring) -> Self {
        Self {
            session_id: Some(session_id.into()),
            query: String::new(),
            is_interrupt: true,
            idea_structuring: Some(structuring),
        }
    }
}

impl Serialize for TurnRequest {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // The agent expects all four keys on every request; absent values
        // are sent as empty string / empty object.
        let mut state = serializer.serialize_struct("TurnRequest", 4)?;
        state.serialize_field("session_id", self.session_id.as_deref().unwrap_or(""))?;
        state.serialize_field("query", &self.query)?;
        state.serialize_field("is_interrupt", &self.is_interrupt)?;
        match &self.idea_structuring {
            Some(structuring) => state.serialize_field("idea_structuring", structuring)?,
            None => state.serialize_field("idea_structuring", &serde_json::json!({}))?,
        }
        state.end()
    }
}

/// An agent question: a clarifying question before structuring, or a
/// per-section question during drafting (then usually carrying the current
/// in-progress draft).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionPayload {
    pub session_id: Option<String>,
    pub section: String,
    pub subsection: Option<String>,
    pub question: String,
    pub reason: Option<String>,
    pub draft: Option<String>,
}

/// A wholesale structure proposal: rephrased idea, title, section list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructurePayload {
    pub session_id: Option<String>,
    pub idea: String,
    pub title: String,
    pub sections: Vec<ContractSection>,
}

/// Decoded reply from the conversational agent, one variant per recognized
/// `action` tag. Anything else is a protocol error, never a silent no-op.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentReply {
    /// `action = "get_question_response"`.
    Question(QuestionPayload),
    /// `action = "get_structure_review"`.
    StructureReview(StructurePayload),
    /// `action = "get_reviewed_section_draft"`: a finished section draft
    /// awaiting user confirmation or edits.
    SectionReview {
        session_id: Option<String>,
        section: String,
        draft: String,
    },
    /// `action = "get_review_changes"`: the agent wants a description of the
    /// desired changes; no draft accompanies it.
    ReviewChanges {
        session_id: Option<String>,
        section: Option<String>,
    },
    /// `action = "generate_document"`, `type = "end"`: the terminal reply.
    /// When `drafts` is present it is the complete final draft map.
    DocumentComplete {
        session_id: Option<String>,
        title: Option<String>,
        drafts: Option<HashMap<String, String>>,
    },
}

impl AgentReply {
    /// The session id carried by the reply, if any.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            AgentReply::Question(q) => q.session_id.as_deref(),
            AgentReply::StructureReview(s) => s.session_id.as_deref(),
            AgentReply::SectionReview { session_id, .. } => session_id.as_deref(),
            AgentReply::ReviewChanges { session_id, .. } => session_id.as_deref(),
            AgentReply::DocumentComplete { session_id, .. } => session_id.as_deref(),
        }
    }
}

/// Loosely-tagged shape of the event payload, as the agent serializes it.
#[derive(Debug, Default, Deserialize)]
struct RawReply {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    section: Option<String>,
    #[serde(default)]
    subsection: Option<String>,
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    draft: Option<String>,
    #[serde(default)]
    idea: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    all_sections: Option<Vec<ContractSection>>,
    #[serde(default)]
    final_state: Option<RawFinalState>,
}

#[derive(Debug, Default, Deserialize)]
struct RawFinalState {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    all_drafts: Option<HashMap<String, String>>,
}

impl TryFrom<RawReply> for AgentReply {
    type Error = DraftError;

    fn try_from(raw: RawReply) -> Result<Self> {
        if raw.kind.as_deref() == Some("error") {
            let message = raw
                .question
                .unwrap_or_else(|| "the agent reported an unspecified error".to_string());
            return Err(DraftError::protocol(message));
        }

        match raw.action.as_deref() {
            Some("get_question_response") => Ok(AgentReply::Question(QuestionPayload {
                session_id: raw.session_id,
                section: require(raw.section, "get_question_response", "section")?,
                subsection: raw.subsection,
                question: require(raw.question, "get_question_response", "question")?,
                reason: raw.reason,
                draft: raw.draft,
            })),
            Some("get_structure_review") => Ok(AgentReply::StructureReview(StructurePayload {
                session_id: raw.session_id,
                idea: require(raw.idea, "get_structure_review", "idea")?,
                title: require(raw.title, "get_structure_review", "title")?,
                sections: require(raw.all_sections, "get_structure_review", "all_sections")?,
            })),
            Some("get_reviewed_section_draft") => Ok(AgentReply::SectionReview {
                session_id: raw.session_id,
                section: require(raw.section, "get_reviewed_section_draft", "section")?,
                draft: require(raw.draft, "get_reviewed_section_draft", "draft")?,
            }),
            Some("get_review_changes") => Ok(AgentReply::ReviewChanges {
                session_id: raw.session_id,
                section: raw.section,
            }),
            Some("generate_document") => {
                let final_state = raw.final_state.unwrap_or_default();
                Ok(AgentReply::DocumentComplete {
                    session_id: raw.session_id,
                    title: final_state.title.or(raw.title),
                    drafts: final_state.all_drafts,
                })
            }
            Some(other) => Err(DraftError::protocol(format!(
                "unrecognized action \"{}\"",
                other
            ))),
            None => Err(DraftError::protocol("reply carries no action tag")),
        }
    }
}

fn require<T>(value: Option<T>, action: &str, field: &str) -> Result<T> {
    value.ok_or_else(|| {
        DraftError::protocol(format!("{} reply is missing \"{}\"", action, field))
    })
}

/// Event stream marker preceding the JSON payload of a `/chat` reply.
const EVENT_PREFIX: &str = "data:";

/// Decodes one agent event into an [`AgentReply`].
///
/// Contract: strip a single leading `data:` stream marker if present, then
/// parse the remainder as JSON — both the prefixed and the bare form are
/// valid inputs. An empty body or a body that fails structural decoding is a
/// protocol error, not a silent no-op.
pub fn decode_event(body: &str) -> Result<AgentReply> {
    let trimmed = body.trim();
    let payload = trimmed
        .strip_prefix(EVENT_PREFIX)
        .map(str::trim)
        .unwrap_or(trimmed);
    if payload.is_empty() {
        return Err(DraftError::protocol("empty reply body"));
    }
    let raw: RawReply = serde_json::from_str(payload)
        .map_err(|e| DraftError::protocol(format!("undecodable reply: {}", e)))?;
    AgentReply::try_from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_prefixed_and_bare_events() {
        let json = r#"{"session_id":"s1","type":"interrupt","action":"get_question_response",
                       "section":"Terms","subsection":"Payment Terms",
                       "question":"What is the payment schedule?","reason":"Needed for Terms"}"#;
        let prefixed = format!("data: {}\n\n", json);
        for body in [json.to_string(), prefixed] {
            match decode_event(&body).unwrap() {
                AgentReply::Question(q) => {
                    assert_eq!(q.section, "Terms");
                    assert_eq!(q.question, "What is the payment schedule?");
                    assert_eq!(q.session_id.as_deref(), Some("s1"));
                }
                other => panic!("unexpected reply: {:?}", other),
            }
        }
    }

    #[test]
    fn empty_body_is_a_protocol_error() {
        assert!(decode_event("").unwrap_err().is_protocol());
        assert!(decode_event("data: ").unwrap_err().is_protocol());
    }

    #[test]
    fn undecodable_body_is_a_protocol_error() {
        assert!(decode_event("data: not json").unwrap_err().is_protocol());
    }

    #[test]
    fn unrecognized_action_is_a_protocol_error() {
        let err = decode_event(r#"{"action":"make_coffee"}"#).unwrap_err();
        assert!(err.to_string().contains("make_coffee"));
    }

    #[test]
    fn error_events_surface_the_agent_message() {
        let body = r#"data: {"session_id":"s1","type":"error","action":"error",
                      "question":"An error occurred: model overloaded"}"#;
        let err = decode_event(body).unwrap_err();
        assert!(err.is_protocol());
        assert!(err.to_string().contains("model overloaded"));
    }

    #[test]
    fn structure_review_requires_sections() {
        let body = r#"{"type":"interrupt","action":"get_structure_review",
                       "idea":"an NDA","title":"NDA"}"#;
        assert!(decode_event(body).unwrap_err().is_protocol());
    }

    #[test]
    fn document_complete_reads_final_state_drafts() {
        let body = r#"data: {"session_id":"s1","type":"end","action":"generate_document",
                      "final_state":{"title":"NDA","all_drafts":{"Intro":"text"}}}"#;
        match decode_event(body).unwrap() {
            AgentReply::DocumentComplete { title, drafts, .. } => {
                assert_eq!(title.as_deref(), Some("NDA"));
                assert_eq!(drafts.unwrap()["Intro"], "text");
            }
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[test]
    fn turn_request_serializes_empty_session_and_structuring() {
        let request = TurnRequest::idea("Draft an NDA");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["session_id"], "");
        assert_eq!(value["is_interrupt"], false);
        assert!(value["idea_structuring"].as_object().unwrap().is_empty());
    }
}

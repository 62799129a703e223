//! Workflow driver: one outbound agent request per user input, then a pure
//! interpretation of the tagged reply into store mutations.
//!
//! The driver never touches the store directly. It returns an [`Advance`]
//! describing the complete outcome; the store applies it atomically, so a
//! malformed reply can never be partially applied.

use crate::error::{DraftError, Result};
use crate::protocol::{AgentReply, IdeaStructuring, TurnRequest};
use crate::session::section::ContractSection;
use crate::session::stage::WorkflowStage;
use crate::session::turn::ConversationTurn;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Transport seam to the conversational agent.
///
/// The HTTP client crate provides the production implementation; tests use
/// in-memory mocks.
#[async_trait]
pub trait AgentChannel: Send + Sync {
    async fn converse(&self, request: TurnRequest) -> Result<AgentReply>;
}

/// One user input, classified by how it resumes the workflow.
#[derive(Debug, Clone)]
pub enum Submission<'a> {
    /// The initial contract idea; starts a new agent session.
    Idea { text: &'a str },
    /// An answer to a pending agent question.
    Answer { text: &'a str },
    /// Structure approval: moves the workflow into drafting.
    StartDrafting { structuring: IdeaStructuring },
    /// Review confirmation: the draft (confirmed verbatim or user-edited)
    /// resubmitted for the pending section review.
    Continue { draft: &'a str },
}

impl Submission<'_> {
    /// The stage the agent's reply must be interpreted against. Structure
    /// approval and review confirmation both resume inside drafting.
    fn reply_stage(&self, current: WorkflowStage) -> WorkflowStage {
        match self {
            Submission::StartDrafting { .. } | Submission::Continue { .. } => {
                WorkflowStage::Drafting
            }
            _ => current,
        }
    }
}

/// Wholesale structure replacement carried by a structure-review reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureReplacement {
    pub title: String,
    pub idea: String,
    pub sections: Vec<ContractSection>,
}

/// A single draft-registry write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftWrite {
    pub section: String,
    pub text: String,
}

/// Complete outcome of one driver call.
///
/// Side-effect budget per call: at most one appended turn, one draft write,
/// one stage transition and one session assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Advance {
    pub stage_after: WorkflowStage,
    pub turn: Option<ConversationTurn>,
    pub draft_write: Option<DraftWrite>,
    pub structure: Option<StructureReplacement>,
    pub session_id: Option<String>,
    pub active_section: Option<String>,
    pub review_pending: bool,
    pub drafting_complete: bool,
    pub completed_drafts: Option<HashMap<String, String>>,
}

impl Advance {
    fn to_stage(stage_after: WorkflowStage) -> Self {
        Self {
            stage_after,
            turn: None,
            draft_write: None,
            structure: None,
            session_id: None,
            active_section: None,
            review_pending: false,
            drafting_complete: false,
            completed_drafts: None,
        }
    }
}

/// Orchestrates agent calls and interprets replies.
pub struct WorkflowDriver {
    channel: Arc<dyn AgentChannel>,
}

impl WorkflowDriver {
    pub fn new(channel: Arc<dyn AgentChannel>) -> Self {
        Self { channel }
    }

    /// Issues exactly one agent request for `submission` and interprets the
    /// reply against the current stage.
    pub async fn advance(
        &self,
        stage: WorkflowStage,
        session_id: Option<&str>,
        submission: Submission<'_>,
    ) -> Result<Advance> {
        let reply_stage = submission.reply_stage(stage);
        let request = build_request(session_id, submission);
        debug!(stage = %stage, is_interrupt = request.is_interrupt, "sending turn request");
        let reply = self.channel.converse(request).await?;
        interpret(reply_stage, reply)
    }
}

fn build_request(session_id: Option<&str>, submission: Submission<'_>) -> TurnRequest {
    let session_id = session_id.map(str::to_string);
    match submission {
        Submission::Idea { text } => TurnRequest {
            session_id,
            query: text.to_string(),
            is_interrupt: false,
            idea_structuring: None,
        },
        Submission::Answer { text } | Submission::Continue { draft: text } => TurnRequest {
            session_id,
            query: text.to_string(),
            is_interrupt: true,
            idea_structuring: None,
        },
        Submission::StartDrafting { structuring } => TurnRequest {
            session_id,
            query: String::new(),
            is_interrupt: true,
            idea_structuring: Some(structuring),
        },
    }
}

/// Pure interpretation of an agent reply against the stage it resumes.
///
/// Replies that make no sense for the stage are protocol errors.
pub fn interpret(stage: WorkflowStage, reply: AgentReply) -> Result<Advance> {
    use WorkflowStage::*;

    match (stage, reply) {
        // Clarifying question before the agent has enough for a structure.
        (IdeaSubmission | QuestionResponse, AgentReply::Question(q)) => {
            let mut advance = Advance::to_stage(QuestionResponse);
            advance.session_id = q.session_id;
            advance.turn = Some(ConversationTurn::assistant_question(
                q.question,
                q.reason,
                Some(q.section),
                q.subsection,
            ));
            Ok(advance)
        }

        // The agent proposed a structure; replace the outline wholesale.
        (IdeaSubmission | QuestionResponse, AgentReply::StructureReview(s)) => {
            let mut advance = Advance::to_stage(StructureReview);
            advance.session_id = s.session_id;
            advance.structure = Some(StructureReplacement {
                title: s.title,
                idea: s.idea,
                sections: s.sections,
            });
            Ok(advance)
        }

        // Per-section question during drafting, usually with the current
        // in-progress draft attached.
        (Drafting, AgentReply::Question(q)) => {
            let mut advance = Advance::to_stage(Drafting);
            advance.session_id = q.session_id;
            advance.active_section = Some(q.section.clone());
            advance.draft_write = q
                .draft
                .filter(|d| !d.trim().is_empty())
                .map(|text| DraftWrite {
                    section: q.section.clone(),
                    text,
                });
            advance.turn = Some(ConversationTurn::assistant_question(
                q.question,
                q.reason,
                Some(q.section),
                q.subsection,
            ));
            Ok(advance)
        }

        // A finished section draft awaiting confirmation or edits.
        (Drafting, AgentReply::SectionReview {
            session_id,
            section,
            draft,
        }) => {
            let mut advance = Advance::to_stage(Drafting);
            advance.session_id = session_id;
            advance.active_section = Some(section.clone());
            advance.review_pending = true;
            advance.turn = Some(ConversationTurn::assistant_question(
                format!(
                    "A draft for \"{}\" is ready. Confirm it as-is, or edit the text and submit your version.",
                    section
                ),
                None,
                Some(section.clone()),
                None,
            ));
            advance.draft_write = Some(DraftWrite {
                section,
                text: draft,
            });
            Ok(advance)
        }

        // The agent wants a description of the desired changes.
        (Drafting, AgentReply::ReviewChanges {
            session_id,
            section,
        }) => {
            let mut advance = Advance::to_stage(Drafting);
            advance.session_id = session_id;
            advance.turn = Some(ConversationTurn::assistant_question(
                "What changes would you like to make to this section?".to_string(),
                None,
                section,
                None,
            ));
            Ok(advance)
        }

        // Terminal reply: the complete document.
        (Drafting, AgentReply::DocumentComplete {
            session_id,
            drafts,
            ..
        }) => {
            let mut advance = Advance::to_stage(Done);
            advance.session_id = session_id;
            advance.drafting_complete = true;
            advance.completed_drafts = drafts;
            advance.turn = Some(ConversationTurn::assistant(
                "All sections are complete. Your contract document is ready to export or save to the catalog.",
            ));
            Ok(advance)
        }

        (stage, reply) => Err(DraftError::protocol(format!(
            "reply {:?} is not valid while the workflow is in the {} stage",
            reply_name(&reply),
            stage
        ))),
    }
}

fn reply_name(reply: &AgentReply) -> &'static str {
    match reply {
        AgentReply::Question(_) => "get_question_response",
        AgentReply::StructureReview(_) => "get_structure_review",
        AgentReply::SectionReview { .. } => "get_reviewed_section_draft",
        AgentReply::ReviewChanges { .. } => "get_review_changes",
        AgentReply::DocumentComplete { .. } => "generate_document",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{QuestionPayload, StructurePayload};
    use crate::session::section::Subsection;
    use crate::session::turn::TurnRole;

    fn question(section: &str, draft: Option<&str>) -> AgentReply {
        AgentReply::Question(QuestionPayload {
            session_id: Some("s1".to_string()),
            section: section.to_string(),
            subsection: Some("Details".to_string()),
            question: "What should this cover?".to_string(),
            reason: Some("Information is missing".to_string()),
            draft: draft.map(str::to_string),
        })
    }

    fn structure() -> AgentReply {
        AgentReply::StructureReview(StructurePayload {
            session_id: Some("s1".to_string()),
            idea: "An NDA between two companies".to_string(),
            title: "Mutual NDA".to_string(),
            sections: vec![
                ContractSection {
                    heading: "Intro".to_string(),
                    purpose: "Introduce the parties".to_string(),
                    subsections: vec![Subsection::new("Parties", "Who signs")],
                },
                ContractSection {
                    heading: "Terms".to_string(),
                    purpose: "Define the terms".to_string(),
                    subsections: vec![Subsection::new("Confidentiality", "What is covered")],
                },
            ],
        })
    }

    #[test]
    fn clarifying_question_keeps_question_response_stage() {
        for stage in [WorkflowStage::IdeaSubmission, WorkflowStage::QuestionResponse] {
            let advance = interpret(stage, question("Terms", Some("ignored"))).unwrap();
            assert_eq!(advance.stage_after, WorkflowStage::QuestionResponse);
            let turn = advance.turn.unwrap();
            assert_eq!(turn.role, TurnRole::Assistant);
            assert_eq!(turn.section.as_deref(), Some("Terms"));
            // Pre-structure questions never touch the registry.
            assert!(advance.draft_write.is_none());
        }
    }

    #[test]
    fn structure_review_replaces_outline_without_a_turn() {
        let advance = interpret(WorkflowStage::IdeaSubmission, structure()).unwrap();
        assert_eq!(advance.stage_after, WorkflowStage::StructureReview);
        assert!(advance.turn.is_none());
        assert_eq!(advance.structure.unwrap().sections.len(), 2);
        assert_eq!(advance.session_id.as_deref(), Some("s1"));
    }

    #[test]
    fn drafting_question_writes_non_empty_draft() {
        let advance = interpret(WorkflowStage::Drafting, question("Terms", Some("draft text")))
            .unwrap();
        assert_eq!(advance.stage_after, WorkflowStage::Drafting);
        assert_eq!(advance.active_section.as_deref(), Some("Terms"));
        assert_eq!(advance.draft_write.unwrap().text, "draft text");
    }

    #[test]
    fn drafting_question_skips_blank_draft() {
        let advance = interpret(WorkflowStage::Drafting, question("Terms", Some("  "))).unwrap();
        assert!(advance.draft_write.is_none());
    }

    #[test]
    fn section_review_sets_review_pending_and_writes_draft() {
        let reply = AgentReply::SectionReview {
            session_id: Some("s1".to_string()),
            section: "Terms".to_string(),
            draft: "final terms".to_string(),
        };
        let advance = interpret(WorkflowStage::Drafting, reply).unwrap();
        assert!(advance.review_pending);
        assert_eq!(advance.draft_write.unwrap().text, "final terms");
        assert!(advance.turn.unwrap().content.contains("Confirm"));
    }

    #[test]
    fn document_complete_is_terminal() {
        let mut drafts = HashMap::new();
        drafts.insert("Intro".to_string(), "intro".to_string());
        let reply = AgentReply::DocumentComplete {
            session_id: Some("s1".to_string()),
            title: None,
            drafts: Some(drafts),
        };
        let advance = interpret(WorkflowStage::Drafting, reply).unwrap();
        assert_eq!(advance.stage_after, WorkflowStage::Done);
        assert!(advance.drafting_complete);
        assert!(advance.completed_drafts.is_some());
    }

    #[test]
    fn stage_mismatched_reply_is_a_protocol_error() {
        let err = interpret(WorkflowStage::Drafting, structure()).unwrap_err();
        assert!(err.is_protocol());
        let err = interpret(
            WorkflowStage::IdeaSubmission,
            AgentReply::SectionReview {
                session_id: None,
                section: "Terms".to_string(),
                draft: "text".to_string(),
            },
        )
        .unwrap_err();
        assert!(err.is_protocol());
    }
}

//! Workflow stage for the drafting conversation.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// The discrete phase the drafting workflow is currently in.
///
/// Exactly one stage is active at a time. Stages advance monotonically,
/// except that `QuestionResponse` loops on itself while the agent keeps
/// asking clarifying questions, and `Drafting` loops on itself through the
/// per-section question/review cycle. `Done` is absorbing: only a reset
/// leaves it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum WorkflowStage {
    /// Waiting for the user's initial contract idea.
    #[default]
    IdeaSubmission,
    /// The agent asked a clarifying question before proposing a structure.
    QuestionResponse,
    /// A proposed section structure is awaiting user review/edits.
    StructureReview,
    /// Section-by-section question/answer and review cycles.
    Drafting,
    /// The final document has been generated.
    Done,
}

impl WorkflowStage {
    /// Whether the workflow has reached its absorbing terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Whether a chat submission is meaningful in this stage. Structure
    /// review advances through the explicit start-drafting action instead.
    pub fn accepts_chat_input(&self) -> bool {
        matches!(
            self,
            Self::IdeaSubmission | Self::QuestionResponse | Self::Drafting
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn round_trips_kebab_case_names() {
        assert_eq!(WorkflowStage::IdeaSubmission.to_string(), "idea-submission");
        assert_eq!(
            WorkflowStage::from_str("structure-review").unwrap(),
            WorkflowStage::StructureReview
        );
    }

    #[test]
    fn only_done_is_terminal() {
        assert!(WorkflowStage::Done.is_terminal());
        assert!(!WorkflowStage::Drafting.is_terminal());
        assert!(!WorkflowStage::Done.accepts_chat_input());
    }
}

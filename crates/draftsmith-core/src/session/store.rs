//! Conversation state store: the single source of truth for the drafting
//! workflow.
//!
//! All mutation goes through named operations so a render pass always
//! observes a consistent snapshot. Driver failures never escape the store;
//! they become an appended error turn, and the stage field is left
//! untouched on error.

use crate::driver::{Advance, AgentChannel, Submission, WorkflowDriver};
use crate::error::{DraftError, Result};
use crate::protocol::IdeaStructuring;
use crate::session::registry::DraftRegistry;
use crate::session::section::{ContractStructure, Subsection};
use crate::session::stage::WorkflowStage;
use crate::session::turn::ConversationTurn;
use crate::user_context::UserContext;
use std::sync::Arc;
use tracing::warn;

/// What a submission did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The input was not actionable (blank, or the workflow is finished);
    /// nothing was sent.
    Ignored,
    /// The agent replied and the store advanced.
    Advanced,
    /// The request failed; an error turn was appended and the stage is
    /// unchanged.
    Errored,
}

/// The single mutable state container for one drafting conversation.
///
/// The contract assumes at most one outstanding workflow request at a time:
/// submitting while a request is in flight is a caller error, reported as a
/// validation failure without any network call.
pub struct ConversationStore {
    driver: WorkflowDriver,
    session_id: Option<String>,
    stage: WorkflowStage,
    turns: Vec<ConversationTurn>,
    structure: Option<ContractStructure>,
    registry: DraftRegistry,
    active_section: Option<String>,
    review_pending: bool,
    drafting_complete: bool,
    in_flight: bool,
    user_context: Option<UserContext>,
}

impl ConversationStore {
    pub fn new(channel: Arc<dyn AgentChannel>) -> Self {
        Self {
            driver: WorkflowDriver::new(channel),
            session_id: None,
            stage: WorkflowStage::IdeaSubmission,
            turns: Vec::new(),
            structure: None,
            registry: DraftRegistry::new(),
            active_section: None,
            review_pending: false,
            drafting_complete: false,
            in_flight: false,
            user_context: None,
        }
    }

    pub fn with_user_context(mut self, context: Option<UserContext>) -> Self {
        self.user_context = context;
        self
    }

    // ===== Reads =====

    pub fn stage(&self) -> WorkflowStage {
        self.stage
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn structure(&self) -> Option<&ContractStructure> {
        self.structure.as_ref()
    }

    pub fn registry(&self) -> &DraftRegistry {
        &self.registry
    }

    pub fn active_section(&self) -> Option<&str> {
        self.active_section.as_deref()
    }

    pub fn review_pending(&self) -> bool {
        self.review_pending
    }

    pub fn drafting_complete(&self) -> bool {
        self.drafting_complete
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn user_context(&self) -> Option<&UserContext> {
        self.user_context.as_ref()
    }

    // ===== Identity =====

    pub fn set_user_context(&mut self, context: UserContext) {
        self.user_context = Some(context);
    }

    pub fn clear_user_context(&mut self) {
        self.user_context = None;
    }

    // ===== Workflow =====

    /// Submits one chat input and advances the workflow.
    ///
    /// Blank input is a no-op unless a section review is pending, in which
    /// case it confirms the rendered draft: the draft is resubmitted
    /// verbatim without duplicating it as a new user turn.
    pub async fn submit_user_input(&mut self, text: &str) -> Result<SubmitOutcome> {
        self.ensure_not_in_flight()?;
        if self.stage.is_terminal() {
            return Ok(SubmitOutcome::Ignored);
        }

        let trimmed = text.trim();
        if self.stage == WorkflowStage::StructureReview {
            if trimmed.is_empty() {
                return Ok(SubmitOutcome::Ignored);
            }
            return Err(DraftError::validation(
                "the proposed structure is awaiting review; adjust the sections and start drafting",
            ));
        }

        if trimmed.is_empty() {
            if self.stage == WorkflowStage::Drafting && self.review_pending {
                // Synthetic continue: resubmit the rendered draft verbatim.
                let draft = self
                    .active_section
                    .as_deref()
                    .and_then(|s| self.registry.draft(s))
                    .unwrap_or_default()
                    .to_string();
                return self
                    .dispatch(Submission::Continue { draft: &draft })
                    .await;
            }
            return Ok(SubmitOutcome::Ignored);
        }

        self.turns.push(ConversationTurn::user(trimmed));
        let owned = trimmed.to_string();
        let submission = match self.stage {
            WorkflowStage::IdeaSubmission => Submission::Idea { text: &owned },
            WorkflowStage::Drafting if self.review_pending => {
                // The user edited the draft under review; their text becomes
                // the reviewed draft.
                Submission::Continue { draft: &owned }
            }
            _ => Submission::Answer { text: &owned },
        };
        self.dispatch(submission).await
    }

    /// Approves the (possibly edited) structure and moves into drafting.
    pub async fn start_drafting(&mut self) -> Result<SubmitOutcome> {
        self.ensure_not_in_flight()?;
        if self.stage != WorkflowStage::StructureReview {
            return Err(DraftError::validation(
                "drafting can only start from structure review",
            ));
        }
        let structure = self
            .structure
            .as_ref()
            .ok_or_else(|| DraftError::validation("no contract structure to approve"))?;
        let structuring = IdeaStructuring {
            idea: structure.idea.clone(),
            title: structure.title.clone(),
            all_sections: structure.sections.clone(),
            user_context: self.user_context.clone(),
        };
        self.dispatch(Submission::StartDrafting { structuring }).await
    }

    /// Clears the whole workflow back to idea submission. Callable from any
    /// stage, including mid-error, and always succeeds. The user context is
    /// identity, not workflow state, and survives.
    pub fn reset(&mut self) {
        self.session_id = None;
        self.stage = WorkflowStage::IdeaSubmission;
        self.turns.clear();
        self.structure = None;
        self.registry = DraftRegistry::new();
        self.active_section = None;
        self.review_pending = false;
        self.drafting_complete = false;
        self.in_flight = false;
    }

    // ===== Structure edits (structure-review panel) =====

    /// Renames a section, keeping its drafts and display position.
    pub fn rename_section(&mut self, old_heading: &str, new_heading: &str) -> Result<()> {
        let new_heading = new_heading.trim();
        if new_heading.is_empty() {
            return Err(DraftError::validation("section heading cannot be blank"));
        }
        let structure = self.structure_mut()?;
        if structure.section(new_heading).is_some() {
            return Err(DraftError::validation(format!(
                "a section named \"{}\" already exists",
                new_heading
            )));
        }
        let section = structure.section_mut(old_heading).ok_or_else(|| {
            DraftError::validation(format!("no section named \"{}\"", old_heading))
        })?;
        section.heading = new_heading.to_string();
        self.registry.rename_heading(old_heading, new_heading);
        if self.active_section.as_deref() == Some(old_heading) {
            self.active_section = Some(new_heading.to_string());
        }
        Ok(())
    }

    pub fn set_section_purpose(&mut self, heading: &str, purpose: &str) -> Result<()> {
        let structure = self.structure_mut()?;
        let section = structure
            .section_mut(heading)
            .ok_or_else(|| DraftError::validation(format!("no section named \"{}\"", heading)))?;
        section.purpose = purpose.to_string();
        Ok(())
    }

    pub fn add_subsection(&mut self, heading: &str, subsection: Subsection) -> Result<()> {
        let structure = self.structure_mut()?;
        let section = structure
            .section_mut(heading)
            .ok_or_else(|| DraftError::validation(format!("no section named \"{}\"", heading)))?;
        section.add_subsection(subsection);
        Ok(())
    }

    /// Removes a subsection; a section always keeps at least one.
    pub fn remove_subsection(&mut self, heading: &str, index: usize) -> Result<()> {
        let structure = self.structure_mut()?;
        let section = structure
            .section_mut(heading)
            .ok_or_else(|| DraftError::validation(format!("no section named \"{}\"", heading)))?;
        section.remove_subsection(index).map(|_| ())
    }

    // ===== Drafts =====

    /// Overwrites a section draft. Editing does not require the chat
    /// workflow to be active; edits persist independently of the stage.
    pub fn set_draft(&mut self, heading: &str, text: &str) {
        self.registry.set_draft(heading, text);
    }

    // ===== Internals =====

    fn ensure_not_in_flight(&self) -> Result<()> {
        if self.in_flight {
            return Err(DraftError::validation(
                "a workflow request is already in flight",
            ));
        }
        Ok(())
    }

    fn structure_mut(&mut self) -> Result<&mut ContractStructure> {
        self.structure
            .as_mut()
            .ok_or_else(|| DraftError::validation("no contract structure yet"))
    }

    async fn dispatch(&mut self, submission: Submission<'_>) -> Result<SubmitOutcome> {
        self.in_flight = true;
        let result = self
            .driver
            .advance(self.stage, self.session_id.as_deref(), submission)
            .await;
        self.in_flight = false;
        match result {
            Ok(advance) => {
                self.apply(advance);
                Ok(SubmitOutcome::Advanced)
            }
            Err(error) => {
                self.absorb_error(error);
                Ok(SubmitOutcome::Errored)
            }
        }
    }

    /// Applies one driver outcome atomically.
    fn apply(&mut self, advance: Advance) {
        if self.session_id.is_none() {
            self.session_id = advance.session_id;
        }
        if let Some(replacement) = advance.structure {
            self.registry = DraftRegistry::from_sections(&replacement.sections);
            self.structure = Some(ContractStructure::new(
                replacement.title,
                replacement.idea,
                replacement.sections,
            ));
            self.active_section = None;
        }
        if let Some(write) = advance.draft_write {
            self.registry.set_draft(write.section, write.text);
        }
        if let Some(completed) = advance.completed_drafts {
            self.registry.overwrite_from(&completed);
        }
        if advance.active_section.is_some() {
            self.active_section = advance.active_section;
        }
        self.review_pending = advance.review_pending;
        if advance.drafting_complete {
            self.drafting_complete = true;
        }
        if let Some(turn) = advance.turn {
            self.turns.push(turn);
        }
        self.stage = advance.stage_after;
    }

    /// Converts a driver failure into a user-visible error turn. The stage
    /// is never changed here; a failed idea submission additionally clears
    /// the aborted workflow scratch before the error turn is appended.
    fn absorb_error(&mut self, error: DraftError) {
        warn!(%error, stage = %self.stage, "workflow request failed");
        if self.stage == WorkflowStage::IdeaSubmission && error.is_transport() {
            self.reset();
        }
        self.turns
            .push(ConversationTurn::assistant(error.user_message()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{AgentReply, QuestionPayload, StructurePayload, TurnRequest};
    use crate::session::section::ContractSection;
    use crate::session::turn::TurnRole;
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    // Mock AgentChannel for testing: scripted replies, recorded requests.
    struct MockChannel {
        replies: Mutex<VecDeque<Result<AgentReply>>>,
        requests: Mutex<Vec<TurnRequest>>,
    }

    impl MockChannel {
        fn new(replies: Vec<Result<AgentReply>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn recorded(&self) -> Vec<TurnRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AgentChannel for MockChannel {
        async fn converse(&self, request: TurnRequest) -> Result<AgentReply> {
            self.requests.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(DraftError::internal("mock out of replies")))
        }
    }

    fn question_reply(section: &str) -> Result<AgentReply> {
        Ok(AgentReply::Question(QuestionPayload {
            session_id: Some("s1".to_string()),
            section: section.to_string(),
            subsection: None,
            question: format!("Tell me more about {}", section),
            reason: None,
            draft: None,
        }))
    }

    fn structure_reply(headings: &[&str]) -> Result<AgentReply> {
        Ok(AgentReply::StructureReview(StructurePayload {
            session_id: Some("s1".to_string()),
            idea: "A mutual NDA".to_string(),
            title: "Mutual NDA".to_string(),
            sections: headings
                .iter()
                .map(|h| ContractSection::new(*h, format!("Purpose of {}", h)))
                .collect(),
        }))
    }

    fn review_reply(section: &str, draft: &str) -> Result<AgentReply> {
        Ok(AgentReply::SectionReview {
            session_id: Some("s1".to_string()),
            section: section.to_string(),
            draft: draft.to_string(),
        })
    }

    fn complete_reply(drafts: &[(&str, &str)]) -> Result<AgentReply> {
        Ok(AgentReply::DocumentComplete {
            session_id: Some("s1".to_string()),
            title: None,
            drafts: Some(
                drafts
                    .iter()
                    .map(|(h, d)| (h.to_string(), d.to_string()))
                    .collect::<HashMap<_, _>>(),
            ),
        })
    }

    fn assistant_turns(store: &ConversationStore) -> usize {
        store
            .turns()
            .iter()
            .filter(|t| t.role == TurnRole::Assistant)
            .count()
    }

    #[tokio::test]
    async fn idea_to_structure_review_scenario() {
        let channel = MockChannel::new(vec![structure_reply(&["Intro", "Terms"])]);
        let mut store = ConversationStore::new(channel);

        let outcome = store.submit_user_input("Draft an NDA").await.unwrap();

        assert_eq!(outcome, SubmitOutcome::Advanced);
        assert_eq!(store.stage(), WorkflowStage::StructureReview);
        assert_eq!(store.structure().unwrap().sections.len(), 2);
        assert_eq!(store.session_id(), Some("s1"));
        let user_turns = store
            .turns()
            .iter()
            .filter(|t| t.role == TurnRole::User)
            .count();
        assert_eq!(user_turns, 1);
        // Registry primed with one empty entry per section.
        assert_eq!(store.registry().headings(), ["Intro", "Terms"]);
    }

    #[tokio::test]
    async fn repeated_questions_stay_in_question_response() {
        let channel = MockChannel::new(vec![
            question_reply("Scope"),
            question_reply("Scope"),
            question_reply("Scope"),
        ]);
        let mut store = ConversationStore::new(channel);

        store.submit_user_input("Draft an NDA").await.unwrap();
        assert_eq!(store.stage(), WorkflowStage::QuestionResponse);
        assert_eq!(assistant_turns(&store), 1);

        for expected in [2, 3] {
            store.submit_user_input("some answer").await.unwrap();
            assert_eq!(store.stage(), WorkflowStage::QuestionResponse);
            assert_eq!(assistant_turns(&store), expected);
        }
    }

    #[tokio::test]
    async fn structure_review_replaces_sections_wholesale() {
        let channel = MockChannel::new(vec![
            question_reply("Scope"),
            structure_reply(&["Preamble", "Obligations", "Signatures"]),
        ]);
        let mut store = ConversationStore::new(channel.clone());

        store.submit_user_input("Draft an NDA").await.unwrap();
        assert_eq!(store.stage(), WorkflowStage::QuestionResponse);
        // The answer gives the agent enough for a structure proposal.
        store.submit_user_input("It covers a software supplier").await.unwrap();

        assert_eq!(store.stage(), WorkflowStage::StructureReview);
        let headings = store.structure().unwrap().headings();
        assert_eq!(headings, ["Preamble", "Obligations", "Signatures"]);
        assert_eq!(store.registry().len(), 3);
        assert_eq!(channel.recorded().len(), 2);
    }

    #[tokio::test]
    async fn blank_input_outside_review_is_ignored() {
        let channel = MockChannel::new(vec![]);
        let mut store = ConversationStore::new(channel.clone());

        let outcome = store.submit_user_input("   ").await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Ignored);
        assert!(store.turns().is_empty());
        assert!(channel.recorded().is_empty());
    }

    #[tokio::test]
    async fn full_drafting_round_trip() {
        let channel = MockChannel::new(vec![
            structure_reply(&["Intro", "Terms"]),
            question_reply("Intro"),
            review_reply("Intro", "Intro draft v1"),
            complete_reply(&[("Intro", "Intro final"), ("Terms", "Terms final")]),
        ]);
        let mut store = ConversationStore::new(channel.clone());

        store.submit_user_input("Draft an NDA").await.unwrap();
        store.start_drafting().await.unwrap();
        assert_eq!(store.stage(), WorkflowStage::Drafting);
        assert_eq!(store.active_section(), Some("Intro"));

        store.submit_user_input("The parties are A and B").await.unwrap();
        assert!(store.review_pending());
        assert_eq!(store.registry().draft("Intro"), Some("Intro draft v1"));

        // Confirm the rendered draft with blank input (synthetic continue).
        let before = store.turns().len();
        store.submit_user_input("").await.unwrap();
        assert_eq!(store.stage(), WorkflowStage::Done);
        assert!(store.drafting_complete());
        assert_eq!(store.registry().draft("Terms"), Some("Terms final"));
        // Continue adds the terminal assistant turn but no user turn.
        let user_added = store.turns()[before..]
            .iter()
            .filter(|t| t.role == TurnRole::User)
            .count();
        assert_eq!(user_added, 0);
        // The rendered draft was resubmitted verbatim.
        let requests = channel.recorded();
        assert_eq!(requests.last().unwrap().query, "Intro draft v1");
    }

    #[tokio::test]
    async fn terminal_stage_absorbs_submissions() {
        let channel = MockChannel::new(vec![
            structure_reply(&["Intro"]),
            complete_reply(&[("Intro", "done")]),
        ]);
        let mut store = ConversationStore::new(channel.clone());
        store.submit_user_input("Draft an NDA").await.unwrap();
        store.start_drafting().await.unwrap();
        assert_eq!(store.stage(), WorkflowStage::Done);

        let requests_before = channel.recorded().len();
        let outcome = store.submit_user_input("anything else").await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Ignored);
        assert_eq!(store.stage(), WorkflowStage::Done);
        assert_eq!(channel.recorded().len(), requests_before);

        store.reset();
        assert_eq!(store.stage(), WorkflowStage::IdeaSubmission);
        assert!(store.turns().is_empty());
        assert!(store.session_id().is_none());
    }

    #[tokio::test]
    async fn transport_error_leaves_stage_and_appends_one_error_turn() {
        let channel = MockChannel::new(vec![
            question_reply("Scope"),
            Err(DraftError::transport("connection refused")),
            question_reply("Scope"),
        ]);
        let mut store = ConversationStore::new(channel);

        store.submit_user_input("Draft an NDA").await.unwrap();
        let assistants_before = assistant_turns(&store);

        let outcome = store.submit_user_input("an answer").await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Errored);
        assert_eq!(store.stage(), WorkflowStage::QuestionResponse);
        assert_eq!(assistant_turns(&store), assistants_before + 1);

        // The store stays usable for the next call.
        let outcome = store.submit_user_input("trying again").await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Advanced);
    }

    #[tokio::test]
    async fn idea_submission_transport_error_clears_the_aborted_workflow() {
        let channel = MockChannel::new(vec![Err(DraftError::transport("unreachable"))]);
        let mut store = ConversationStore::new(channel);

        let outcome = store.submit_user_input("Draft an NDA").await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Errored);
        assert_eq!(store.stage(), WorkflowStage::IdeaSubmission);
        assert!(store.session_id().is_none());
        // Only the error turn survives the cleared workflow.
        assert_eq!(store.turns().len(), 1);
        assert_eq!(store.turns()[0].role, TurnRole::Assistant);
    }

    #[tokio::test]
    async fn protocol_error_keeps_state_in_draft_chat() {
        let channel = MockChannel::new(vec![
            structure_reply(&["Intro"]),
            question_reply("Intro"),
            Err(DraftError::protocol("unrecognized action \"noop\"")),
        ]);
        let mut store = ConversationStore::new(channel);
        store.submit_user_input("Draft an NDA").await.unwrap();
        store.start_drafting().await.unwrap();

        let outcome = store.submit_user_input("answer").await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Errored);
        assert_eq!(store.stage(), WorkflowStage::Drafting);
        assert!(store.structure().is_some());
        assert!(
            store
                .turns()
                .last()
                .unwrap()
                .content
                .contains("unexpected response")
        );
    }

    #[tokio::test]
    async fn http_detail_is_surfaced_verbatim() {
        let channel = MockChannel::new(vec![
            question_reply("Scope"),
            Err(DraftError::http(503, "Database service not available")),
        ]);
        let mut store = ConversationStore::new(channel);
        store.submit_user_input("Draft an NDA").await.unwrap();
        store.submit_user_input("an answer").await.unwrap();
        assert_eq!(
            store.turns().last().unwrap().content,
            "Database service not available"
        );
    }

    #[tokio::test]
    async fn structure_edits_enforce_the_subsection_floor() {
        let channel = MockChannel::new(vec![structure_reply(&["Intro", "Terms"])]);
        let mut store = ConversationStore::new(channel);
        store.submit_user_input("Draft an NDA").await.unwrap();

        store
            .add_subsection("Intro", Subsection::new("Recitals", "Background"))
            .unwrap();
        store.remove_subsection("Intro", 0).unwrap();
        // One subsection left; further deletion is rejected.
        let err = store.remove_subsection("Intro", 0).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(
            store.structure().unwrap().section("Intro").unwrap().subsections.len(),
            1
        );
    }

    #[tokio::test]
    async fn renaming_a_section_rekeys_its_draft() {
        let channel = MockChannel::new(vec![structure_reply(&["Intro", "Terms"])]);
        let mut store = ConversationStore::new(channel);
        store.submit_user_input("Draft an NDA").await.unwrap();
        store.set_draft("Intro", "Some text");

        store.rename_section("Intro", "Preamble").unwrap();
        assert_eq!(store.registry().draft("Preamble"), Some("Some text"));
        assert_eq!(store.registry().headings()[0], "Preamble");
        assert!(store.structure().unwrap().section("Intro").is_none());

        let err = store.rename_section("Preamble", "Terms").unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn start_drafting_requires_structure_review() {
        let channel = MockChannel::new(vec![]);
        let mut store = ConversationStore::new(channel);
        let err = store.start_drafting().await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn start_drafting_sends_structuring_payload_with_user_context() {
        let channel = MockChannel::new(vec![
            structure_reply(&["Intro"]),
            question_reply("Intro"),
        ]);
        let mut store = ConversationStore::new(channel.clone()).with_user_context(Some(
            UserContext::new("u1", "Legal", "Counsel", "Berlin"),
        ));
        store.submit_user_input("Draft an NDA").await.unwrap();
        store.start_drafting().await.unwrap();

        let requests = channel.recorded();
        let structuring = requests.last().unwrap().idea_structuring.clone().unwrap();
        assert_eq!(structuring.title, "Mutual NDA");
        assert_eq!(structuring.all_sections.len(), 1);
        assert_eq!(structuring.user_context.unwrap().user_id, "u1");
        assert!(requests.last().unwrap().is_interrupt);
    }
}

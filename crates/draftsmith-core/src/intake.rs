//! Document intake: upload an existing contract (or a free-text brief),
//! collect the fields the agent found missing, and receive a finalized
//! contract.
//!
//! This is the workflow's second entry point, separate from the idea-driven
//! chat: one analysis request, one batch answer submission, one final
//! contract.

use crate::error::{DraftError, Result};
use crate::session::registry::DraftRegistry;
use crate::session::section::ContractSection;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use strum_macros::{Display, EnumString};

/// File extensions accepted for upload. Checked locally; a rejected file
/// never reaches the server.
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["docx", "doc", "pdf", "txt"];

/// An uploaded source document and/or free-text contract description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpload {
    /// Original file name, when a file is attached.
    pub file_name: Option<String>,
    /// Raw file bytes; empty when only text is provided.
    pub bytes: Vec<u8>,
    /// Additional free-text contract information.
    pub additional_info: Option<String>,
}

impl DocumentUpload {
    pub fn from_file(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: Some(file_name.into()),
            bytes,
            additional_info: None,
        }
    }

    pub fn from_text(additional_info: impl Into<String>) -> Self {
        Self {
            file_name: None,
            bytes: Vec::new(),
            additional_info: Some(additional_info.into()),
        }
    }

    pub fn with_additional_info(mut self, info: impl Into<String>) -> Self {
        self.additional_info = Some(info.into());
        self
    }

    /// Local validation: a file must carry an allowed extension, and the
    /// upload must contain a file or non-blank text.
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.file_name {
            let extension = name
                .rsplit_once('.')
                .map(|(_, ext)| ext.to_ascii_lowercase())
                .unwrap_or_default();
            if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
                return Err(DraftError::validation(format!(
                    "file type not supported; allowed types: {}",
                    ALLOWED_EXTENSIONS.join(", ")
                )));
            }
            return Ok(());
        }
        if self
            .additional_info
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .is_empty()
        {
            return Err(DraftError::validation(
                "provide a document file or contract information text",
            ));
        }
        Ok(())
    }
}

/// Urgency of a missing field.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FieldPriority {
    Low,
    #[default]
    Medium,
    High,
}

/// A field the agent could not extract from the uploaded document.
/// Transient: produced by analysis, consumed when answers are submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingField {
    pub field: String,
    pub description: String,
    #[serde(default)]
    pub priority: FieldPriority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Result of the document-analysis request.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentAnalysis {
    pub session_id: String,
    pub message: String,
    #[serde(default)]
    pub missing_data: Vec<MissingField>,
    #[serde(default)]
    pub extracted_info: Option<serde_json::Value>,
    #[serde(default)]
    pub missing_data_count: usize,
}

/// The finalized contract returned once all missing data is in.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FinalContract {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub drafts: HashMap<String, String>,
    #[serde(default)]
    pub sections: Vec<ContractSection>,
}

impl FinalContract {
    /// Converts the final contract into a draft registry, ordered by the
    /// contract's section list; drafts without a matching section are
    /// appended in sorted order.
    pub fn to_registry(&self) -> DraftRegistry {
        let mut registry = DraftRegistry::from_sections(&self.sections);
        registry.overwrite_from(&self.drafts);
        registry
    }
}

/// Reply to a generate-next request when the missing-data list is empty.
#[derive(Debug, Clone)]
pub enum NextQuestion {
    /// Generation finished; the final contract is attached.
    Completed(FinalContract),
    /// The agent still wants an answer for one field.
    Question {
        question: String,
        reason: Option<String>,
        current_field: Option<String>,
        remaining_questions: usize,
    },
}

/// Transport seam for the intake workflow.
#[async_trait]
pub trait IntakeChannel: Send + Sync {
    /// Uploads and analyzes a document, opening an intake session.
    async fn analyze_document(&self, upload: &DocumentUpload) -> Result<DocumentAnalysis>;
    /// Submits all missing-field answers at once; returns the final contract.
    async fn submit_missing_data(
        &self,
        session_id: &str,
        answers: &HashMap<String, String>,
    ) -> Result<FinalContract>;
    /// Asks for the next question; completes generation when nothing is
    /// missing.
    async fn next_question(&self, session_id: &str) -> Result<NextQuestion>;
}

/// Phase of an intake session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakePhase {
    AwaitingAnalysis,
    CollectingAnswers,
    Finalized,
}

/// State machine for one document intake.
pub struct IntakeSession {
    channel: Arc<dyn IntakeChannel>,
    phase: IntakePhase,
    session_id: Option<String>,
    missing: Vec<MissingField>,
    answers: HashMap<String, String>,
    contract: Option<FinalContract>,
}

impl IntakeSession {
    pub fn new(channel: Arc<dyn IntakeChannel>) -> Self {
        Self {
            channel,
            phase: IntakePhase::AwaitingAnalysis,
            session_id: None,
            missing: Vec::new(),
            answers: HashMap::new(),
            contract: None,
        }
    }

    pub fn phase(&self) -> IntakePhase {
        self.phase
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn missing_fields(&self) -> &[MissingField] {
        &self.missing
    }

    /// Fields still without an answer.
    pub fn unanswered(&self) -> Vec<&MissingField> {
        self.missing
            .iter()
            .filter(|f| !self.answers.contains_key(&f.field))
            .collect()
    }

    pub fn final_contract(&self) -> Option<&FinalContract> {
        self.contract.as_ref()
    }

    /// Validates the upload locally, then sends it for analysis.
    pub async fn begin(&mut self, upload: &DocumentUpload) -> Result<DocumentAnalysis> {
        if self.phase != IntakePhase::AwaitingAnalysis {
            return Err(DraftError::validation("intake already started"));
        }
        upload.validate()?;
        let analysis = self.channel.analyze_document(upload).await?;
        self.session_id = Some(analysis.session_id.clone());
        self.missing = analysis.missing_data.clone();
        self.phase = IntakePhase::CollectingAnswers;
        Ok(analysis)
    }

    /// Records one answer. The field must be in the missing list and the
    /// answer must not be blank.
    pub fn record_answer(&mut self, field: &str, answer: &str) -> Result<()> {
        if self.phase != IntakePhase::CollectingAnswers {
            return Err(DraftError::validation("no intake in progress"));
        }
        if !self.missing.iter().any(|f| f.field == field) {
            return Err(DraftError::validation(format!(
                "\"{}\" is not one of the missing fields",
                field
            )));
        }
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(DraftError::validation("answer cannot be blank"));
        }
        self.answers.insert(field.to_string(), answer.to_string());
        Ok(())
    }

    /// Submits every recorded answer at once and stores the final contract.
    pub async fn submit_answers(&mut self) -> Result<&FinalContract> {
        if self.phase != IntakePhase::CollectingAnswers {
            return Err(DraftError::validation("no intake in progress"));
        }
        let session_id = self
            .session_id
            .clone()
            .ok_or_else(|| DraftError::internal("intake session has no id"))?;
        let contract = self
            .channel
            .submit_missing_data(&session_id, &self.answers)
            .await?;
        self.missing.clear();
        self.phase = IntakePhase::Finalized;
        Ok(self.contract.insert(contract))
    }

    /// Finalizes directly when the analysis reported nothing missing.
    pub async fn finalize(&mut self) -> Result<&FinalContract> {
        if self.phase != IntakePhase::CollectingAnswers {
            return Err(DraftError::validation("no intake in progress"));
        }
        if !self.missing.is_empty() {
            return Err(DraftError::validation(
                "missing fields still need answers before finalizing",
            ));
        }
        let session_id = self
            .session_id
            .clone()
            .ok_or_else(|| DraftError::internal("intake session has no id"))?;
        match self.channel.next_question(&session_id).await? {
            NextQuestion::Completed(contract) => {
                self.phase = IntakePhase::Finalized;
                Ok(self.contract.insert(contract))
            }
            NextQuestion::Question {
                question,
                reason,
                current_field,
                ..
            } => {
                // The agent disagrees that nothing is missing; fold the
                // question back into the collection phase.
                self.missing.push(MissingField {
                    field: current_field.unwrap_or_else(|| "additional_information".to_string()),
                    description: question,
                    priority: FieldPriority::Medium,
                    reason,
                });
                Err(DraftError::validation(
                    "the agent still needs more information",
                ))
            }
        }
    }
}

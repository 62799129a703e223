//! Catalog types: persisted contract records, submissions and review-status
//! updates.

use crate::session::section::ContractSection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum_macros::{Display, EnumString};

/// Review workflow status of a catalog record.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContractStatus {
    #[default]
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    Implemented,
    Completed,
    InProgress,
}

/// One saved contract as listed by the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractRecord {
    pub session_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub original_idea: String,
    #[serde(default)]
    pub rephrased_idea: String,
    #[serde(default)]
    pub drafts: HashMap<String, String>,
    #[serde(default)]
    pub status: ContractStatus,
    #[serde(default)]
    pub evaluation_score: Option<f64>,
    #[serde(default)]
    pub reviewer_feedback: Option<String>,
    #[serde(default)]
    pub ai_score: Option<i64>,
    #[serde(default)]
    pub ai_feedback: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Metadata attached to a catalog submission.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionMetadata {
    pub submitted_by: String,
    pub department: String,
    pub sections_count: usize,
}

/// Payload for creating a new catalog record.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogSubmission {
    pub title: String,
    pub idea: String,
    pub drafts: HashMap<String, String>,
    pub status: ContractStatus,
    pub metadata: SubmissionMetadata,
}

/// Payload for persisting a finished contract against its session.
#[derive(Debug, Clone, Serialize)]
pub struct SavedContract {
    pub title: String,
    pub drafts: HashMap<String, String>,
    pub sections: Vec<ContractSection>,
}

/// Review-status update for an existing record.
#[derive(Debug, Clone, Serialize)]
pub struct StatusUpdate {
    pub session_id: String,
    pub status: ContractStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer_feedback: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_round_trips_snake_case() {
        assert_eq!(ContractStatus::UnderReview.to_string(), "under_review");
        assert_eq!(
            ContractStatus::from_str("in_progress").unwrap(),
            ContractStatus::InProgress
        );
        let json = serde_json::to_string(&ContractStatus::Approved).unwrap();
        assert_eq!(json, "\"approved\"");
    }

    #[test]
    fn record_tolerates_sparse_listings() {
        let json = r#"{"session_id":"s1","title":"NDA","status":"submitted"}"#;
        let record: ContractRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.session_id, "s1");
        assert!(record.drafts.is_empty());
        assert!(record.evaluation_score.is_none());
    }
}

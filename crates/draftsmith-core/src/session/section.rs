//! Contract structure proposed by the agent and edited by the user.
//!
//! Field names follow the agent's wire format (`section_heading`,
//! `subsection_definition`, ...) so these types deserialize straight out of
//! structure-review payloads.

use crate::error::{DraftError, Result};
use serde::{Deserialize, Serialize};

/// A structural unit inside a contract section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subsection {
    /// The name of the subsection.
    #[serde(rename = "subsection_heading")]
    pub heading: String,
    /// The definition or purpose of the subsection.
    #[serde(rename = "subsection_definition")]
    pub definition: String,
}

impl Subsection {
    pub fn new(heading: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            definition: definition.into(),
        }
    }
}

/// One section of the proposed contract.
///
/// Invariant: a section always retains at least one subsection. Removal
/// below that floor is rejected as a validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSection {
    /// The section's display heading; also the draft-registry key.
    #[serde(rename = "section_heading")]
    pub heading: String,
    /// What this section is meant to cover.
    #[serde(rename = "section_purpose")]
    pub purpose: String,
    /// Ordered subsections; never empty.
    pub subsections: Vec<Subsection>,
}

impl ContractSection {
    pub fn new(heading: impl Into<String>, purpose: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            purpose: purpose.into(),
            subsections: vec![Subsection::new(
                "Details",
                "Provide the specific details for this section",
            )],
        }
    }

    /// Appends a subsection to the end of the list.
    pub fn add_subsection(&mut self, subsection: Subsection) {
        self.subsections.push(subsection);
    }

    /// Removes the subsection at `index`.
    ///
    /// Rejected when the index is out of range or when the removal would
    /// leave the section without any subsection.
    pub fn remove_subsection(&mut self, index: usize) -> Result<Subsection> {
        if index >= self.subsections.len() {
            return Err(DraftError::validation(format!(
                "no subsection at index {} in section \"{}\"",
                index, self.heading
            )));
        }
        if self.subsections.len() <= 1 {
            return Err(DraftError::validation(format!(
                "section \"{}\" must keep at least one subsection",
                self.heading
            )));
        }
        Ok(self.subsections.remove(index))
    }
}

/// The full contract outline: title, rephrased idea, and ordered sections.
///
/// Replaced wholesale when a structure-review reply arrives. The section
/// list is the single authoritative display order for drafts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractStructure {
    pub title: String,
    pub idea: String,
    pub sections: Vec<ContractSection>,
}

impl ContractStructure {
    pub fn new(
        title: impl Into<String>,
        idea: impl Into<String>,
        sections: Vec<ContractSection>,
    ) -> Self {
        Self {
            title: title.into(),
            idea: idea.into(),
            sections,
        }
    }

    /// Looks up a section by heading.
    pub fn section(&self, heading: &str) -> Option<&ContractSection> {
        self.sections.iter().find(|s| s.heading == heading)
    }

    /// Looks up a section by heading for editing.
    pub fn section_mut(&mut self, heading: &str) -> Option<&mut ContractSection> {
        self.sections.iter_mut().find(|s| s.heading == heading)
    }

    /// Section headings in display order.
    pub fn headings(&self) -> Vec<String> {
        self.sections.iter().map(|s| s.heading.clone()).collect()
    }
}

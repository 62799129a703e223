//! Section draft registry: authoritative text per contract section,
//! independent of the chat transcript.

use crate::session::section::ContractSection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ordered mapping from section heading to current draft text.
///
/// The heading list carries the display order; the map is purely a lookup
/// table and is never relied upon for ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftRegistry {
    order: Vec<String>,
    drafts: HashMap<String, String>,
}

impl DraftRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry with one empty draft per section, in section order.
    pub fn from_sections(sections: &[ContractSection]) -> Self {
        let mut registry = Self::new();
        for section in sections {
            registry.order.push(section.heading.clone());
            registry.drafts.insert(section.heading.clone(), String::new());
        }
        registry
    }

    /// Unconditionally overwrites the draft for `heading`, creating the
    /// entry (appended to the display order) when it does not exist yet.
    pub fn set_draft(&mut self, heading: impl Into<String>, text: impl Into<String>) {
        let heading = heading.into();
        if !self.drafts.contains_key(&heading) {
            self.order.push(heading.clone());
        }
        self.drafts.insert(heading, text.into());
    }

    /// The current draft for `heading`, if any.
    pub fn draft(&self, heading: &str) -> Option<&str> {
        self.drafts.get(heading).map(String::as_str)
    }

    /// Section headings in display order.
    pub fn headings(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Whether every draft is blank after trimming.
    pub fn is_all_blank(&self) -> bool {
        self.order
            .iter()
            .all(|h| self.drafts.get(h).map(|d| d.trim().is_empty()).unwrap_or(true))
    }

    /// `(heading, draft)` pairs in display order, skipping drafts that are
    /// blank after trimming. This is the exporter's input.
    pub fn non_blank_pairs(&self) -> Vec<(String, String)> {
        self.order
            .iter()
            .filter_map(|h| {
                self.drafts
                    .get(h)
                    .filter(|d| !d.trim().is_empty())
                    .map(|d| (h.clone(), d.clone()))
            })
            .collect()
    }

    /// Renames a heading in place, keeping its position in the display
    /// order and its draft text. No-op when `old` is absent.
    pub fn rename_heading(&mut self, old: &str, new: impl Into<String>) {
        let new = new.into();
        if let Some(position) = self.order.iter().position(|h| h == old) {
            self.order[position] = new.clone();
            if let Some(draft) = self.drafts.remove(old) {
                self.drafts.insert(new, draft);
            }
        }
    }

    /// Overwrites the whole registry from a completed draft map.
    ///
    /// Existing display order is kept; headings present only in the map are
    /// appended in sorted order so the result is deterministic.
    pub fn overwrite_from(&mut self, drafts: &HashMap<String, String>) {
        for heading in &self.order {
            if let Some(text) = drafts.get(heading) {
                self.drafts.insert(heading.clone(), text.clone());
            }
        }
        let mut extra: Vec<&String> = drafts
            .keys()
            .filter(|k| !self.drafts.contains_key(*k))
            .collect();
        extra.sort();
        for heading in extra {
            self.order.push(heading.clone());
            self.drafts
                .insert(heading.clone(), drafts[heading].clone());
        }
    }

    /// Assembles the full document as markdown-style text: an optional
    /// `# title` line, then a `## heading` block per section followed by its
    /// draft, blocks separated by blank lines. Sections whose draft is blank
    /// after trimming are skipped.
    pub fn full_document(&self, title: Option<&str>) -> String {
        let mut document = String::new();
        if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
            document.push_str(&format!("# {}\n\n", title.trim()));
        }
        for (heading, draft) in self.non_blank_pairs() {
            document.push_str(&format!("## {}\n{}\n\n", heading, draft));
        }
        document
    }
}

//! Duplicate-submission guard for the contract catalog.
//!
//! Tracks which in-memory draft sets have already been submitted, keyed by
//! `"{title}_{section_count}"`. The key is a best-effort heuristic, not a
//! reliable de-duplication guarantee: two different contracts with the same
//! title and section count collide.

use crate::atomic_json::AtomicJsonFile;
use crate::paths;
use chrono::Utc;
use draftsmith_core::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// One recorded catalog submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedEntry {
    pub session_id: String,
    pub saved_at: String,
}

/// JSON-backed guard against re-submitting the same draft set.
pub struct CatalogGuard {
    file: AtomicJsonFile<HashMap<String, SavedEntry>>,
}

impl CatalogGuard {
    /// Guard at the default location
    /// (`~/.config/draftsmith/saved_drafts.json`).
    pub fn new_default() -> Result<Self> {
        Ok(Self::at(paths::saved_drafts_path()?))
    }

    /// Guard at an explicit path (used by tests).
    pub fn at(path: PathBuf) -> Self {
        Self {
            file: AtomicJsonFile::new(path),
        }
    }

    fn entry_key(title: &str, section_count: usize) -> String {
        format!("{}_{}", title, section_count)
    }

    fn entries(&self) -> Result<HashMap<String, SavedEntry>> {
        Ok(self.file.load()?.unwrap_or_default())
    }

    /// Whether this title + section-count pair was already submitted.
    pub fn is_saved(&self, title: &str, section_count: usize) -> Result<bool> {
        Ok(self
            .entries()?
            .contains_key(&Self::entry_key(title, section_count)))
    }

    /// Records a submission under the heuristic key.
    pub fn mark_saved(
        &self,
        title: &str,
        section_count: usize,
        session_id: impl Into<String>,
    ) -> Result<()> {
        let mut entries = self.entries()?;
        entries.insert(
            Self::entry_key(title, section_count),
            SavedEntry {
                session_id: session_id.into(),
                saved_at: Utc::now().to_rfc3339(),
            },
        );
        self.file.save(&entries)
    }

    /// Forgets a recorded submission (e.g. after the user starts over).
    pub fn forget(&self, title: &str, section_count: usize) -> Result<()> {
        let mut entries = self.entries()?;
        if entries
            .remove(&Self::entry_key(title, section_count))
            .is_some()
        {
            self.file.save(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_by_title_and_section_count() {
        let dir = tempfile::tempdir().unwrap();
        let guard = CatalogGuard::at(dir.path().join("saved_drafts.json"));

        assert!(!guard.is_saved("NDA", 3).unwrap());
        guard.mark_saved("NDA", 3, "s1").unwrap();
        assert!(guard.is_saved("NDA", 3).unwrap());
        // Same title, different section count: a different key.
        assert!(!guard.is_saved("NDA", 4).unwrap());

        guard.forget("NDA", 3).unwrap();
        assert!(!guard.is_saved("NDA", 3).unwrap());
    }
}

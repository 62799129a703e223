//! Persisted user context: restores the login session across restarts.

use crate::atomic_json::AtomicJsonFile;
use crate::paths;
use draftsmith_core::error::Result;
use draftsmith_core::user_context::UserContext;
use std::path::PathBuf;
use tracing::info;

/// JSON-backed storage for the logged-in [`UserContext`].
pub struct ProfileStorage {
    file: AtomicJsonFile<UserContext>,
}

impl ProfileStorage {
    /// Storage at the default location (`~/.config/draftsmith/profile.json`).
    pub fn new_default() -> Result<Self> {
        Ok(Self::at(paths::profile_path()?))
    }

    /// Storage at an explicit path (used by tests).
    pub fn at(path: PathBuf) -> Self {
        Self {
            file: AtomicJsonFile::new(path),
        }
    }

    /// The saved context from a previous session, if any.
    pub fn load(&self) -> Result<Option<UserContext>> {
        self.file.load()
    }

    /// Saves the context of a fresh login.
    pub fn save(&self, context: &UserContext) -> Result<()> {
        self.file.save(context)?;
        info!(user_id = %context.user_id, "profile saved");
        Ok(())
    }

    /// Clears the saved context on logout.
    pub fn clear(&self) -> Result<()> {
        self.file.remove()
    }
}

//! Unified path management for draftsmith configuration files.
//!
//! All persisted client-side state lives under one config directory:
//!
//! ```text
//! ~/.config/draftsmith/
//! ├── config.toml        # agent endpoint configuration
//! ├── profile.json       # logged-in user context
//! └── saved_drafts.json  # catalog duplicate-submission guard
//! ```

use draftsmith_core::error::{DraftError, Result};
use std::path::PathBuf;

/// Returns the draftsmith configuration directory: `~/.config/draftsmith`.
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DraftError::internal("could not determine home directory"))?;
    Ok(home.join(".config").join("draftsmith"))
}

/// Path of the persisted user context.
pub fn profile_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("profile.json"))
}

/// Path of the catalog duplicate-submission guard.
pub fn saved_drafts_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("saved_drafts.json"))
}

/// Path of the client configuration file.
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

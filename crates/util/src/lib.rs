//! Local persistence and small shared helpers for Reelgen.

use std::path::PathBuf;

use dirs_next::home_dir;

pub mod draft_store;
pub mod handoff;

pub use draft_store::{DraftStore, DraftStoreError, InMemoryDraftStore, JsonDraftStore};
pub use handoff::ClipPromptHandoff;

/// Expand a leading `~` or `~/` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    let trimmed = path.trim();

    if trimmed == "~" {
        return home_dir().unwrap_or_else(|| PathBuf::from("~"));
    }

    if let Some(rest) = trimmed.strip_prefix("~/").or_else(|| trimmed.strip_prefix("~\\")) {
        return home_dir().unwrap_or_else(|| PathBuf::from("~")).join(rest);
    }

    PathBuf::from(trimmed)
}

//! Crash-safe draft persistence for the generation wizard.
//!
//! This module exposes a [`DraftStore`] abstraction with a JSON-file-backed
//! implementation (tilde expansion, config directory fallback, env override)
//! and an in-memory implementation for tests and ephemeral fallback.
//!
//! Persistence is best effort by contract: callers treat store failures as
//! non-fatal. The store itself still reports typed errors so the controller
//! can log them before swallowing.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use dirs_next::config_dir;
use reelgen_types::{DRAFT_SCHEMA_VERSION, Draft};
use thiserror::Error;
use tracing::warn;

use crate::expand_tilde;

/// Environment variable controlling the draft file location.
pub const DRAFT_PATH_ENV: &str = "REELGEN_DRAFT_PATH";

/// Default filename for the persisted draft.
pub const DRAFT_FILE_NAME: &str = "draft.json";

/// Errors surfaced by draft store operations.
#[derive(Debug, Error)]
pub enum DraftStoreError {
    /// I/O failure while reading or writing the draft file.
    #[error("draft I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization or deserialization failure.
    #[error("draft serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Shared trait implemented by draft persistence backends.
pub trait DraftStore: Send + Sync {
    /// Persist the snapshot, replacing any previous draft.
    fn save(&self, draft: &Draft) -> Result<(), DraftStoreError>;

    /// Load the stored draft. Drafts with a stale `schema_version` and
    /// unparseable payloads load as `None`, never as an error.
    fn load(&self) -> Result<Option<Draft>, DraftStoreError>;

    /// Remove the stored draft, if any.
    fn clear(&self) -> Result<(), DraftStoreError>;
}

/// JSON-backed draft store persisted on disk.
pub struct JsonDraftStore {
    path: PathBuf,
    cached: Mutex<Option<Draft>>,
}

impl JsonDraftStore {
    /// Create a store at the provided path (or the default path when omitted).
    pub fn new<P: Into<Option<PathBuf>>>(path: P) -> Result<Self, DraftStoreError> {
        let resolved_path = match path.into() {
            Some(path) => path,
            None => default_draft_path(),
        };

        let cached = load_draft_file(&resolved_path)?;
        Ok(Self {
            path: resolved_path,
            cached: Mutex::new(cached),
        })
    }

    /// Initialize a store at the default location.
    pub fn with_defaults() -> Result<Self, DraftStoreError> {
        Self::new(None::<PathBuf>)
    }

    /// Path of the underlying JSON file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_locked(&self, draft: &Draft) -> Result<(), DraftStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(draft)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl DraftStore for JsonDraftStore {
    fn save(&self, draft: &Draft) -> Result<(), DraftStoreError> {
        let mut cached = self.cached.lock().expect("draft lock poisoned");
        self.write_locked(draft)?;
        *cached = Some(draft.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<Draft>, DraftStoreError> {
        let cached = self.cached.lock().expect("draft lock poisoned");
        Ok(cached.clone())
    }

    fn clear(&self) -> Result<(), DraftStoreError> {
        let mut cached = self.cached.lock().expect("draft lock poisoned");
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => return Err(DraftStoreError::Io(error)),
        }
        *cached = None;
        Ok(())
    }
}

/// In-memory draft store used in tests and as an ephemeral fallback when the
/// config directory cannot be accessed.
#[derive(Default)]
pub struct InMemoryDraftStore {
    cached: Mutex<Option<Draft>>,
}

impl InMemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DraftStore for InMemoryDraftStore {
    fn save(&self, draft: &Draft) -> Result<(), DraftStoreError> {
        let mut cached = self.cached.lock().expect("draft lock poisoned");
        *cached = Some(draft.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<Draft>, DraftStoreError> {
        let cached = self.cached.lock().expect("draft lock poisoned");
        Ok(cached.clone())
    }

    fn clear(&self) -> Result<(), DraftStoreError> {
        let mut cached = self.cached.lock().expect("draft lock poisoned");
        *cached = None;
        Ok(())
    }
}

fn default_draft_path() -> PathBuf {
    if let Ok(path) = env::var(DRAFT_PATH_ENV)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reelgen")
        .join(DRAFT_FILE_NAME)
}

fn load_draft_file(path: &Path) -> Result<Option<Draft>, DraftStoreError> {
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<Draft>(&content) {
            Ok(draft) if draft.schema_version == DRAFT_SCHEMA_VERSION => Ok(Some(draft)),
            Ok(draft) => {
                warn!(
                    path = %path.display(),
                    stored_version = draft.schema_version,
                    current_version = DRAFT_SCHEMA_VERSION,
                    "Discarding draft with stale schema version"
                );
                Ok(None)
            }
            Err(error) => {
                warn!(path = %path.display(), error = %error, "Failed to parse draft file; ignoring it");
                Ok(None)
            }
        },
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(DraftStoreError::Io(error)),
    }
}

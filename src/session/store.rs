//! `SessionStore` — serializes/deserializes `WorkflowState` to a single
//! `state.json` per session, using an atomic temp-file-then-rename
//! write pattern.

use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{OrchestratorError, Result};
use crate::model::WorkflowState;

const STATE_FILE: &str = "state.json";

/// Single-writer persistence for `WorkflowState`. The store itself does
/// not serialize concurrent access to a session — the orchestrator is
/// responsible for driving one command per session at a time. An
/// advisory lock is available for callers that want to catch
/// accidental concurrent drivers; it is off by default.
pub struct SessionStore {
    root: PathBuf,
    locking: bool,
}

impl SessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locking: false,
        }
    }

    /// Enable advisory exclusive locking of `state.json` around `save`
    /// and `load`. Catches accidental concurrent drivers of the same
    /// session; does not serialize anything across processes beyond
    /// that best-effort check.
    pub fn with_locking(mut self, locking: bool) -> Self {
        self.locking = locking;
        self
    }

    pub fn session_dir(&self, session_id: &str) -> PathBuf {
        self.root.join(session_id)
    }

    pub fn exists(&self, session_id: &str) -> bool {
        self.session_dir(session_id).join(STATE_FILE).is_file()
    }

    pub fn list(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(&self.root).map_err(|source| OrchestratorError::Storage {
            path: self.root.clone(),
            source,
        })?;

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| OrchestratorError::Storage {
                path: self.root.clone(),
                source,
            })?;
            if entry.path().join(STATE_FILE).is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    ids.push(name.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Atomic write (temp file + rename) so a crash mid-write never
    /// corrupts the previous snapshot.
    pub fn save(&self, state: &WorkflowState) -> Result<()> {
        let dir = self.session_dir(&state.session_id);
        std::fs::create_dir_all(&dir).map_err(|source| OrchestratorError::Storage {
            path: dir.clone(),
            source,
        })?;

        let state_path = dir.join(STATE_FILE);
        let temp_path = dir.join(format!(".{STATE_FILE}.tmp"));

        let json = serde_json::to_string_pretty(state).map_err(|e| {
            OrchestratorError::Storage {
                path: state_path.clone(),
                source: std::io::Error::other(e),
            }
        })?;

        let lock_file = if self.locking {
            Some(self.acquire_lock(&state_path)?)
        } else {
            None
        };

        std::fs::write(&temp_path, &json).map_err(|source| OrchestratorError::Storage {
            path: temp_path.clone(),
            source,
        })?;
        std::fs::rename(&temp_path, &state_path).map_err(|source| OrchestratorError::Storage {
            path: state_path.clone(),
            source,
        })?;

        drop(lock_file);
        Ok(())
    }

    /// Loads and validates `state.json`, rejecting unknown fields —
    /// schema drift is an error, not a warning.
    pub fn load(&self, session_id: &str) -> Result<WorkflowState> {
        let state_path = self.session_dir(session_id).join(STATE_FILE);
        if !state_path.is_file() {
            return Err(OrchestratorError::SessionNotFound(session_id.to_string()));
        }

        let _lock_file = if self.locking {
            Some(self.acquire_lock(&state_path)?)
        } else {
            None
        };

        let json = std::fs::read_to_string(&state_path).map_err(|source| OrchestratorError::Storage {
            path: state_path.clone(),
            source,
        })?;

        serde_json::from_str(&json).map_err(|e| OrchestratorError::Storage {
            path: state_path,
            source: std::io::Error::other(e),
        })
    }

    fn acquire_lock(&self, state_path: &Path) -> Result<std::fs::File> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(state_path)
            .map_err(|source| OrchestratorError::Storage {
                path: state_path.to_path_buf(),
                source,
            })?;
        file.try_lock_exclusive().map_err(|source| OrchestratorError::Storage {
            path: state_path.to_path_buf(),
            source,
        })?;
        Ok(file)
    }
}

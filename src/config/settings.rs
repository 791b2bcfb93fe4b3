//! Loading the workflow config document from disk with environment
//! overrides: config file > env vars > built-in defaults; CLI flags,
//! where a front-end supplies them, sit above all of these.

use std::path::{Path, PathBuf};

use crate::error::{OrchestratorError, Result};

use super::schema::WorkflowConfigDocument;

impl WorkflowConfigDocument {
    /// Parse a YAML or JSON workflow config document from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| OrchestratorError::Storage {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content, path)
    }

    fn from_str(content: &str, path: &Path) -> Result<Self> {
        let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
        if is_json {
            serde_json::from_str(content)
                .map_err(|e| OrchestratorError::Configuration(format!("invalid config JSON at {path:?}: {e}")))
        } else {
            serde_yaml::from_str(content)
                .map_err(|e| OrchestratorError::Configuration(format!("invalid config YAML at {path:?}: {e}")))
        }
    }

    /// Load from `path` if given and present, otherwise built-in
    /// defaults (a single `manual` approver everywhere, no AI provider
    /// configured — the safest, fully-paused default).
    pub fn load_or_default(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(p) if p.exists() => Self::from_file(p),
            _ => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides to the `defaults` layer.
    ///
    /// Supported variables:
    /// - `WORKFLOW_FORGE_AI_PROVIDER`: default `ai_provider` key.
    /// - `WORKFLOW_FORGE_APPROVAL_PROVIDER`: default `approval_provider` key.
    /// - `WORKFLOW_FORGE_APPROVAL_MAX_RETRIES`: default `approval_max_retries`.
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("WORKFLOW_FORGE_AI_PROVIDER") {
            if !val.is_empty() {
                self.defaults.ai_provider = Some(val);
            }
        }
        if let Ok(val) = std::env::var("WORKFLOW_FORGE_APPROVAL_PROVIDER") {
            if !val.is_empty() {
                self.defaults.approval_provider = Some(val);
            }
        }
        if let Ok(val) = std::env::var("WORKFLOW_FORGE_APPROVAL_MAX_RETRIES") {
            if let Ok(n) = val.parse::<u32>() {
                self.defaults.approval_max_retries = Some(n);
            }
        }
        self
    }

    /// Load configuration with environment variable overrides applied.
    ///
    /// Priority: config file > env vars > defaults (CLI flags, where a
    /// front-end supplies them, are applied by the caller afterward).
    pub fn load_with_env(path: Option<&PathBuf>) -> Result<Self> {
        Self::load_or_default(path).map(|c| c.apply_env_overrides())
    }
}

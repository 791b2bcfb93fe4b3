//! Provider abstractions (component C4): AI providers that generate
//! content, approval providers that evaluate it, and the factory that
//! resolves either from a process-wide registry.

mod adapter;
mod builtin;
mod registry;

pub use adapter::AIApprovalProvider;
pub use builtin::{ManualApprovalProvider, SkipApprovalProvider, BUILTIN_MANUAL, BUILTIN_SKIP};
pub use registry::ProviderRegistry;

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::model::{ApprovalResult, Phase, Stage};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider '{provider}' unavailable: {message}")]
    Unavailable { provider: String, message: String },
    #[error("provider '{provider}' call failed: {message}")]
    CallFailed { provider: String, message: String },
    #[error("provider '{provider}' timed out after {timeout_secs}s")]
    Timeout { provider: String, timeout_secs: u64 },
    #[error("unknown provider key: {0}")]
    UnknownKey(String),
}

/// Where a provider's outputs land relative to its `generate`/`evaluate`
/// call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsAbility {
    /// Cannot read or write files; the engine must inline content.
    None,
    /// Can read files the engine points it at, but not write.
    Read,
    /// Has full local filesystem access (e.g. a human, or a CLI-driving
    /// provider that writes files itself).
    LocalWrite,
}

#[derive(Debug, Clone)]
pub struct ProviderMetadata {
    pub key: String,
    pub fs_ability: FsAbility,
    pub default_timeout_secs: u64,
    pub config_keys: Vec<String>,
}

/// Result of a successful `AiProvider::generate` call.
#[derive(Debug, Clone, Default)]
pub struct AiProviderResult {
    /// The textual response to write to the canonical response file, if
    /// the provider produced one as a string.
    pub response: Option<String>,
    /// Relative path -> content. `None` content means the provider
    /// wrote the file itself; the engine only verifies it exists.
    pub files: HashMap<String, Option<String>>,
}

/// A plugin that generates content for a RESPONSE stage.
#[async_trait]
pub trait AiProvider: Send + Sync {
    fn metadata(&self) -> ProviderMetadata;

    /// Raises a `ProviderError` if the provider cannot currently be
    /// used (missing credentials, missing CLI, etc.).
    async fn validate(&self) -> Result<(), ProviderError>;

    /// `Ok(None)` means manual mode: the human is expected to write the
    /// response file themselves.
    async fn generate(
        &self,
        prompt: &str,
        context: &HashMap<String, Value>,
    ) -> Result<Option<AiProviderResult>, ProviderError>;
}

/// A plugin that evaluates the files belonging to a gate and returns a
/// decision.
#[async_trait]
pub trait ApprovalProvider: Send + Sync {
    fn metadata(&self) -> ProviderMetadata;

    /// `files` values are file contents when `fs_ability == None`,
    /// otherwise `None` (the provider reads paths itself).
    ///
    /// `approver_config` is the opaque mapping from the resolved
    /// `StageConfig`; `allow_rewrite` mirrors the same config's
    /// `approval_allow_rewrite` flag, passed explicitly so an AI
    /// approver knows whether to parse a `suggested_content` block out
    /// of its own response.
    #[allow(clippy::too_many_arguments)]
    async fn evaluate(
        &self,
        phase: Phase,
        stage: Stage,
        files: &HashMap<String, Option<String>>,
        context: &HashMap<String, Value>,
        approver_config: &HashMap<String, Value>,
        allow_rewrite: bool,
    ) -> Result<ApprovalResult, ProviderError>;
}

/// `create_ai_provider`/`create_approval_provider`.
pub fn create_ai_provider(
    registry: &ProviderRegistry,
    key: &str,
) -> Result<std::sync::Arc<dyn AiProvider>, ProviderError> {
    registry
        .ai(key)
        .ok_or_else(|| ProviderError::UnknownKey(key.to_string()))
}

/// Resolves an approval provider. Looks in the approval registry first;
/// if absent, looks in the AI registry and wraps the match via
/// `AIApprovalProvider`.
pub fn create_approval_provider(
    registry: &ProviderRegistry,
    key: &str,
) -> Result<std::sync::Arc<dyn ApprovalProvider>, ProviderError> {
    if let Some(approver) = registry.approval(key) {
        return Ok(approver);
    }
    if let Some(ai) = registry.ai(key) {
        return Ok(std::sync::Arc::new(AIApprovalProvider::new(ai)));
    }
    Err(ProviderError::UnknownKey(key.to_string()))
}

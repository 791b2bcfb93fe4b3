//! Raw, on-disk shape of the workflow configuration document and the
//! resolved `StageConfig` it cascades into.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A layer of `StageConfig` overrides: every field is optional, and
/// only explicitly-set fields participate in the cascade — each later
/// layer overrides only fields it sets explicitly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageConfigOverlay {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_max_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_allow_rewrite: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approver_config: Option<HashMap<String, Value>>,
    /// Whether to hash prompt files into `state.prompt_hashes` on
    /// approval of any PROMPT stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_prompts: Option<bool>,
}

impl StageConfigOverlay {
    /// Merge `other` on top of `self`: any field `other` sets
    /// explicitly wins, everything else is preserved. Used to layer
    /// defaults < phase < stage.
    pub fn merged_over(&self, other: &StageConfigOverlay) -> StageConfigOverlay {
        StageConfigOverlay {
            ai_provider: other.ai_provider.clone().or_else(|| self.ai_provider.clone()),
            approval_provider: other
                .approval_provider
                .clone()
                .or_else(|| self.approval_provider.clone()),
            approval_max_retries: other.approval_max_retries.or(self.approval_max_retries),
            approval_allow_rewrite: other.approval_allow_rewrite.or(self.approval_allow_rewrite),
            approver_config: other.approver_config.clone().or_else(|| self.approver_config.clone()),
            hash_prompts: other.hash_prompts.or(self.hash_prompts),
        }
    }
}

/// One phase's prompt/response overlay pair in the on-disk document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhaseConfigOverlay {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<StageConfigOverlay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<StageConfigOverlay>,
}

/// The `workflow:` document root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowConfigDocument {
    #[serde(default)]
    pub defaults: StageConfigOverlay,
    #[serde(default)]
    pub plan: PhaseConfigOverlay,
    #[serde(default)]
    pub generate: PhaseConfigOverlay,
    #[serde(default)]
    pub review: PhaseConfigOverlay,
    #[serde(default)]
    pub revise: PhaseConfigOverlay,
}

/// A fully resolved `StageConfig`, after cascading defaults -> phase ->
/// stage and applying the documented defaults for any field still
/// unset.
#[derive(Debug, Clone)]
pub struct StageConfig {
    pub ai_provider: Option<String>,
    pub approval_provider: String,
    pub approval_max_retries: u32,
    pub approval_allow_rewrite: bool,
    pub approver_config: HashMap<String, Value>,
    pub hash_prompts: bool,
}

impl From<StageConfigOverlay> for StageConfig {
    fn from(overlay: StageConfigOverlay) -> Self {
        Self {
            ai_provider: overlay.ai_provider,
            approval_provider: overlay.approval_provider.unwrap_or_else(|| "manual".to_string()),
            approval_max_retries: overlay.approval_max_retries.unwrap_or(0),
            approval_allow_rewrite: overlay.approval_allow_rewrite.unwrap_or(false),
            approver_config: overlay.approver_config.unwrap_or_default(),
            hash_prompts: overlay.hash_prompts.unwrap_or(false),
        }
    }
}

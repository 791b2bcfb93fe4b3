//! Built-in approval providers: `skip` (always APPROVED) and `manual`
//! (always PENDING).

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use super::{ApprovalProvider, FsAbility, ProviderError, ProviderMetadata};
use crate::model::{ApprovalResult, Phase, Stage};

pub const BUILTIN_SKIP: &str = "skip";
pub const BUILTIN_MANUAL: &str = "manual";

pub struct SkipApprovalProvider;

#[async_trait]
impl ApprovalProvider for SkipApprovalProvider {
    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            key: BUILTIN_SKIP.to_string(),
            fs_ability: FsAbility::None,
            default_timeout_secs: 0,
            config_keys: Vec::new(),
        }
    }

    async fn evaluate(
        &self,
        _phase: Phase,
        _stage: Stage,
        _files: &HashMap<String, Option<String>>,
        _context: &HashMap<String, Value>,
        _approver_config: &HashMap<String, Value>,
        _allow_rewrite: bool,
    ) -> Result<ApprovalResult, ProviderError> {
        Ok(ApprovalResult::approved())
    }
}

/// Always yields control to a human driving the CLI. Declares
/// `fs_ability = local-write` since a human has full filesystem access.
pub struct ManualApprovalProvider;

#[async_trait]
impl ApprovalProvider for ManualApprovalProvider {
    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            key: BUILTIN_MANUAL.to_string(),
            fs_ability: FsAbility::LocalWrite,
            default_timeout_secs: 0,
            config_keys: Vec::new(),
        }
    }

    async fn evaluate(
        &self,
        _phase: Phase,
        _stage: Stage,
        _files: &HashMap<String, Option<String>>,
        _context: &HashMap<String, Value>,
        _approver_config: &HashMap<String, Value>,
        _allow_rewrite: bool,
    ) -> Result<ApprovalResult, ProviderError> {
        Ok(ApprovalResult::pending(None))
    }
}

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::phase::Phase;

/// Metadata for one on-disk file. Content is never
/// stored in state — only the path, which iteration it belongs to, and
/// a deferred hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artifact {
    /// Relative to the session directory.
    pub path: String,
    pub phase: Phase,
    pub iteration: u32,
    /// Empty until approved (Invariant 7 / P4): either `""` or a valid
    /// 64-character lowercase hex SHA-256 digest.
    #[serde(default)]
    pub sha256: String,
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    pub fn new(path: impl Into<String>, phase: Phase, iteration: u32) -> Self {
        Self {
            path: path.into(),
            phase,
            iteration,
            sha256: String::new(),
            created_at: Utc::now(),
        }
    }

    pub fn is_hashed(&self) -> bool {
        !self.sha256.is_empty()
    }

    /// Invariant P4: if a hash is present, it must look like SHA-256 hex.
    pub fn has_valid_hash_shape(&self) -> bool {
        self.sha256.is_empty()
            || (self.sha256.len() == 64 && self.sha256.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()))
    }
}

/// Canonical, locked-contract filenames. Centralized here so
/// no call site can typo the on-disk contract.
pub mod filenames {
    pub const PLANNING_PROMPT: &str = "planning-prompt.md";
    pub const PLANNING_RESPONSE: &str = "planning-response.md";
    pub const GENERATION_PROMPT: &str = "generation-prompt.md";
    pub const GENERATION_RESPONSE: &str = "generation-response.md";
    pub const REVIEW_PROMPT: &str = "review-prompt.md";
    pub const REVIEW_RESPONSE: &str = "review-response.md";
    pub const REVISION_PROMPT: &str = "revision-prompt.md";
    pub const REVISION_RESPONSE: &str = "revision-response.md";

    pub const STANDARDS_BUNDLE: &str = "standards-bundle.md";
    pub const PLAN_MD: &str = "plan.md";
    pub const STATE_JSON: &str = "state.json";
    pub const CODE_DIR: &str = "code";
}

/// Returns the iteration-relative directory name, e.g. `iteration-3`.
pub fn iteration_dir(iteration: u32) -> String {
    format!("iteration-{iteration}")
}

/// Build the path (relative to the session dir) for a given phase/stage
/// artifact at a given iteration.
pub fn canonical_relative_path(phase: Phase, stage: super::stage::Stage, iteration: u32) -> PathBuf {
    use super::stage::Stage;
    let file = match (phase, stage) {
        (Phase::Plan, Stage::Prompt) => filenames::PLANNING_PROMPT,
        (Phase::Plan, Stage::Response) => filenames::PLANNING_RESPONSE,
        (Phase::Generate, Stage::Prompt) => filenames::GENERATION_PROMPT,
        (Phase::Generate, Stage::Response) => filenames::GENERATION_RESPONSE,
        (Phase::Review, Stage::Prompt) => filenames::REVIEW_PROMPT,
        (Phase::Review, Stage::Response) => filenames::REVIEW_RESPONSE,
        (Phase::Revise, Stage::Prompt) => filenames::REVISION_PROMPT,
        (Phase::Revise, Stage::Response) => filenames::REVISION_RESPONSE,
        _ => unreachable!("canonical_relative_path called for a non-active phase"),
    };
    PathBuf::from(iteration_dir(iteration)).join(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::stage::Stage;

    #[test]
    fn hash_shape_validation() {
        let mut a = Artifact::new("planning-prompt.md", Phase::Plan, 1);
        assert!(a.has_valid_hash_shape());
        a.sha256 = "f".repeat(64);
        assert!(a.has_valid_hash_shape());
        a.sha256 = "F".repeat(64);
        assert!(!a.has_valid_hash_shape());
        a.sha256 = "abc".to_string();
        assert!(!a.has_valid_hash_shape());
    }

    #[test]
    fn canonical_paths_match_locked_contract() {
        assert_eq!(
            canonical_relative_path(Phase::Plan, Stage::Prompt, 1),
            PathBuf::from("iteration-1/planning-prompt.md")
        );
        assert_eq!(
            canonical_relative_path(Phase::Revise, Stage::Response, 2),
            PathBuf::from("iteration-2/revision-response.md")
        );
    }
}

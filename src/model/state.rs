use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::artifact::Artifact;
use super::phase::Phase;
use super::stage::Stage;
use super::status::Status;

/// The authoritative persisted record for one session. Serialized
/// verbatim to `state.json` by `session::store::SessionStore`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowState {
    pub session_id: String,
    /// Key into the profile registry, e.g. `"jpa-mt"`.
    pub profile: String,
    pub phase: Phase,
    /// Absent when `phase` is not active.
    pub stage: Option<Stage>,
    pub status: Status,
    /// 1-based; increments exactly once per FAIL outcome, at
    /// `REVIEW[RESPONSE] -> REVISE[PROMPT]` (Invariant 2).
    pub current_iteration: u32,
    /// Profile-specific parameters. Engine stores and forwards; only
    /// interprets enough to validate against the profile's
    /// `context_schema` at init.
    #[serde(default)]
    pub context: HashMap<String, Value>,
    /// Resolved at init: snapshot of which AI provider serves each
    /// phase's RESPONSE stage for this session.
    #[serde(default)]
    pub ai_providers: HashMap<String, String>,
    #[serde(default)]
    pub standards_provider: String,
    /// Hex SHA-256 over the standards bundle. Set once, at init
    /// (Invariant 4).
    #[serde(default)]
    pub standards_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_hash: Option<String>,
    /// Hex SHA-256 of prompt files, keyed by relative path. Populated
    /// only when the resolved `StageConfig.hash_prompts` flag is set.
    #[serde(default)]
    pub prompt_hashes: HashMap<String, String>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    #[serde(default)]
    pub pending_approval: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_content: Option<String>,
    /// Consecutive auto-retries within the current stage. Reset to 0 on
    /// every stage change (Invariant 6 / P5).
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Set alongside `last_error` when the failure originated in the
    /// approval gate's own `evaluate` call, rather than in `CALL_AI`'s
    /// provider call. Lets `approve` re-run the right recovery path
    /// instead of always re-entering the gate.
    #[serde(default)]
    pub last_error_in_gate: bool,
    /// Per-command transient user-facing messages; cleared at the start
    /// of each command.
    #[serde(default)]
    pub messages: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowState {
    pub fn new(session_id: String, profile: String) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            profile,
            phase: Phase::Init,
            stage: None,
            status: Status::InProgress,
            current_iteration: 1,
            context: HashMap::new(),
            ai_providers: HashMap::new(),
            standards_provider: String::new(),
            standards_hash: String::new(),
            plan_hash: None,
            review_hash: None,
            prompt_hashes: HashMap::new(),
            artifacts: Vec::new(),
            pending_approval: false,
            approval_feedback: None,
            suggested_content: None,
            retry_count: 0,
            last_error: None,
            last_error_in_gate: false,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Invariant P1: `stage = None` iff `phase` is not active.
    pub fn check_stage_invariant(&self) -> bool {
        self.stage.is_some() == self.phase.is_active()
    }

    /// Clear per-command transient fields. Called at the start of every
    /// command handler.
    pub fn begin_command(&mut self) {
        self.messages.clear();
    }

    pub fn push_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Move to a new `(phase, stage)` pair, resetting `retry_count` to 0
    /// as required whenever the stage changes (Invariant 6 / P5).
    pub fn transition_to(&mut self, phase: Phase, stage: Option<Stage>) {
        self.phase = phase;
        self.stage = stage;
        self.retry_count = 0;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn record_artifact(&mut self, artifact: Artifact) {
        self.artifacts.push(artifact);
        self.touch();
    }

    /// Mutable access to the most recently recorded artifact at the
    /// given relative path, for setting its hash at approval time.
    pub fn artifact_mut(&mut self, path: &str) -> Option<&mut Artifact> {
        self.artifacts.iter_mut().rev().find(|a| a.path == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_satisfies_stage_invariant() {
        let s = WorkflowState::new("sess-1".into(), "test-profile".into());
        assert_eq!(s.phase, Phase::Init);
        assert!(s.stage.is_none());
        assert!(s.check_stage_invariant());
    }

    #[test]
    fn transition_resets_retry_count() {
        let mut s = WorkflowState::new("sess-1".into(), "test-profile".into());
        s.retry_count = 3;
        s.transition_to(Phase::Plan, Some(Stage::Prompt));
        assert_eq!(s.retry_count, 0);
        assert!(s.check_stage_invariant());
    }

    #[test]
    fn begin_command_clears_messages_only() {
        let mut s = WorkflowState::new("sess-1".into(), "test-profile".into());
        s.push_message("hello");
        s.last_error = Some("boom".into());
        s.begin_command();
        assert!(s.messages.is_empty());
        // last_error is cleared explicitly by command handlers, not begin_command
        assert_eq!(s.last_error.as_deref(), Some("boom"));
    }
}

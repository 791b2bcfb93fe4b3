use serde::{Deserialize, Serialize};

/// Overall session status.
///
/// `InProgress` covers both "actively executing an action right now"
/// and "paused, awaiting a human `approve`/`reject`" — the orchestrator
/// distinguishes those via `WorkflowState::pending_approval`, not via a
/// separate status value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    InProgress,
    Success,
    Failed,
    Error,
    Cancelled,
}

use serde::{Deserialize, Serialize};

/// Major stage of the workflow.
///
/// `Init` plus the three terminal-or-pre-terminal variants
/// (`Complete`, `Error`, `Cancelled`) have no `Stage` — the
/// phase/stage pairing is enforced by `WorkflowState::transition_to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Init,
    Plan,
    Generate,
    Review,
    Revise,
    Complete,
    Error,
    Cancelled,
}

impl Phase {
    /// Whether this phase is one of the four active phases that always
    /// carry a `Stage`.
    pub fn is_active(self) -> bool {
        matches!(self, Phase::Plan | Phase::Generate | Phase::Review | Phase::Revise)
    }

    /// Whether this phase is terminal (no further commands except `status`
    /// make sense, though the transition table is the real authority).
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Complete | Phase::Error | Phase::Cancelled)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Init => "init",
            Phase::Plan => "plan",
            Phase::Generate => "generate",
            Phase::Review => "review",
            Phase::Revise => "revise",
            Phase::Complete => "complete",
            Phase::Error => "error",
            Phase::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

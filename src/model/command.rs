use serde::{Deserialize, Serialize};

/// Inputs to the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    Init,
    Approve,
    Reject,
    Retry,
    Cancel,
    Status,
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Command::Init => "init",
            Command::Approve => "approve",
            Command::Reject => "reject",
            Command::Retry => "retry",
            Command::Cancel => "cancel",
            Command::Status => "status",
        };
        f.write_str(s)
    }
}

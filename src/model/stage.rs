use serde::{Deserialize, Serialize};

/// Within an active `Phase`, which half of the iteration we're in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// The prompt for this phase has been created and is awaiting approval.
    Prompt,
    /// The response has been produced (or written by hand) and is awaiting approval.
    Response,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Stage::Prompt => "prompt",
            Stage::Response => "response",
        })
    }
}

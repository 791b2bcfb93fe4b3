//! The static transition table. A pure function from `(phase, stage,
//! command)` to the next `(phase, stage, action)` — the only authority
//! on legal transitions.

use crate::model::{Action, Command, Phase, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next_phase: Phase,
    pub next_stage: Option<Stage>,
    pub action: Action,
}

impl Transition {
    const fn new(next_phase: Phase, next_stage: Option<Stage>, action: Action) -> Self {
        Self {
            next_phase,
            next_stage,
            action,
        }
    }
}

/// Look up the transition for `(phase, stage, command)`. Returns
/// `None` for anything not in the table — the caller turns that into
/// `OrchestratorError::InvalidCommand`.
///
/// `cancel` and `reject`/`retry`/`status` are handled structurally
/// below rather than enumerated per `(phase, stage)` row, since they
/// apply uniformly to any active state — but the result is identical
/// to a fully expanded table, and `lookup` remains a pure function
/// with no side effects.
pub fn lookup(phase: Phase, stage: Option<Stage>, command: Command) -> Option<Transition> {
    if command == Command::Cancel {
        return Some(Transition::new(Phase::Cancelled, None, Action::Halt));
    }

    if command == Command::Status {
        // `status` never transitions; the orchestrator special-cases it
        // before consulting the table. Included here only so `lookup`
        // is total over `Command` without panicking.
        return None;
    }

    match (phase, stage, command) {
        (Phase::Init, None, Command::Init) => {
            Some(Transition::new(Phase::Plan, Some(Stage::Prompt), Action::CreatePrompt))
        }

        (Phase::Plan, Some(Stage::Prompt), Command::Approve) => {
            Some(Transition::new(Phase::Plan, Some(Stage::Response), Action::CallAi))
        }
        (Phase::Plan, Some(Stage::Response), Command::Approve) => {
            Some(Transition::new(Phase::Generate, Some(Stage::Prompt), Action::CreatePrompt))
        }

        (Phase::Generate, Some(Stage::Prompt), Command::Approve) => {
            Some(Transition::new(Phase::Generate, Some(Stage::Response), Action::CallAi))
        }
        (Phase::Generate, Some(Stage::Response), Command::Approve) => {
            Some(Transition::new(Phase::Review, Some(Stage::Prompt), Action::CreatePrompt))
        }

        (Phase::Review, Some(Stage::Prompt), Command::Approve) => {
            Some(Transition::new(Phase::Review, Some(Stage::Response), Action::CallAi))
        }
        // CHECK_VERDICT branches internally to FINALIZE or REVISE[PROMPT];
        // `next_phase`/`next_stage` here are placeholders the action
        // itself overrides after inspecting the verdict.
        (Phase::Review, Some(Stage::Response), Command::Approve) => {
            Some(Transition::new(Phase::Review, Some(Stage::Response), Action::CheckVerdict))
        }

        (Phase::Revise, Some(Stage::Prompt), Command::Approve) => {
            Some(Transition::new(Phase::Revise, Some(Stage::Response), Action::CallAi))
        }
        (Phase::Revise, Some(Stage::Response), Command::Approve) => {
            Some(Transition::new(Phase::Review, Some(Stage::Prompt), Action::CreatePrompt))
        }

        // `reject` and `retry` never change `(phase, stage)` at the
        // table level: they are handled by the orchestrator directly
        // (HALT / RETRY) for any active state.
        (p, s, Command::Reject) if s.is_some() && p.is_active() => {
            Some(Transition::new(p, s, Action::Halt))
        }
        (p, s, Command::Retry) if s.is_some() && p.is_active() => {
            Some(Transition::new(p, s, Action::Retry))
        }

        _ => None,
    }
}

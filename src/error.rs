//! Closed set of engine error kinds.
//!
//! Provider errors are recovered locally by the orchestrator and never
//! surface as a propagated `OrchestratorError` — see
//! `orchestrator::gate::run_gate`. Every other variant here is returned
//! to the caller without mutating `state.json`.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::{Phase, Stage};

/// Errors the engine can return from `Orchestrator::initialize_run` /
/// `Orchestrator::execute`.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Command not legal for the current `(phase, stage)` or pending-approval state.
    #[error("invalid command {command:?} for state (phase={phase:?}, stage={stage:?})")]
    InvalidCommand {
        command: String,
        phase: Phase,
        stage: Option<Stage>,
    },

    /// No session exists at the given id.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// I/O failure persisting or reading state.
    #[error("storage error at {path:?}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failure from an AI or approval provider. Recovered into
    /// `WorkflowState::last_error` by the gate; this variant exists so
    /// provider implementations have something uniform to return.
    #[error("provider error ({provider}): {message}")]
    Provider { provider: String, message: String },

    /// Bad workflow config, unknown provider key, or invalid cascade.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// `context` does not match the profile's declared `context_schema`.
    #[error("context validation error: {0}")]
    ContextValidation(String),

    /// Transition table returned an action the orchestrator doesn't
    /// know how to execute, or another invariant was violated.
    #[error("unexpected internal error: {0}")]
    UnexpectedInternal(String),
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

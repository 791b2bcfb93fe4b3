//! Optional observer hook.
//!
//! Not part of the core correctness model: observers must not raise,
//! and any error from one is swallowed and logged, never propagated.

use crate::model::{Phase, Stage};

#[derive(Debug, Clone)]
pub enum Event {
    PhaseEntered { phase: Phase, stage: Option<Stage> },
    ArtifactCreated { path: String },
    ArtifactApproved { path: String, sha256: String },
    ApprovalRequired { reason: Option<String> },
    ApprovalGranted,
    WorkflowCompleted,
    WorkflowFailed { reason: String },
    IterationStarted { iteration: u32 },
}

/// Implementors receive a best-effort notification after each
/// orchestrator-internal event. Panicking implementations are caught at
/// the call site (`notify`) and logged rather than propagated.
pub trait Observer: Send + Sync {
    fn on_event(&self, session_id: &str, event: &Event);
}

/// Calls `observer.on_event`, catching unwinds so a misbehaving
/// observer can never abort a workflow command.
pub fn notify(observer: &dyn Observer, session_id: &str, event: Event) {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        observer.on_event(session_id, &event);
    }));
    if let Err(_panic) = result {
        tracing::warn!(session_id, ?event, "observer panicked; event dropped");
    }
}

/// An observer that does nothing — the default when no observer is
/// configured.
pub struct NullObserver;

impl Observer for NullObserver {
    fn on_event(&self, _session_id: &str, _event: &Event) {}
}

//! `workflow-forge` — a resumable, file-materialized workflow
//! orchestrator that drives AI-assisted code-generation sessions
//! through a fixed sequence of phases (plan -> generate -> review ->
//! optionally revise -> complete).
//!
//! This crate is the orchestration engine only: the state machine, the
//! approval gate subsystem, the session store and artifact lifecycle,
//! configuration resolution, and the provider abstractions. CLI
//! front-ends, concrete AI providers, and domain profiles are external
//! collaborators consumed through the [`profile::Profile`] and
//! [`standards::StandardsProvider`] traits.

pub mod config;
pub mod error;
pub mod events;
pub mod hashing;
pub mod model;
pub mod orchestrator;
pub mod profile;
pub mod providers;
pub mod session;
pub mod slug;
pub mod standards;

pub use error::{OrchestratorError, Result};
pub use model::{
    canonical_relative_path, filenames, iteration_dir, Action, Artifact, ApprovalResult, Command, Decision,
    Phase, Stage, Status, WorkflowState,
};
pub use orchestrator::Orchestrator;
pub use profile::{ContextSchema, FieldSchema, FieldType, Profile, ProfileError, PromptRequest, PromptSections, Verdict};
pub use providers::{
    AiProvider, AiProviderResult, ApprovalProvider, FsAbility, ProviderError, ProviderMetadata, ProviderRegistry,
};
pub use session::SessionStore;
pub use standards::StandardsProvider;

//! `Orchestrator` — public command surface.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::config::WorkflowConfigDocument;
use crate::error::{OrchestratorError, Result};
use crate::events::{notify, Event, NullObserver, Observer};
use crate::model::{Command, Phase, Stage, Status, WorkflowState};
use crate::profile::Profile;
use crate::providers::ProviderRegistry;
use crate::session::SessionStore;
use crate::standards::StandardsProvider;
use crate::transitions;

use super::{actions, gate};

/// The injected-dependency engine. No singletons beyond the (already
/// process-wide) provider registry it is handed at construction.
pub struct Orchestrator {
    pub(crate) store: SessionStore,
    pub(crate) providers: ProviderRegistry,
    profiles: HashMap<String, Arc<dyn Profile>>,
    standards_providers: HashMap<String, Arc<dyn StandardsProvider>>,
    pub(crate) config: WorkflowConfigDocument,
    pub(crate) observer: Arc<dyn Observer>,
}

impl Orchestrator {
    pub fn new(store: SessionStore, providers: ProviderRegistry, config: WorkflowConfigDocument) -> Self {
        Self {
            store,
            providers,
            profiles: HashMap::new(),
            standards_providers: HashMap::new(),
            config,
            observer: Arc::new(NullObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub fn register_profile(&mut self, key: impl Into<String>, profile: Arc<dyn Profile>) {
        self.profiles.insert(key.into(), profile);
    }

    pub fn register_standards_provider(&mut self, key: impl Into<String>, provider: Arc<dyn StandardsProvider>) {
        self.standards_providers.insert(key.into(), provider);
    }

    /// List known session ids, used by front-ends for a `list` command;
    /// not itself part of the state machine.
    pub fn list_sessions(&self) -> Result<Vec<String>> {
        self.store.list()
    }

    pub(crate) fn profile(&self, key: &str) -> Result<Arc<dyn Profile>> {
        self.profiles
            .get(key)
            .cloned()
            .ok_or_else(|| OrchestratorError::Configuration(format!("unknown profile key '{key}'")))
    }

    pub(crate) fn standards_provider(&self, key: &str) -> Result<Arc<dyn StandardsProvider>> {
        self.standards_providers
            .get(key)
            .cloned()
            .ok_or_else(|| OrchestratorError::Configuration(format!("unknown standards provider key '{key}'")))
    }

    pub(crate) fn ai_provider_key_for(&self, state: &WorkflowState, phase: Phase) -> Result<String> {
        state
            .ai_providers
            .get(&phase.to_string())
            .cloned()
            .ok_or_else(|| {
                OrchestratorError::Configuration(format!("no ai_provider resolved for phase '{phase}'"))
            })
    }

    /// `init(profile, context, config) -> state`.
    ///
    /// Creates a session: creates the directory, validates `context`
    /// against the profile's schema, writes the standards bundle and
    /// hashes it once, transitions to `PLAN[PROMPT]`, executes
    /// `CREATE_PROMPT` and runs its gate.
    pub async fn initialize_run(
        &self,
        profile_key: &str,
        standards_key: &str,
        context: HashMap<String, Value>,
    ) -> Result<WorkflowState> {
        crate::config::validate(&self.config, &self.providers)?;

        let profile = self.profile(profile_key)?;
        profile
            .context_schema()
            .validate(&context)
            .map_err(|e| OrchestratorError::ContextValidation(e.to_string()))?;

        let session_id = Uuid::new_v4().to_string();
        let mut state = WorkflowState::new(session_id.clone(), profile_key.to_string());
        state.context = context;
        state.standards_provider = standards_key.to_string();

        for phase in [Phase::Plan, Phase::Generate, Phase::Review, Phase::Revise] {
            let resolved = crate::config::resolve(&self.config, phase, Stage::Response);
            if let Some(key) = resolved.ai_provider {
                state.ai_providers.insert(phase.to_string(), key);
            }
        }

        let standards = self.standards_provider(standards_key)?;
        let bundle = standards
            .bundle(&state.context)
            .map_err(|e| OrchestratorError::Configuration(e.to_string()))?;

        let session_dir = self.store.session_dir(&session_id);
        std::fs::create_dir_all(&session_dir).map_err(|source| OrchestratorError::Storage {
            path: session_dir.clone(),
            source,
        })?;
        let bundle_path = session_dir.join(crate::model::filenames::STANDARDS_BUNDLE);
        std::fs::write(&bundle_path, &bundle).map_err(|source| OrchestratorError::Storage {
            path: bundle_path,
            source,
        })?;
        state.standards_hash = crate::hashing::hash_bytes(bundle.as_bytes());

        state.transition_to(Phase::Plan, Some(Stage::Prompt));
        self.store.save(&state)?;

        actions::create_prompt(self, &mut state).await?;
        Ok(state)
    }

    /// `execute(session_id, command, feedback?) -> state`.
    pub async fn execute(&self, session_id: &str, command: Command, feedback: Option<String>) -> Result<WorkflowState> {
        let mut state = self.store.load(session_id)?;

        if command == Command::Status {
            // Read-only: no mutation, no save — idempotent by construction.
            return Ok(state);
        }

        state.begin_command();

        match command {
            Command::Status => unreachable!("handled above"),
            Command::Init => Err(OrchestratorError::InvalidCommand {
                command: command.to_string(),
                phase: state.phase,
                stage: state.stage,
            }),
            Command::Approve => self.handle_approve(&mut state).await,
            Command::Reject => self.handle_reject(&mut state, feedback),
            Command::Retry => self.handle_retry(&mut state, feedback).await,
            Command::Cancel => self.handle_cancel(&mut state),
        }?;

        Ok(state)
    }

    async fn handle_approve(&self, state: &mut WorkflowState) -> Result<()> {
        if !state.pending_approval && state.last_error.is_none() {
            return Err(OrchestratorError::InvalidCommand {
                command: Command::Approve.to_string(),
                phase: state.phase,
                stage: state.stage,
            });
        }

        if state.last_error.take().is_some() {
            // A gate-origin failure re-runs the gate; a CALL_AI-origin
            // failure re-enters the action that actually failed, so a
            // skip/auto approver can't auto_continue past a stage whose
            // response/code artifacts were never produced.
            if std::mem::take(&mut state.last_error_in_gate) {
                return gate::run_gate(self, state).await;
            }
            return actions::retry_current_stage(self, state).await;
        }

        state.pending_approval = false;
        state.approval_feedback = None;
        state.suggested_content = None;
        gate::auto_continue(self, state).await
    }

    fn handle_reject(&self, state: &mut WorkflowState, feedback: Option<String>) -> Result<()> {
        if !state.pending_approval {
            return Err(OrchestratorError::InvalidCommand {
                command: Command::Reject.to_string(),
                phase: state.phase,
                stage: state.stage,
            });
        }
        let feedback = feedback.unwrap_or_else(|| "rejected by user".to_string());
        state.approval_feedback = Some(feedback);
        state.pending_approval = false;
        state.touch();
        self.store.save(state)?;
        Ok(())
    }

    async fn handle_retry(&self, state: &mut WorkflowState, feedback: Option<String>) -> Result<()> {
        if !state.pending_approval && state.last_error.is_none() {
            return Err(OrchestratorError::InvalidCommand {
                command: Command::Retry.to_string(),
                phase: state.phase,
                stage: state.stage,
            });
        }
        if let Some(fb) = feedback {
            state.approval_feedback = Some(fb);
        }
        state.last_error = None;
        state.last_error_in_gate = false;
        state.pending_approval = false;
        actions::retry_current_stage(self, state).await
    }

    fn handle_cancel(&self, state: &mut WorkflowState) -> Result<()> {
        state.phase = Phase::Cancelled;
        state.stage = None;
        state.status = Status::Cancelled;
        state.pending_approval = false;
        state.touch();
        self.store.save(state)?;
        notify(self.observer.as_ref(), &state.session_id, Event::WorkflowFailed {
            reason: "cancelled".to_string(),
        });
        Ok(())
    }
}

pub(crate) fn lookup_or_internal_error(
    phase: Phase,
    stage: Option<Stage>,
    command: Command,
) -> Result<transitions::Transition> {
    transitions::lookup(phase, stage, command).ok_or_else(|| {
        OrchestratorError::UnexpectedInternal(format!(
            "no transition for (phase={phase:?}, stage={stage:?}, command={command:?})"
        ))
    })
}

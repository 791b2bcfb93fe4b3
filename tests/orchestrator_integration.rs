//! End-to-end exercises of the orchestrator against deterministic test
//! doubles — no real AI backend. Each scenario drives `Orchestrator`
//! through `init`/`approve`/`reject`/`retry`/`cancel` the way a real
//! front-end would, and asserts on the resulting `WorkflowState`.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use workflow_forge::config::{StageConfigOverlay, WorkflowConfigDocument};
use workflow_forge::model::Command;
use workflow_forge::profile::{ContextSchema, FieldType, ProfileError, PromptRequest, PromptSections, Verdict};
use workflow_forge::providers::{
    AiProvider, AiProviderResult, FsAbility, ManualApprovalProvider, ProviderError, ProviderMetadata,
    ProviderRegistry, SkipApprovalProvider, BUILTIN_MANUAL, BUILTIN_SKIP,
};
use workflow_forge::session::SessionStore;
use workflow_forge::standards::StandardsProvider;
use workflow_forge::{Orchestrator, Phase, Stage, Status};

/// A deterministic profile: every phase's prompt body just states the
/// phase and iteration, and review verdict is read off a literal
/// `PASS`/`FAIL` token in the response body.
struct TestProfile;

impl workflow_forge::Profile for TestProfile {
    fn name(&self) -> &str {
        "test-profile"
    }

    fn context_schema(&self) -> &ContextSchema {
        use std::sync::OnceLock;
        static SCHEMA: OnceLock<ContextSchema> = OnceLock::new();
        SCHEMA.get_or_init(|| ContextSchema::new().with_field("entity", FieldType::String, true))
    }

    fn create_prompt(&self, req: &PromptRequest<'_>) -> Result<PromptSections, ProfileError> {
        let mut body = format!("phase={} iteration={}\n", req.phase, req.iteration);
        if let Some(fb) = req.feedback {
            body.push_str(&format!("feedback: {fb}\n"));
        }
        Ok(PromptSections::new(body))
    }

    fn parse_review_verdict(&self, review_content: &str) -> Result<Verdict, ProfileError> {
        if review_content.contains("PASS") {
            Ok(Verdict::Pass)
        } else if review_content.contains("FAIL") {
            Ok(Verdict::Fail)
        } else {
            Err(ProfileError::Generic("no verdict token found".to_string()))
        }
    }
}

struct TestStandards;

impl StandardsProvider for TestStandards {
    fn key(&self) -> &str {
        "test-standards"
    }

    fn bundle(&self, _context: &HashMap<String, Value>) -> Result<String, ProfileError> {
        Ok("standards bundle v1".to_string())
    }
}

/// Returns a fixed response per phase, parsed out of the prompt's
/// metadata header comment (`<!-- phase=... -->`), so one instance can
/// serve as the `ai_provider` for every phase in a test.
struct PhaseScriptedAi {
    responses: HashMap<Phase, &'static str>,
}

impl PhaseScriptedAi {
    fn new(responses: &[(Phase, &'static str)]) -> Self {
        Self {
            responses: responses.iter().cloned().collect(),
        }
    }

    fn phase_from_prompt(prompt: &str) -> Option<Phase> {
        let marker = "phase=";
        let start = prompt.find(marker)? + marker.len();
        let rest = &prompt[start..];
        let end = rest.find(' ').unwrap_or(rest.len());
        match &rest[..end] {
            "plan" => Some(Phase::Plan),
            "generate" => Some(Phase::Generate),
            "review" => Some(Phase::Review),
            "revise" => Some(Phase::Revise),
            _ => None,
        }
    }
}

#[async_trait]
impl AiProvider for PhaseScriptedAi {
    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            key: "phase-scripted".to_string(),
            fs_ability: FsAbility::None,
            default_timeout_secs: 30,
            config_keys: Vec::new(),
        }
    }

    async fn validate(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn generate(
        &self,
        prompt: &str,
        _context: &HashMap<String, Value>,
    ) -> Result<Option<AiProviderResult>, ProviderError> {
        let phase = Self::phase_from_prompt(prompt).unwrap_or(Phase::Plan);
        let response = self.responses.get(&phase).copied().unwrap_or("generated content");
        Ok(Some(AiProviderResult {
            response: Some(response.to_string()),
            files: HashMap::new(),
        }))
    }
}

/// Used only as an AI-backed approver (via `AIApprovalProvider`):
/// returns a queued `DECISION:` line per call, repeating the last entry
/// once exhausted.
struct ScriptedDecisions {
    queue: Mutex<VecDeque<&'static str>>,
}

impl ScriptedDecisions {
    fn new(decisions: &[&'static str]) -> Self {
        Self {
            queue: Mutex::new(decisions.iter().copied().collect()),
        }
    }
}

#[async_trait]
impl AiProvider for ScriptedDecisions {
    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            key: "scripted-decisions".to_string(),
            fs_ability: FsAbility::None,
            default_timeout_secs: 30,
            config_keys: Vec::new(),
        }
    }

    async fn validate(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn generate(
        &self,
        _prompt: &str,
        _context: &HashMap<String, Value>,
    ) -> Result<Option<AiProviderResult>, ProviderError> {
        let mut q = self.queue.lock().unwrap();
        let next = q.pop_front().unwrap_or("DECISION: APPROVED");
        if q.is_empty() {
            q.push_back(next);
        }
        Ok(Some(AiProviderResult {
            response: Some(next.to_string()),
            files: HashMap::new(),
        }))
    }
}

fn context() -> HashMap<String, Value> {
    let mut ctx = HashMap::new();
    ctx.insert("entity".to_string(), Value::String("Widget".to_string()));
    ctx
}

fn base_orchestrator(sessions_dir: &std::path::Path, config: WorkflowConfigDocument, registry: ProviderRegistry) -> Orchestrator {
    let store = SessionStore::new(sessions_dir);
    let mut orch = Orchestrator::new(store, registry, config);
    orch.register_profile("test-profile", Arc::new(TestProfile));
    orch.register_standards_provider("test-standards", Arc::new(TestStandards));
    orch
}

fn skip_everywhere_config(ai_key: &str) -> WorkflowConfigDocument {
    WorkflowConfigDocument {
        defaults: StageConfigOverlay {
            ai_provider: Some(ai_key.to_string()),
            approval_provider: Some(BUILTIN_SKIP.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn manual_everywhere_config(ai_key: &str) -> WorkflowConfigDocument {
    WorkflowConfigDocument {
        defaults: StageConfigOverlay {
            ai_provider: Some(ai_key.to_string()),
            approval_provider: Some(BUILTIN_MANUAL.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn registry_with(ai_key: &str, ai: Arc<dyn AiProvider>) -> ProviderRegistry {
    let mut reg = ProviderRegistry::new();
    reg.register_approval(BUILTIN_SKIP, Arc::new(SkipApprovalProvider));
    reg.register_approval(BUILTIN_MANUAL, Arc::new(ManualApprovalProvider));
    reg.register_ai(ai_key, ai);
    reg
}

/// S1 — fully automated PASS: every gate auto-approves and the review
/// verdict passes on the first iteration.
#[tokio::test]
async fn s1_fully_automated_pass() {
    let dir = tempfile::tempdir().unwrap();
    let ai = Arc::new(PhaseScriptedAi::new(&[
        (Phase::Plan, "a plan"),
        (Phase::Generate, "fn widget() {}"),
        (Phase::Review, "Looks solid. PASS"),
    ]));
    let registry = registry_with("phase-scripted", ai);
    let config = skip_everywhere_config("phase-scripted");
    let orch = base_orchestrator(dir.path(), config, registry);

    let state = orch.initialize_run("test-profile", "test-standards", context()).await.unwrap();

    assert_eq!(state.phase, Phase::Complete);
    assert_eq!(state.status, Status::Success);
    assert_eq!(state.current_iteration, 1);
    assert!(state.artifacts.iter().all(|a| a.is_hashed()));
}

/// S2 — review fails every time: the workflow keeps revising and the
/// iteration counter keeps climbing instead of getting stuck.
#[tokio::test]
async fn s2_persistent_failure_keeps_revising() {
    let dir = tempfile::tempdir().unwrap();
    let ai = Arc::new(PhaseScriptedAi::new(&[
        (Phase::Plan, "a plan"),
        (Phase::Generate, "fn widget() {}"),
        (Phase::Review, "Needs changes. FAIL"),
        (Phase::Revise, "fn widget() { /* fixed */ }"),
    ]));
    let registry = registry_with("phase-scripted", ai);
    let config = skip_everywhere_config("phase-scripted");
    let orch = base_orchestrator(dir.path(), config, registry);

    let state = orch.initialize_run("test-profile", "test-standards", context()).await.unwrap();

    assert_eq!(state.phase, Phase::Review);
    assert_eq!(state.stage, Some(Stage::Prompt));
    assert!(state.current_iteration >= 2);
}

/// S2b — one revision then PASS: the first review fails, the revision
/// is produced and approved, and the second review passes.
#[tokio::test]
async fn s2b_revision_converges_to_pass() {
    struct FlippingReview {
        calls: Mutex<u32>,
    }

    #[async_trait]
    impl AiProvider for FlippingReview {
        fn metadata(&self) -> ProviderMetadata {
            ProviderMetadata {
                key: "flip".to_string(),
                fs_ability: FsAbility::None,
                default_timeout_secs: 30,
                config_keys: Vec::new(),
            }
        }
        async fn validate(&self) -> Result<(), ProviderError> {
            Ok(())
        }
        async fn generate(
            &self,
            prompt: &str,
            _context: &HashMap<String, Value>,
        ) -> Result<Option<AiProviderResult>, ProviderError> {
            let response = if prompt.contains("phase=review") {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                if *calls <= 1 { "still off. FAIL".to_string() } else { "now correct. PASS".to_string() }
            } else if prompt.contains("phase=plan") {
                "a plan".to_string()
            } else {
                "fn widget() {}".to_string()
            };
            Ok(Some(AiProviderResult { response: Some(response), files: HashMap::new() }))
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let ai = Arc::new(FlippingReview { calls: Mutex::new(0) });
    let registry = registry_with("flip", ai);
    let config = skip_everywhere_config("flip");
    let orch = base_orchestrator(dir.path(), config, registry);

    let state = orch.initialize_run("test-profile", "test-standards", context()).await.unwrap();

    assert_eq!(state.phase, Phase::Complete);
    assert_eq!(state.status, Status::Success);
    assert_eq!(state.current_iteration, 2);
}

/// S3 — manual PENDING pause: a human-driven approver pauses at every
/// gate, and the workflow advances one gate per `approve` call.
#[tokio::test]
async fn s3_manual_pause_then_step_through() {
    let dir = tempfile::tempdir().unwrap();
    let ai = Arc::new(PhaseScriptedAi::new(&[
        (Phase::Plan, "a plan"),
        (Phase::Generate, "fn widget() {}"),
        (Phase::Review, "PASS"),
    ]));
    let registry = registry_with("phase-scripted", ai);
    let config = manual_everywhere_config("phase-scripted");
    let orch = base_orchestrator(dir.path(), config, registry);

    let state = orch.initialize_run("test-profile", "test-standards", context()).await.unwrap();
    assert_eq!(state.phase, Phase::Plan);
    assert_eq!(state.stage, Some(Stage::Prompt));
    assert!(state.pending_approval);
    assert_eq!(state.status, Status::InProgress);

    let session_id = state.session_id.clone();
    let mut current = state;
    let mut steps = 0;
    while current.phase != Phase::Complete {
        current = orch.execute(&session_id, Command::Approve, None).await.unwrap();
        assert!(current.pending_approval, "manual approver always re-pends");
        steps += 1;
        assert!(steps < 20, "did not converge to Complete");
    }

    assert_eq!(current.status, Status::Success);
}

/// S4 — an AI-backed approver rejects twice (with retries configured)
/// before approving; the engine auto-retries `CALL_AI` in between.
#[tokio::test]
async fn s4_ai_approver_rejects_then_approves() {
    let dir = tempfile::tempdir().unwrap();
    let content_ai = Arc::new(PhaseScriptedAi::new(&[
        (Phase::Plan, "a plan"),
        (Phase::Generate, "fn widget() {}"),
        (Phase::Review, "PASS"),
    ]));
    let reviewer_ai = Arc::new(ScriptedDecisions::new(&[
        "DECISION: REJECTED\nneeds more detail",
        "DECISION: REJECTED\nstill thin",
        "DECISION: APPROVED",
    ]));

    let mut registry = ProviderRegistry::new();
    registry.register_approval(BUILTIN_SKIP, Arc::new(SkipApprovalProvider));
    registry.register_ai("content-ai", content_ai);
    registry.register_ai("reviewer-ai", reviewer_ai);

    let config = WorkflowConfigDocument {
        defaults: StageConfigOverlay {
            ai_provider: Some("content-ai".to_string()),
            approval_provider: Some(BUILTIN_SKIP.to_string()),
            ..Default::default()
        },
        plan: workflow_forge::config::PhaseConfigOverlay {
            response: Some(StageConfigOverlay {
                approval_provider: Some("reviewer-ai".to_string()),
                approval_max_retries: Some(2),
                ..Default::default()
            }),
            ..Default::default()
        },
        ..Default::default()
    };

    let orch = base_orchestrator(dir.path(), config, registry);
    let state = orch.initialize_run("test-profile", "test-standards", context()).await.unwrap();

    // Two rejections were auto-retried, then approved; the workflow
    // should have sailed through the rest (skip everywhere else).
    assert_eq!(state.phase, Phase::Complete);
    assert_eq!(state.status, Status::Success);
    let plan_response = state
        .artifacts
        .iter()
        .find(|a| a.path.ends_with("planning-response.md"))
        .unwrap();
    assert!(plan_response.is_hashed());
}

/// S5 — a human `reject` pauses the workflow without transitioning
/// phase/stage; feedback is recorded for the next `retry`/`approve`.
#[tokio::test]
async fn s5_reject_halts_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let ai = Arc::new(PhaseScriptedAi::new(&[(Phase::Plan, "a plan")]));
    let registry = registry_with("phase-scripted", ai);
    let config = manual_everywhere_config("phase-scripted");
    let orch = base_orchestrator(dir.path(), config, registry);

    let state = orch.initialize_run("test-profile", "test-standards", context()).await.unwrap();
    assert!(state.pending_approval);
    let session_id = state.session_id.clone();

    let after_reject = orch
        .execute(&session_id, Command::Reject, Some("rename the entity field".to_string()))
        .await
        .unwrap();

    assert_eq!(after_reject.phase, Phase::Plan);
    assert_eq!(after_reject.stage, Some(Stage::Prompt));
    assert!(!after_reject.pending_approval);
    assert_eq!(after_reject.approval_feedback.as_deref(), Some("rename the entity field"));
    assert_eq!(after_reject.status, Status::InProgress);
}

/// S6 — `cancel` is legal from any active state and is terminal.
#[tokio::test]
async fn s6_cancel_from_mid_workflow() {
    let dir = tempfile::tempdir().unwrap();
    let ai = Arc::new(PhaseScriptedAi::new(&[
        (Phase::Plan, "a plan"),
        (Phase::Generate, "fn widget() {}"),
    ]));
    let registry = registry_with("phase-scripted", ai);
    let config = manual_everywhere_config("phase-scripted");
    let orch = base_orchestrator(dir.path(), config, registry);

    let state = orch.initialize_run("test-profile", "test-standards", context()).await.unwrap();
    let session_id = state.session_id.clone();

    // Step forward once (Plan[Prompt] -> Plan[Response]) before cancelling.
    let mid = orch.execute(&session_id, Command::Approve, None).await.unwrap();
    assert_eq!(mid.phase, Phase::Plan);
    assert_eq!(mid.stage, Some(Stage::Response));

    let cancelled = orch.execute(&session_id, Command::Cancel, None).await.unwrap();
    assert_eq!(cancelled.phase, Phase::Cancelled);
    assert_eq!(cancelled.status, Status::Cancelled);
    assert!(cancelled.stage.is_none());

    // Cancel is legal even from an already-cancelled session (the "any
    // active state" rule is the table's only authority, not a status check).
    let _ = orch.execute(&session_id, Command::Cancel, None).await.unwrap();
}

/// `approve` after a CALL_AI provider failure must re-run CALL_AI, not
/// the gate — otherwise a skip/auto approver would wave the stage
/// through with no response/code artifacts ever produced.
#[tokio::test]
async fn s7_call_ai_failure_then_approve_reruns_call_ai() {
    struct FlakyGenerate {
        failed_once: Mutex<bool>,
    }

    #[async_trait]
    impl AiProvider for FlakyGenerate {
        fn metadata(&self) -> ProviderMetadata {
            ProviderMetadata {
                key: "flaky-generate".to_string(),
                fs_ability: FsAbility::None,
                default_timeout_secs: 30,
                config_keys: Vec::new(),
            }
        }
        async fn validate(&self) -> Result<(), ProviderError> {
            Ok(())
        }
        async fn generate(
            &self,
            prompt: &str,
            _context: &HashMap<String, Value>,
        ) -> Result<Option<AiProviderResult>, ProviderError> {
            if prompt.contains("phase=generate") {
                let mut failed_once = self.failed_once.lock().unwrap();
                if !*failed_once {
                    *failed_once = true;
                    return Err(ProviderError::Unavailable {
                        provider: "flaky-generate".to_string(),
                        message: "simulated outage".to_string(),
                    });
                }
            }
            let response = if prompt.contains("phase=review") { "PASS" } else { "a plan" };
            Ok(Some(AiProviderResult { response: Some(response.to_string()), files: HashMap::new() }))
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let ai = Arc::new(FlakyGenerate { failed_once: Mutex::new(false) });
    let registry = registry_with("flaky-generate", ai);
    let config = skip_everywhere_config("flaky-generate");
    let orch = base_orchestrator(dir.path(), config, registry);

    let state = orch.initialize_run("test-profile", "test-standards", context()).await.unwrap();

    // The Generate[Response] CALL_AI failed; the workflow is parked
    // there with last_error set, not pending on a gate decision.
    assert_eq!(state.phase, Phase::Generate);
    assert_eq!(state.stage, Some(Stage::Response));
    assert!(state.last_error.is_some());
    assert!(!state.pending_approval);

    let session_id = state.session_id.clone();
    let recovered = orch.execute(&session_id, Command::Approve, None).await.unwrap();

    assert_eq!(recovered.phase, Phase::Complete);
    assert_eq!(recovered.status, Status::Success);
    let generate_response = recovered
        .artifacts
        .iter()
        .find(|a| a.path.ends_with("generation-response.md"))
        .expect("CALL_AI retry must produce the generation response artifact");
    assert!(generate_response.is_hashed());
}

/// Boundary: `status` never mutates or saves state (idempotence law).
#[tokio::test]
async fn status_is_read_only_and_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let ai = Arc::new(PhaseScriptedAi::new(&[(Phase::Plan, "a plan")]));
    let registry = registry_with("phase-scripted", ai);
    let config = manual_everywhere_config("phase-scripted");
    let orch = base_orchestrator(dir.path(), config, registry);

    let state = orch.initialize_run("test-profile", "test-standards", context()).await.unwrap();
    let session_id = state.session_id.clone();

    let first = orch.execute(&session_id, Command::Status, None).await.unwrap();
    let second = orch.execute(&session_id, Command::Status, None).await.unwrap();
    assert_eq!(first.updated_at, second.updated_at);
    assert_eq!(first.phase, second.phase);
}

/// Boundary: `approve` is illegal when nothing is pending and there is
/// no recorded `last_error`.
#[tokio::test]
async fn approve_without_pending_state_is_invalid_command() {
    let dir = tempfile::tempdir().unwrap();
    let ai = Arc::new(PhaseScriptedAi::new(&[
        (Phase::Plan, "a plan"),
        (Phase::Generate, "fn widget() {}"),
        (Phase::Review, "PASS"),
    ]));
    let registry = registry_with("phase-scripted", ai);
    let config = skip_everywhere_config("phase-scripted");
    let orch = base_orchestrator(dir.path(), config, registry);

    let state = orch.initialize_run("test-profile", "test-standards", context()).await.unwrap();
    assert_eq!(state.phase, Phase::Complete);

    let err = orch.execute(&state.session_id, Command::Approve, None).await.unwrap_err();
    assert!(matches!(err, workflow_forge::OrchestratorError::InvalidCommand { .. }));
}

/// Loading an unknown session id surfaces `SessionNotFound`, not a panic.
#[tokio::test]
async fn unknown_session_id_errors() {
    let dir = tempfile::tempdir().unwrap();
    let ai = Arc::new(PhaseScriptedAi::new(&[]));
    let registry = registry_with("phase-scripted", ai);
    let config = skip_everywhere_config("phase-scripted");
    let orch = base_orchestrator(dir.path(), config, registry);

    let err = orch.execute("does-not-exist", Command::Status, None).await.unwrap_err();
    assert!(matches!(err, workflow_forge::OrchestratorError::SessionNotFound(_)));
}

/// Context validation failures surface as `ContextValidationError`
/// before any session directory is created.
#[tokio::test]
async fn init_rejects_invalid_context() {
    let dir = tempfile::tempdir().unwrap();
    let ai = Arc::new(PhaseScriptedAi::new(&[]));
    let registry = registry_with("phase-scripted", ai);
    let config = skip_everywhere_config("phase-scripted");
    let orch = base_orchestrator(dir.path(), config, registry);

    let err = orch
        .initialize_run("test-profile", "test-standards", HashMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, workflow_forge::OrchestratorError::ContextValidation(_)));
}

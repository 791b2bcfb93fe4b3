//! Action execution: `CREATE_PROMPT`, `CALL_AI`, `CHECK_VERDICT`,
//! `FINALIZE`, and the shared retry path used by both the `retry`
//! command and auto-retry-on-rejection.

use std::path::Path;

use crate::error::{OrchestratorError, Result};
use crate::events::{notify, Event};
use crate::hashing::hash_file;
use crate::model::{canonical_relative_path, filenames, Artifact, Phase, Stage, Status, WorkflowState};
use crate::profile::{PromptRequest, Verdict};

use super::engine::Orchestrator;
use super::gate;
use super::BoxFuture;

fn write_session_file(session_dir: &Path, relative: &Path, content: &str) -> Result<()> {
    let target = session_dir.join(relative);
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|source| OrchestratorError::Storage {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(&target, content).map_err(|source| OrchestratorError::Storage {
        path: target,
        source,
    })
}

fn read_session_file(session_dir: &Path, relative: &Path) -> Result<String> {
    let path = session_dir.join(relative);
    std::fs::read_to_string(&path).map_err(|source| OrchestratorError::Storage { path, source })
}

/// Response artifacts recorded so far, in the order they were created
/// — passed to `Profile::create_prompt` as `previous_responses`.
fn collect_previous_responses(session_dir: &Path, state: &WorkflowState) -> Vec<(String, String)> {
    state
        .artifacts
        .iter()
        .filter(|a| a.path.ends_with("-response.md"))
        .filter_map(|a| {
            read_session_file(session_dir, Path::new(&a.path))
                .ok()
                .map(|content| (a.path.clone(), content))
        })
        .collect()
}

/// `CREATE_PROMPT`.
pub(crate) fn create_prompt<'a>(orch: &'a Orchestrator, state: &'a mut WorkflowState) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let phase = state.phase;
        let iteration = state.current_iteration;
        let session_dir = orch.store.session_dir(&state.session_id);

        let profile = orch.profile(&state.profile)?;
        let standards = read_session_file(&session_dir, Path::new(filenames::STANDARDS_BUNDLE))?;
        let previous_responses = collect_previous_responses(&session_dir, state);

        let req = PromptRequest {
            phase,
            iteration,
            context: &state.context,
            previous_responses: &previous_responses,
            standards: &standards,
            feedback: state.approval_feedback.as_deref(),
            suggested_content: state.suggested_content.as_deref(),
        };

        let sections = profile
            .create_prompt(&req)
            .map_err(|e| OrchestratorError::Configuration(e.to_string()))?;

        let mut body = String::new();
        body.push_str(&format!(
            "<!-- phase={phase} iteration={iteration} session={} -->\n\n",
            state.session_id
        ));
        if let Some(title) = &sections.title {
            body.push_str(&format!("# {title}\n\n"));
        }
        body.push_str(&sections.body);
        if let Some(instructions) = &sections.output_instructions {
            body.push_str("\n\n## Output instructions\n\n");
            body.push_str(instructions);
        }

        let relative = canonical_relative_path(phase, Stage::Prompt, iteration);
        write_session_file(&session_dir, &relative, &body)?;

        let artifact = Artifact::new(relative.to_string_lossy().to_string(), phase, iteration);
        state.record_artifact(artifact);
        notify(
            orch.observer.as_ref(),
            &state.session_id,
            Event::ArtifactCreated {
                path: relative.to_string_lossy().to_string(),
            },
        );

        gate::run_gate(orch, state).await
    })
}

/// `CALL_AI`.
pub(crate) fn call_ai<'a>(orch: &'a Orchestrator, state: &'a mut WorkflowState) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let phase = state.phase;
        let iteration = state.current_iteration;
        let session_dir = orch.store.session_dir(&state.session_id);

        let ai_key = orch.ai_provider_key_for(state, phase)?;
        let provider = crate::providers::create_ai_provider(&orch.providers, &ai_key)
            .map_err(|e| OrchestratorError::Configuration(e.to_string()))?;

        let prompt_relative = canonical_relative_path(phase, Stage::Prompt, iteration);
        let prompt = read_session_file(&session_dir, &prompt_relative)?;

        let generated = provider.generate(&prompt, &state.context).await;
        let result = match generated {
            Ok(r) => r,
            Err(e) => {
                state.last_error = Some(e.to_string());
                state.last_error_in_gate = false;
                state.push_message(format!("AI provider call failed: {e}. Run `approve` to retry."));
                state.touch();
                orch.store.save(state)?;
                return Ok(());
            }
        };

        if let Some(generation) = result {
            if let Some(response) = generation.response {
                let relative = canonical_relative_path(phase, Stage::Response, iteration);
                write_session_file(&session_dir, &relative, &response)?;
                let artifact = Artifact::new(relative.to_string_lossy().to_string(), phase, iteration);
                state.record_artifact(artifact);
            }

            for (path, content) in generation.files {
                let relative = Path::new(&crate::model::iteration_dir(iteration))
                    .join(filenames::CODE_DIR)
                    .join(&path);
                match content {
                    Some(text) => {
                        write_session_file(&session_dir, &relative, &text)?;
                    }
                    None => {
                        if !session_dir.join(&relative).exists() {
                            state.push_message(format!(
                                "expected provider-written file missing: {}",
                                relative.display()
                            ));
                            continue;
                        }
                    }
                }
                let artifact = Artifact::new(relative.to_string_lossy().to_string(), phase, iteration);
                state.record_artifact(artifact);
            }
        }

        notify(
            orch.observer.as_ref(),
            &state.session_id,
            Event::ArtifactCreated {
                path: canonical_relative_path(phase, Stage::Response, iteration)
                    .to_string_lossy()
                    .to_string(),
            },
        );

        gate::run_gate(orch, state).await
    })
}

/// `CHECK_VERDICT` — only fires at `REVIEW[RESPONSE]` approval.
pub(crate) fn check_verdict<'a>(orch: &'a Orchestrator, state: &'a mut WorkflowState) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let iteration = state.current_iteration;
        let session_dir = orch.store.session_dir(&state.session_id);
        let relative = canonical_relative_path(Phase::Review, Stage::Response, iteration);
        let review_content = read_session_file(&session_dir, &relative)?;

        let profile = orch.profile(&state.profile)?;
        let verdict = profile
            .parse_review_verdict(&review_content)
            .map_err(|e| OrchestratorError::Configuration(e.to_string()))?;

        match verdict {
            Verdict::Pass => finalize(orch, state),
            Verdict::Fail => {
                state.current_iteration += 1;
                state.transition_to(Phase::Revise, Some(Stage::Prompt));
                notify(
                    orch.observer.as_ref(),
                    &state.session_id,
                    Event::IterationStarted {
                        iteration: state.current_iteration,
                    },
                );
                create_prompt(orch, state).await?;
            }
        }
        Ok(())
    })
}

/// `FINALIZE`.
pub(crate) fn finalize(orch: &Orchestrator, state: &mut WorkflowState) {
    state.phase = Phase::Complete;
    state.stage = None;
    state.status = Status::Success;
    state.pending_approval = false;
    state.touch();

    let session_dir = orch.store.session_dir(&state.session_id);
    let plan_path = session_dir.join(filenames::PLAN_MD);
    if !plan_path.exists() {
        if let Some(plan_hash) = &state.plan_hash {
            let plan_response = canonical_relative_path(Phase::Plan, Stage::Response, 1);
            if let Ok(content) = read_session_file(&session_dir, &plan_response) {
                let _ = write_session_file(&session_dir, Path::new(filenames::PLAN_MD), &content);
                tracing::debug!(session_id = %state.session_id, plan_hash, "plan.md written by finalize fallback");
            }
        }
    }

    let _ = orch.store.save(state);
    notify(orch.observer.as_ref(), &state.session_id, Event::WorkflowCompleted);
}

/// Shared retry path for both the `retry` command and auto-retry on a
/// `REJECTED` decision.
pub(crate) fn retry_current_stage<'a>(orch: &'a Orchestrator, state: &'a mut WorkflowState) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        match state.stage {
            Some(Stage::Response) => call_ai(orch, state).await,
            Some(Stage::Prompt) => {
                let profile = orch.profile(&state.profile)?;
                if profile.can_regenerate_prompts() {
                    create_prompt(orch, state).await
                } else {
                    state.pending_approval = true;
                    state.push_message(
                        "this profile cannot regenerate prompts; resolve manually, then `approve`".to_string(),
                    );
                    state.touch();
                    orch.store.save(state)?;
                    Ok(())
                }
            }
            None => Err(OrchestratorError::InvalidCommand {
                command: "retry".to_string(),
                phase: state.phase,
                stage: state.stage,
            }),
        }
    })
}

/// Hash the file at `relative` (relative to the session dir) and record
/// the digest on its most recently created `Artifact`. Returns the
/// digest so callers that also need it for `plan_hash`/`review_hash`
/// don't hash twice.
pub(crate) async fn hash_file_into_artifact(orch: &Orchestrator, state: &mut WorkflowState, relative: &str) -> Result<String> {
    let path = orch.store.session_dir(&state.session_id).join(relative);
    let digest = hash_file(&path).await.map_err(|source| OrchestratorError::Storage { path, source })?;
    if let Some(artifact) = state.artifact_mut(relative) {
        artifact.sha256 = digest.clone();
    }
    Ok(digest)
}

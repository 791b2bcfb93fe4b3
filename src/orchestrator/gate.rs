//! The approval gate: runs immediately after every content-creating
//! action and decides whether the workflow auto-advances, pauses for
//! a human, or retries with feedback.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::{self, StageConfig};
use crate::error::{OrchestratorError, Result};
use crate::events::{notify, Event};
use crate::model::{
    canonical_relative_path, filenames, iteration_dir, Action, Command, Decision, Phase, Stage, WorkflowState,
};
use crate::providers::{self, ApprovalProvider, FsAbility};

use super::engine::{lookup_or_internal_error, Orchestrator};
use super::{actions, BoxFuture};

fn list_files_recursive(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return out;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            out.extend(list_files_recursive(&path));
        } else {
            out.push(path);
        }
    }
    out.sort();
    out
}

fn code_files_relative(session_dir: &Path, iteration: u32) -> Vec<PathBuf> {
    let code_dir = session_dir.join(iteration_dir(iteration)).join(filenames::CODE_DIR);
    list_files_recursive(&code_dir)
        .into_iter()
        .filter_map(|p| p.strip_prefix(session_dir).ok().map(|p| p.to_path_buf()))
        .collect()
}

/// The per-gate `files` contract.
fn gate_relative_paths(session_dir: &Path, phase: Phase, stage: Stage, iteration: u32) -> Vec<PathBuf> {
    match (phase, stage) {
        (Phase::Plan, Stage::Prompt) => vec![canonical_relative_path(Phase::Plan, Stage::Prompt, iteration)],
        (Phase::Plan, Stage::Response) => vec![
            canonical_relative_path(Phase::Plan, Stage::Prompt, iteration),
            canonical_relative_path(Phase::Plan, Stage::Response, iteration),
        ],
        (Phase::Generate, Stage::Prompt) => {
            let mut v = vec![canonical_relative_path(Phase::Generate, Stage::Prompt, iteration)];
            let plan_md = PathBuf::from(filenames::PLAN_MD);
            if session_dir.join(&plan_md).exists() {
                v.push(plan_md);
            }
            v
        }
        (Phase::Generate, Stage::Response) => {
            let mut v = vec![canonical_relative_path(Phase::Generate, Stage::Prompt, iteration)];
            v.extend(code_files_relative(session_dir, iteration));
            v
        }
        (Phase::Review, Stage::Prompt) => {
            let mut v = vec![canonical_relative_path(Phase::Review, Stage::Prompt, iteration)];
            v.extend(code_files_relative(session_dir, iteration));
            v
        }
        (Phase::Review, Stage::Response) => vec![
            canonical_relative_path(Phase::Review, Stage::Prompt, iteration),
            canonical_relative_path(Phase::Review, Stage::Response, iteration),
        ],
        (Phase::Revise, Stage::Prompt) => {
            let prev_iter = if iteration > 1 { iteration - 1 } else { iteration };
            let mut v = vec![canonical_relative_path(Phase::Revise, Stage::Prompt, iteration)];
            v.push(canonical_relative_path(Phase::Review, Stage::Response, prev_iter));
            v.extend(code_files_relative(session_dir, prev_iter));
            v
        }
        (Phase::Revise, Stage::Response) => {
            let mut v = vec![canonical_relative_path(Phase::Revise, Stage::Prompt, iteration)];
            v.extend(code_files_relative(session_dir, iteration));
            v
        }
        _ => Vec::new(),
    }
}

/// Values are file contents when the approver's `fs_ability = none`
/// (the engine must inline them), otherwise `None` (the approver reads
/// paths itself).
fn build_files_map(session_dir: &Path, relative_paths: &[PathBuf], inline: bool) -> Result<HashMap<String, Option<String>>> {
    let mut map = HashMap::new();
    for rel in relative_paths {
        let key = rel.to_string_lossy().to_string();
        if inline {
            let full = session_dir.join(rel);
            let content = std::fs::read_to_string(&full).map_err(|source| OrchestratorError::Storage {
                path: full,
                source,
            })?;
            map.insert(key, Some(content));
        } else {
            map.insert(key, None);
        }
    }
    Ok(map)
}

/// Runs the approval gate for the current `(phase, stage)`. Called
/// immediately after every content-creating action.
pub(crate) fn run_gate<'a>(orch: &'a Orchestrator, state: &'a mut WorkflowState) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let phase = state.phase;
        let stage = state.stage.expect("run_gate called on an active phase");
        let iteration = state.current_iteration;
        let session_dir = orch.store.session_dir(&state.session_id);

        let resolved = config::resolve(&orch.config, phase, stage);
        let approval_provider = providers::create_approval_provider(&orch.providers, &resolved.approval_provider)
            .map_err(|e| OrchestratorError::Configuration(e.to_string()))?;

        let inline = approval_provider.metadata().fs_ability == FsAbility::None;
        let relative_paths = gate_relative_paths(&session_dir, phase, stage, iteration);
        let files = build_files_map(&session_dir, &relative_paths, inline)?;

        let evaluated = approval_provider
            .evaluate(
                phase,
                stage,
                &files,
                &state.context,
                &resolved.approver_config,
                resolved.approval_allow_rewrite,
            )
            .await;

        let result = match evaluated {
            Ok(r) => r,
            Err(e) => {
                state.last_error = Some(e.to_string());
                state.last_error_in_gate = true;
                state.push_message(format!("Approval failed: {e}. Run `approve` to retry."));
                state.touch();
                orch.store.save(state)?;
                return Ok(());
            }
        };

        match result.decision {
            Decision::Approved => {
                notify(orch.observer.as_ref(), &state.session_id, Event::ApprovalGranted);
                pre_transition_bookkeeping(orch, state, phase, stage, &resolved).await?;
                state.pending_approval = false;
                state.approval_feedback = None;
                state.suggested_content = None;
                state.retry_count = 0;
                auto_continue(orch, state).await
            }
            Decision::Pending => {
                state.pending_approval = true;
                if let Some(fb) = result.feedback {
                    state.push_message(fb);
                }
                state.touch();
                orch.store.save(state)?;
                notify(
                    orch.observer.as_ref(),
                    &state.session_id,
                    Event::ApprovalRequired { reason: None },
                );
                Ok(())
            }
            Decision::Rejected { feedback } => {
                handle_rejection(orch, state, phase, stage, feedback, result.suggested_content, &resolved).await
            }
        }
    })
}

/// Pre-transition bookkeeping on approval.
async fn pre_transition_bookkeeping(
    orch: &Orchestrator,
    state: &mut WorkflowState,
    phase: Phase,
    stage: Stage,
    resolved: &StageConfig,
) -> Result<()> {
    let iteration = state.current_iteration;

    match (phase, stage) {
        (Phase::Plan, Stage::Response) => {
            let relative = canonical_relative_path(Phase::Plan, Stage::Response, iteration);
            let rel_str = relative.to_string_lossy().to_string();
            let digest = actions::hash_file_into_artifact(orch, state, &rel_str).await?;
            notify(
                orch.observer.as_ref(),
                &state.session_id,
                Event::ArtifactApproved { path: rel_str, sha256: digest.clone() },
            );
            state.plan_hash = Some(digest);

            let session_dir = orch.store.session_dir(&state.session_id);
            let content = std::fs::read_to_string(session_dir.join(&relative)).map_err(|source| {
                OrchestratorError::Storage { path: session_dir.join(&relative), source }
            })?;
            let plan_path = session_dir.join(filenames::PLAN_MD);
            std::fs::write(&plan_path, &content)
                .map_err(|source| OrchestratorError::Storage { path: plan_path, source })?;
        }
        (Phase::Generate, Stage::Response) | (Phase::Revise, Stage::Response) => {
            let session_dir = orch.store.session_dir(&state.session_id);
            let response_relative = canonical_relative_path(phase, Stage::Response, iteration);
            let response_rel_str = response_relative.to_string_lossy().to_string();
            let digest = actions::hash_file_into_artifact(orch, state, &response_rel_str).await?;
            notify(
                orch.observer.as_ref(),
                &state.session_id,
                Event::ArtifactApproved { path: response_rel_str, sha256: digest },
            );

            for relative in code_files_relative(&session_dir, iteration) {
                let rel_str = relative.to_string_lossy().to_string();
                let digest = actions::hash_file_into_artifact(orch, state, &rel_str).await?;
                notify(
                    orch.observer.as_ref(),
                    &state.session_id,
                    Event::ArtifactApproved { path: rel_str, sha256: digest },
                );
            }
        }
        (Phase::Review, Stage::Response) => {
            let relative = canonical_relative_path(Phase::Review, Stage::Response, iteration);
            let rel_str = relative.to_string_lossy().to_string();
            let digest = actions::hash_file_into_artifact(orch, state, &rel_str).await?;
            notify(
                orch.observer.as_ref(),
                &state.session_id,
                Event::ArtifactApproved { path: rel_str, sha256: digest.clone() },
            );
            state.review_hash = Some(digest);
        }
        (_, Stage::Prompt) if resolved.hash_prompts => {
            let relative = canonical_relative_path(phase, Stage::Prompt, iteration);
            let rel_str = relative.to_string_lossy().to_string();
            let session_dir = orch.store.session_dir(&state.session_id);
            let digest = crate::hashing::hash_file(&session_dir.join(&relative))
                .await
                .map_err(|source| OrchestratorError::Storage { path: session_dir.join(&relative), source })?;
            state.prompt_hashes.insert(rel_str, digest);
        }
        _ => {}
    }
    Ok(())
}

/// Rejection handling.
async fn handle_rejection(
    orch: &Orchestrator,
    state: &mut WorkflowState,
    phase: Phase,
    stage: Stage,
    feedback: String,
    suggested_content: Option<String>,
    resolved: &StageConfig,
) -> Result<()> {
    state.approval_feedback = Some(feedback.clone());
    state.suggested_content = if resolved.approval_allow_rewrite { suggested_content } else { None };
    state.retry_count += 1;
    state.touch();

    notify(
        orch.observer.as_ref(),
        &state.session_id,
        Event::WorkflowFailed { reason: feedback.clone() },
    );

    if resolved.approval_provider == providers::BUILTIN_MANUAL {
        // `manual` always yields PENDING; a REJECTED decision can never
        // originate from it. Defensive no-op.
        state.pending_approval = true;
        orch.store.save(state)?;
        return Ok(());
    }

    if stage == Stage::Response {
        if state.retry_count <= resolved.approval_max_retries {
            return actions::call_ai(orch, state).await;
        }
        state.pending_approval = true;
        state.push_message(format!(
            "approval retries exhausted ({} > {}); resolve manually, then `approve`",
            state.retry_count, resolved.approval_max_retries
        ));
        orch.store.save(state)?;
        return Ok(());
    }

    // PROMPT stage: prompts are profile-generated, not AI-generated.
    // Auto-retry only if the profile declares it can regenerate prompts;
    // the ambiguous case (no declaration) resolves to forbidden.
    let profile = orch.profile(&state.profile)?;
    if profile.can_regenerate_prompts() {
        if state.retry_count <= resolved.approval_max_retries {
            return actions::create_prompt(orch, state).await;
        }
        state.pending_approval = true;
        state.push_message(
            "approval retries exhausted for prompt regeneration; resolve manually, then `approve`".to_string(),
        );
        orch.store.save(state)?;
        return Ok(());
    }

    state.pending_approval = true;
    state.push_message(feedback);
    orch.store.save(state)?;
    Ok(())
}

/// Auto-continue after an APPROVED decision.
pub(crate) fn auto_continue<'a>(orch: &'a Orchestrator, state: &'a mut WorkflowState) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let transition = lookup_or_internal_error(state.phase, state.stage, Command::Approve)?;

        state.transition_to(transition.next_phase, transition.next_stage);
        notify(
            orch.observer.as_ref(),
            &state.session_id,
            Event::PhaseEntered { phase: state.phase, stage: state.stage },
        );

        match transition.action {
            Action::CreatePrompt => actions::create_prompt(orch, state).await,
            Action::CallAi => actions::call_ai(orch, state).await,
            Action::CheckVerdict => actions::check_verdict(orch, state).await,
            Action::Finalize => {
                actions::finalize(orch, state);
                Ok(())
            }
            other => Err(OrchestratorError::UnexpectedInternal(format!(
                "auto_continue received an action the transition table should never produce here: {other:?}"
            ))),
        }
    })
}

//! Cascade resolution and load-time validation.

use crate::error::{OrchestratorError, Result};
use crate::model::{Phase, Stage};
use crate::providers::ProviderRegistry;

use super::schema::{StageConfig, StageConfigOverlay, WorkflowConfigDocument};

fn phase_overlay(doc: &WorkflowConfigDocument, phase: Phase) -> Option<&super::schema::PhaseConfigOverlay> {
    match phase {
        Phase::Plan => Some(&doc.plan),
        Phase::Generate => Some(&doc.generate),
        Phase::Review => Some(&doc.review),
        Phase::Revise => Some(&doc.revise),
        _ => None,
    }
}

fn stage_overlay(
    phase_overlay: Option<&super::schema::PhaseConfigOverlay>,
    stage: Stage,
) -> StageConfigOverlay {
    phase_overlay
        .and_then(|p| match stage {
            Stage::Prompt => p.prompt.clone(),
            Stage::Response => p.response.clone(),
        })
        .unwrap_or_default()
}

/// Resolve `defaults ⊕ stage-level` for `(phase, stage)` into a
/// concrete `StageConfig`. The on-disk document nests stage overrides
/// directly under each phase (there is no separate phase-wide overlay
/// distinct from its prompt/response children), so the cascade has two
/// effective layers: `defaults` and the selected stage overlay.
pub fn resolve(doc: &WorkflowConfigDocument, phase: Phase, stage: Stage) -> StageConfig {
    let stage_level = stage_overlay(phase_overlay(doc, phase), stage);
    doc.defaults.merged_over(&stage_level).into()
}

/// Validate the document at load time.
/// Fail-fast: returns the first violation found.
pub fn validate(doc: &WorkflowConfigDocument, registry: &ProviderRegistry) -> Result<()> {
    for phase in [Phase::Plan, Phase::Generate, Phase::Review, Phase::Revise] {
        for stage in [Stage::Prompt, Stage::Response] {
            let resolved = resolve(doc, phase, stage);

            if stage == Stage::Response {
                let provider = resolved.ai_provider.as_deref().unwrap_or("");
                if provider.is_empty() {
                    return Err(OrchestratorError::Configuration(format!(
                        "{phase}[{stage}] is a RESPONSE stage and requires a non-empty ai_provider"
                    )));
                }
                if !registry.has_ai(provider) {
                    return Err(OrchestratorError::Configuration(format!(
                        "unknown ai_provider key '{provider}' for {phase}[{stage}]"
                    )));
                }
            }

            if !registry.has_any(&resolved.approval_provider) {
                return Err(OrchestratorError::Configuration(format!(
                    "unknown approval_provider key '{}' for {phase}[{stage}]",
                    resolved.approval_provider
                )));
            }
        }
    }
    Ok(())
}

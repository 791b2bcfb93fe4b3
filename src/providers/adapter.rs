//! The AI-as-approver adapter: wraps an `AiProvider` so it can serve
//! as an `ApprovalProvider`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::{AiProvider, ApprovalProvider, FsAbility, ProviderError, ProviderMetadata};
use crate::model::{ApprovalResult, Decision, Phase, Stage};

static DECISION_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^\s*DECISION:\s*(APPROVED|REJECTED|PENDING)\s*$").unwrap());

static REWRITE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```suggested_content\r?\n(.*?)```").unwrap());

pub struct AIApprovalProvider {
    inner: Arc<dyn AiProvider>,
}

impl AIApprovalProvider {
    pub fn new(inner: Arc<dyn AiProvider>) -> Self {
        Self { inner }
    }

    fn build_prompt(phase: Phase, stage: Stage, files: &HashMap<String, Option<String>>) -> String {
        let mut prompt = format!(
            "You are evaluating the {phase}[{stage}] gate of an automated workflow.\n\
             Respond with a line `DECISION: APPROVED`, `DECISION: REJECTED`, or `DECISION: PENDING`,\n\
             followed by feedback if rejecting.\n\nFiles under review:\n"
        );
        for (path, content) in files {
            match content {
                Some(c) => prompt.push_str(&format!("--- {path} ---\n{c}\n\n")),
                None => prompt.push_str(&format!("- {path} (read from disk)\n")),
            }
        }
        prompt
    }

    fn parse_decision(response: &str) -> (Decision, Option<String>) {
        if let Some(caps) = DECISION_LINE.captures(response) {
            let word = caps.get(1).unwrap().as_str().to_uppercase();
            let feedback = Self::feedback_after_decision_line(response);
            return match word.as_str() {
                "APPROVED" => (Decision::Approved, None),
                "PENDING" => (Decision::Pending, feedback),
                _ => {
                    let text = feedback.unwrap_or_else(|| "rejected by approver".to_string());
                    (Decision::Rejected { feedback: text }, None)
                }
            };
        }

        let lower = response.to_lowercase();
        let approved = lower.contains("approved");
        let rejected = lower.contains("rejected");
        if approved && !rejected {
            return (Decision::Approved, None);
        }
        if rejected {
            return (
                Decision::Rejected {
                    feedback: "rejected by approver (keyword scan)".to_string(),
                },
                None,
            );
        }

        (
            Decision::Rejected {
                feedback: "unparseable approver response; content must be re-evaluated".to_string(),
            },
            None,
        )
    }

    fn feedback_after_decision_line(response: &str) -> Option<String> {
        let idx = DECISION_LINE.find(response)?.end();
        let rest = response[idx..].trim();
        if rest.is_empty() {
            None
        } else {
            Some(rest.to_string())
        }
    }

    fn parse_suggested_content(response: &str) -> Option<String> {
        REWRITE_BLOCK
            .captures(response)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
    }
}

#[async_trait]
impl ApprovalProvider for AIApprovalProvider {
    fn metadata(&self) -> ProviderMetadata {
        let mut meta = self.inner.metadata();
        // An AI provider acting as approver inherits its own fs_ability
        // for the purposes of whether the engine inlines file content.
        meta.key = format!("{}(approver)", meta.key);
        meta
    }

    async fn evaluate(
        &self,
        phase: Phase,
        stage: Stage,
        files: &HashMap<String, Option<String>>,
        context: &HashMap<String, Value>,
        _approver_config: &HashMap<String, Value>,
        allow_rewrite: bool,
    ) -> Result<ApprovalResult, ProviderError> {
        let prompt = Self::build_prompt(phase, stage, files);
        let generated = self.inner.generate(&prompt, context).await?;

        let response = match generated.and_then(|r| r.response) {
            Some(text) if !text.trim().is_empty() => text,
            _ => {
                return Ok(ApprovalResult::rejected(
                    "unparseable approver response; content must be re-evaluated",
                )
                .expect("non-empty feedback"))
            }
        };

        let (decision, pending_feedback) = Self::parse_decision(&response);
        let mut result = match decision {
            Decision::Approved => ApprovalResult::approved(),
            Decision::Pending => ApprovalResult::pending(pending_feedback),
            Decision::Rejected { feedback } => {
                ApprovalResult::rejected(feedback).expect("non-empty feedback")
            }
        };

        if allow_rewrite {
            if let Some(suggestion) = Self::parse_suggested_content(&response) {
                result = result.with_suggested_content(suggestion);
            }
        }

        Ok(result)
    }
}

impl From<ProviderError> for crate::error::OrchestratorError {
    fn from(err: ProviderError) -> Self {
        crate::error::OrchestratorError::Provider {
            provider: "ai-approver".to_string(),
            message: err.to_string(),
        }
    }
}

//! External collaborator interfaces the engine consumes but does not
//! implement: `Profile` (domain-specific prompt/response logic) and
//! `StandardsProvider` (standards bundling/retrieval). Both are named
//! interfaces only — no concrete profile ships with this crate except
//! the deterministic test doubles used by the integration suite.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

use crate::model::{Phase, Stage};

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile error: {0}")]
    Generic(String),
}

/// The closed set of scalar types a profile may declare for a `context`
/// field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String,
    Int,
    Bool,
    Path,
    Choice(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub field_type: FieldType,
    pub required: bool,
}

/// A profile-declared schema for the opaque `context` map. Validated
/// exactly once, at `init`.
#[derive(Debug, Clone, Default)]
pub struct ContextSchema {
    pub fields: HashMap<String, FieldSchema>,
}

impl ContextSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, field_type: FieldType, required: bool) -> Self {
        self.fields.insert(name.into(), FieldSchema { field_type, required });
        self
    }

    /// Validate a `context` map against this schema. Unknown types never
    /// reach here (the closed `FieldType` enum rules them out at
    /// construction) — load-time error belongs to whoever builds a
    /// `ContextSchema` from an external description, not to this check.
    pub fn validate(&self, context: &HashMap<String, Value>) -> Result<(), ProfileError> {
        for (name, schema) in &self.fields {
            let value = context.get(name);
            match (value, schema.required) {
                (None, true) => {
                    return Err(ProfileError::Generic(format!("missing required context field '{name}'")))
                }
                (None, false) => continue,
                (Some(v), _) => Self::check_type(name, v, &schema.field_type)?,
            }
        }
        Ok(())
    }

    fn check_type(name: &str, value: &Value, field_type: &FieldType) -> Result<(), ProfileError> {
        let ok = match field_type {
            FieldType::String | FieldType::Path => value.is_string(),
            FieldType::Int => value.is_i64() || value.is_u64(),
            FieldType::Bool => value.is_boolean(),
            FieldType::Choice(choices) => value
                .as_str()
                .map(|s| choices.iter().any(|c| c == s))
                .unwrap_or(false),
        };
        if ok {
            Ok(())
        } else {
            Err(ProfileError::Generic(format!(
                "context field '{name}' does not match declared type {field_type:?}"
            )))
        }
    }
}

/// Structured request passed to `Profile::create_prompt` at
/// `CREATE_PROMPT`: phase, iteration, context, previous responses,
/// standards, and feedback.
pub struct PromptRequest<'a> {
    pub phase: Phase,
    pub iteration: u32,
    pub context: &'a HashMap<String, Value>,
    pub previous_responses: &'a [(String, String)],
    pub standards: &'a str,
    pub feedback: Option<&'a str>,
    pub suggested_content: Option<&'a str>,
}

/// Structured output from a profile's prompt generation. The engine
/// assembles this into the canonical prompt file: metadata header +
/// session artifacts + profile output + output instructions.
#[derive(Debug, Clone)]
pub struct PromptSections {
    pub title: Option<String>,
    pub body: String,
    pub output_instructions: Option<String>,
}

impl PromptSections {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            title: None,
            body: body.into(),
            output_instructions: None,
        }
    }
}

/// Outcome of `Profile::parse_review_verdict`, consulted by CHECK_VERDICT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
}

/// A plugin that knows how to generate prompts and parse responses for
/// a specific domain. Never holds a back-reference to the engine.
pub trait Profile: Send + Sync {
    fn name(&self) -> &str;

    fn context_schema(&self) -> &ContextSchema;

    /// Whether a REJECTED at a PROMPT stage may be auto-retried by
    /// asking this profile to regenerate the prompt with feedback.
    /// Defaults to false — forbidden unless a profile opts in.
    fn can_regenerate_prompts(&self) -> bool {
        false
    }

    fn create_prompt(&self, req: &PromptRequest<'_>) -> Result<PromptSections, ProfileError>;

    /// Called only at `REVIEW[RESPONSE]` approval, by CHECK_VERDICT.
    fn parse_review_verdict(&self, review_content: &str) -> Result<Verdict, ProfileError>;
}

/// Which gate a prompt/response stage belongs to, used only to keep the
/// `PromptRequest` call sites self-documenting about `Stage` without
/// adding a redundant field profiles don't need (a profile cares about
/// `Phase` + `iteration`, not which half of the iteration it's in — the
/// engine already dispatches `create_prompt` only for PROMPT stages).
pub const _PROMPT_STAGE: Stage = Stage::Prompt;

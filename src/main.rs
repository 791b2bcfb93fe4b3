//! Thin CLI front-end over the `workflow-forge` orchestration engine.
//!
//! Argument parsing and output formatting are explicitly out of scope
//! for the engine itself; this binary is a minimal, real driver of its
//! command surface. It does not embed an AI provider or a domain
//! profile — those are plugins supplied by an embedding application.
//! A real deployment links this crate as a library and registers its
//! own providers/profiles before serving the CLI or an API on top of
//! [`Orchestrator`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use workflow_forge::config::WorkflowConfigDocument;
use workflow_forge::model::Command as EngineCommand;
use workflow_forge::providers::{ManualApprovalProvider, ProviderRegistry, SkipApprovalProvider, BUILTIN_MANUAL, BUILTIN_SKIP};
use workflow_forge::session::SessionStore;
use workflow_forge::{OrchestratorError, WorkflowState};

/// Resumable, file-materialized orchestrator for AI-assisted
/// code-generation sessions.
#[derive(Parser, Debug)]
#[command(name = "workflow-forge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Root directory under which session directories live.
    #[arg(long, global = true)]
    sessions_root: Option<PathBuf>,

    /// Path to the workflow configuration document (YAML or JSON).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Create a new session and execute its first action.
    Init {
        /// Profile key to drive the session (must be registered by an
        /// embedding application; none ship with this binary).
        #[arg(long)]
        profile: String,
        /// Standards provider key (must be registered; may be empty).
        #[arg(long, default_value = "")]
        standards: String,
        /// Context as a JSON object, or `@path` to read it from a file.
        #[arg(long, default_value = "{}")]
        context: String,
    },
    /// Resolve a pending approval and auto-continue.
    Approve { session_id: String },
    /// Record rejection feedback and pause.
    Reject {
        session_id: String,
        /// Feedback explaining the rejection.
        feedback: Option<String>,
    },
    /// Re-run the last action with feedback.
    Retry {
        session_id: String,
        feedback: Option<String>,
    },
    /// Cancel a session unconditionally.
    Cancel { session_id: String },
    /// Print a session's current state (read-only).
    Status { session_id: String },
    /// List known session ids.
    List,
}

fn parse_context(raw: &str) -> Result<HashMap<String, serde_json::Value>> {
    let json = if let Some(path) = raw.strip_prefix('@') {
        std::fs::read_to_string(path).with_context(|| format!("reading context file {path}"))?
    } else {
        raw.to_string()
    };
    let value: serde_json::Value = serde_json::from_str(&json).context("context must be a JSON object")?;
    match value {
        serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
        _ => anyhow::bail!("context must be a JSON object"),
    }
}

fn print_state(state: &WorkflowState) {
    println!("session:    {}", state.session_id);
    println!("phase:      {}", state.phase);
    if let Some(stage) = state.stage {
        println!("stage:      {stage}");
    }
    println!("status:     {:?}", state.status);
    println!("iteration:  {}", state.current_iteration);
    println!("pending:    {}", state.pending_approval);
    if let Some(err) = &state.last_error {
        println!("last_error: {err}");
    }
    for message in &state.messages {
        println!("message:    {message}");
    }
}

/// Exit codes for the CLI's command surface.
fn exit_code_for(state: &WorkflowState) -> i32 {
    use workflow_forge::Status;
    match state.status {
        Status::Error => 1,
        _ => 0,
    }
}

fn exit_code_for_error(err: &OrchestratorError) -> i32 {
    match err {
        OrchestratorError::InvalidCommand { .. } => 2,
        OrchestratorError::Configuration(_) | OrchestratorError::ContextValidation(_) => 3,
        OrchestratorError::SessionNotFound(_) => 4,
        _ => 1,
    }
}

fn builtin_registry() -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry.register_approval(BUILTIN_SKIP, Arc::new(SkipApprovalProvider));
    registry.register_approval(BUILTIN_MANUAL, Arc::new(ManualApprovalProvider));
    registry
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let sessions_root = cli.sessions_root.clone().unwrap_or_else(|| {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("workflow-forge")
            .join("sessions")
    });
    let store = SessionStore::new(sessions_root.clone());

    let config = WorkflowConfigDocument::load_with_env(cli.config.as_ref())
        .context("loading workflow configuration")?;

    let registry = builtin_registry();
    let orchestrator = workflow_forge::Orchestrator::new(store, registry, config);

    info!(sessions_root = %sessions_root.display(), "workflow-forge starting");

    let outcome = match cli.command {
        Cmd::List => {
            let ids = orchestrator_list(&orchestrator)?;
            for id in ids {
                println!("{id}");
            }
            return Ok(());
        }
        Cmd::Init { profile, standards, context } => {
            let ctx = parse_context(&context)?;
            orchestrator.initialize_run(&profile, &standards, ctx).await
        }
        Cmd::Approve { session_id } => orchestrator.execute(&session_id, EngineCommand::Approve, None).await,
        Cmd::Reject { session_id, feedback } => {
            orchestrator.execute(&session_id, EngineCommand::Reject, feedback).await
        }
        Cmd::Retry { session_id, feedback } => {
            orchestrator.execute(&session_id, EngineCommand::Retry, feedback).await
        }
        Cmd::Cancel { session_id } => orchestrator.execute(&session_id, EngineCommand::Cancel, None).await,
        Cmd::Status { session_id } => orchestrator.execute(&session_id, EngineCommand::Status, None).await,
    };

    match outcome {
        Ok(state) => {
            print_state(&state);
            let code = exit_code_for(&state);
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(exit_code_for_error(&err));
        }
    }
}

fn orchestrator_list(orchestrator: &workflow_forge::Orchestrator) -> Result<Vec<String>> {
    orchestrator.list_sessions().context("listing sessions")
}

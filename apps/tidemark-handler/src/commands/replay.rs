//! Replay command - Run one stored delivery through the engine

use clap::Args;
use std::path::PathBuf;

use tidemark_reconcile::{ReconcileEngine, ReconciliationOutcome};

use super::catalog_context;
use crate::config::{HandlerConfig, PolicyKind};
use crate::error::{HandlerError, HandlerResult};

/// Arguments for the replay command
#[derive(Args)]
pub struct ReplayArgs {
    /// File holding the raw delivery body
    pub file: PathBuf,

    /// Policy to run (overrides TIDEMARK_POLICY)
    #[arg(long, value_enum)]
    pub policy: Option<PolicyKind>,
}

/// Execute the replay command
///
/// Prints the outcome summary as JSON. A failed reconciliation is returned
/// as an error so the exit code reflects it.
pub async fn execute(args: ReplayArgs, config: HandlerConfig) -> HandlerResult<()> {
    let body = tokio::fs::read(&args.file).await.map_err(|source| HandlerError::Io {
        path: args.file.display().to_string(),
        source,
    })?;

    let policy = args.policy.unwrap_or(config.policy).build();
    let engine = ReconcileEngine::new(catalog_context()?, policy);

    let outcome = engine.reconcile_raw(&body).await;
    let summary = serde_json::to_string_pretty(&outcome.summary())
        .map_err(|e| HandlerError::Internal(e.into()))?;
    println!("{summary}");

    match outcome {
        ReconciliationOutcome::Failed(e) => Err(e.into()),
        _ => Ok(()),
    }
}

//! Serve command - Run the webhook receiver

use clap::Args;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

use tidemark_reconcile::ReconcileEngine;

use super::catalog_context;
use crate::config::{HandlerConfig, PolicyKind};
use crate::error::{HandlerError, HandlerResult};
use crate::routes::{router, AppState};

/// Arguments for the serve command
#[derive(Args)]
pub struct ServeArgs {
    /// Listen address (overrides TIDEMARK_LISTEN_ADDR)
    #[arg(long)]
    pub listen_addr: Option<SocketAddr>,

    /// Policy to run (overrides TIDEMARK_POLICY)
    #[arg(long, value_enum)]
    pub policy: Option<PolicyKind>,
}

/// Execute the serve command
pub async fn execute(args: ServeArgs, config: HandlerConfig) -> HandlerResult<()> {
    let listen_addr = args.listen_addr.unwrap_or(config.listen_addr);
    let policy = args.policy.unwrap_or(config.policy).build();

    let engine = ReconcileEngine::new(catalog_context()?, policy);
    info!(
        %listen_addr,
        policy = engine.policy_name(),
        signing_secret = config.signing_secret.is_some(),
        "Starting webhook receiver"
    );
    let app = router(AppState::new(engine, config.signing_secret));

    let listener = TcpListener::bind(listen_addr)
        .await
        .map_err(|e| HandlerError::Internal(anyhow::anyhow!("Failed to bind {listen_addr}: {e}")))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| HandlerError::Internal(anyhow::anyhow!("Server error: {e}")))?;

    info!("Webhook receiver stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Unable to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

//! CLI subcommands.

pub mod annotate;
pub mod provision;
pub mod replay;
pub mod serve;
pub mod sources;
pub mod star;

use std::sync::Arc;
use tracing::info;

use tidemark_catalog::{AtlanGateway, CatalogConfig, EntityGateway};
use tidemark_reconcile::{ReconcileConfig, ReconcileContext};

use crate::error::HandlerResult;

/// Build the process-wide context against the configured catalog tenant.
pub fn catalog_context() -> HandlerResult<Arc<ReconcileContext>> {
    let catalog_config = CatalogConfig::from_env()?;
    let reconcile_config = ReconcileConfig::from_env()?;
    info!(
        base_url = %catalog_config.base_url,
        call_timeout = ?reconcile_config.call_timeout,
        not_found_rechecks = reconcile_config.not_found_rechecks,
        "Connecting to catalog"
    );

    let gateway: Arc<dyn EntityGateway> = Arc::new(AtlanGateway::new(catalog_config)?);
    Ok(Arc::new(ReconcileContext::new(gateway, reconcile_config)))
}

//! Provision command - Deploy the branded custom metadata definitions

use clap::Args;
use tracing::info;

use tidemark_reconcile::schemas::{daap_definition, quality_data_definition, quality_rating_enum};

use super::catalog_context;
use crate::error::HandlerResult;

/// Arguments for the provision command
#[derive(Args)]
pub struct ProvisionArgs {
    /// Also provision the completeness score definition
    #[arg(long)]
    pub with_score: bool,
}

/// Execute the provision command
///
/// Safe to run repeatedly: existing definitions are reused.
pub async fn execute(args: ProvisionArgs) -> HandlerResult<()> {
    let ctx = catalog_context()?;
    let provisioner = ctx.provisioner();

    let rating = provisioner.ensure_enum(&quality_rating_enum()).await?;
    println!("Enumeration {} ({})", rating.name, rating.values.join(", "));

    let quality = provisioner.ensure_schema(&quality_data_definition()).await?;
    println!("Custom metadata {} ({})", quality.name, quality.id);

    if args.with_score {
        let score = provisioner.ensure_schema(&daap_definition()).await?;
        println!("Custom metadata {} ({})", score.name, score.id);
    }

    info!("Provisioning complete");
    Ok(())
}

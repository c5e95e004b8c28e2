//! Star command - Star a glossary's terms for every member of a group

use clap::Args;

use tidemark_reconcile::star_glossary_terms;

use super::catalog_context;
use crate::error::HandlerResult;

/// Arguments for the star command
#[derive(Args)]
pub struct StarArgs {
    /// Name of the glossary whose terms are starred
    #[arg(long)]
    pub glossary: String,

    /// Name of the group whose members star the terms
    #[arg(long)]
    pub group: String,
}

/// Execute the star command
///
/// Safe to run repeatedly: terms every member has starred are not written.
pub async fn execute(args: StarArgs) -> HandlerResult<()> {
    let ctx = catalog_context()?;

    let summary = star_glossary_terms(&ctx, &args.glossary, &args.group).await?;

    println!(
        "Glossary {}: {} of {} terms updated, {} stars added for {} members",
        summary.glossary, summary.terms_updated, summary.terms, summary.stars_added, summary.members
    );
    Ok(())
}

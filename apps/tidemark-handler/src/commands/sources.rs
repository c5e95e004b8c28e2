//! Verified-sources command - List verified upstream sources per asset

use clap::Args;

use tidemark_reconcile::sources::DEFAULT_CONSUMER_TYPE;
use tidemark_reconcile::{verified_sources_by_type, SourceReport};

use super::catalog_context;
use crate::error::{HandlerError, HandlerResult};

/// Arguments for the verified-sources command
#[derive(Args)]
pub struct SourcesArgs {
    /// Type of the downstream assets to check
    #[arg(long = "type", default_value = DEFAULT_CONSUMER_TYPE)]
    pub type_name: String,

    /// Print the reports as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the verified-sources command
pub async fn execute(args: SourcesArgs) -> HandlerResult<()> {
    let ctx = catalog_context()?;

    let reports = verified_sources_by_type(&ctx, &args.type_name).await?;

    if args.json {
        let rendered = serde_json::to_string_pretty(&reports)
            .map_err(|e| HandlerError::Internal(e.into()))?;
        println!("{rendered}");
    } else {
        for report in &reports {
            println!("{}", render(report));
        }
    }
    Ok(())
}

fn render(report: &SourceReport) -> String {
    let asset = &report.asset;
    let label = asset.name.as_deref().unwrap_or(&asset.guid);
    if !report.has_verified_sources() {
        return format!(
            "{} '{label}' ({}) has no verified upstream sources",
            asset.type_name, asset.guid
        );
    }

    let mut lines = vec![format!(
        "{} '{label}' ({}) has verified upstream sources:",
        asset.type_name, asset.guid
    )];
    for source in &report.verified_sources {
        lines.push(format!(
            "  - {}: {}",
            source.type_name,
            source.qualified_name.as_deref().unwrap_or(&source.guid)
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidemark_catalog::EntityRef;

    #[test]
    fn test_render() {
        let mut report = SourceReport {
            asset: EntityRef::new("wb-1", "SigmaWorkbook").with_name("Revenue"),
            verified_sources: vec![EntityRef::new("t-1", "Table")
                .with_qualified_name("default/snowflake/1686000000/RAW/SALES/ORDERS")],
        };
        assert_eq!(
            render(&report),
            "SigmaWorkbook 'Revenue' (wb-1) has verified upstream sources:\n  - Table: default/snowflake/1686000000/RAW/SALES/ORDERS"
        );

        report.verified_sources.clear();
        assert_eq!(
            render(&report),
            "SigmaWorkbook 'Revenue' (wb-1) has no verified upstream sources"
        );
    }
}

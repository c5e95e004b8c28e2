//! Annotate command - Record quality results on an asset

use clap::Args;

use tidemark_catalog::Projection;
use tidemark_reconcile::schemas::QualityRating;
use tidemark_reconcile::{annotate_quality, find_asset, QualityReport};

use super::catalog_context;
use crate::error::{HandlerError, HandlerResult};

/// Arguments for the annotate command
#[derive(Args)]
pub struct AnnotateArgs {
    /// Connector type of the asset's connection, e.g. snowflake
    #[arg(long)]
    pub connector: String,

    /// Name of the asset's connection
    #[arg(long)]
    pub connection: String,

    /// Remainder of the asset's qualified name, e.g. DB/SCHEMA/TABLE
    #[arg(long)]
    pub asset: String,

    /// Overall rating: Poor, OK or Great
    #[arg(long, value_parser = parse_rating)]
    pub rating: QualityRating,

    /// Number of checks that passed
    #[arg(long, default_value_t = 0)]
    pub passed: u32,

    /// Number of checks that failed
    #[arg(long, default_value_t = 0)]
    pub failed: u32,

    /// Link to a detailed report (repeatable)
    #[arg(long = "report")]
    pub reports: Vec<String>,
}

fn parse_rating(value: &str) -> Result<QualityRating, String> {
    QualityRating::parse(value).ok_or_else(|| format!("'{value}' is not one of Poor, OK, Great"))
}

/// Execute the annotate command
pub async fn execute(args: AnnotateArgs) -> HandlerResult<()> {
    let ctx = catalog_context()?;

    let asset = find_asset(
        &ctx,
        &args.connector,
        &args.connection,
        &args.asset,
        Projection::default(),
    )
    .await?
    .ok_or_else(|| {
        HandlerError::InvalidInput(format!(
            "no asset {} in {} connection {}",
            args.asset, args.connector, args.connection
        ))
    })?;

    let report = QualityReport {
        rating: args.rating,
        passed: args.passed,
        failed: args.failed,
        reports: args.reports,
    };
    let updated = annotate_quality(&ctx, asset.reference(), &report).await?;

    println!(
        "Annotated {} ({}) as {}",
        updated.qualified_name.as_deref().unwrap_or(&updated.guid),
        updated.type_name,
        report.rating.as_str()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rating() {
        assert_eq!(parse_rating("great"), Ok(QualityRating::Great));
        assert!(parse_rating("Excellent").unwrap_err().contains("Poor, OK, Great"));
    }
}

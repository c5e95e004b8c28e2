//! Quality annotations written from outside the event flow.
//!
//! Locates an asset by connection and path, then merges a quality report
//! into its `Quality Data` custom metadata.

use serde_json::Value;
use tracing::{info, instrument};

use tidemark_catalog::{
    search_fields, ChangeSet, EntityGateway, EntityRef, EntitySnapshot, Projection,
    RegisteredSchema, SearchQuery,
};

use crate::context::{bounded, ReconcileContext};
use crate::error::{ReconcileError, ReconcileResult};
use crate::schemas::{
    quality_data_definition, quality_rating_enum, QualityRating, QUALITY_FAILED, QUALITY_PASSED,
    QUALITY_RATING, QUALITY_REPORTS,
};

const CONNECTION_TYPE: &str = "Connection";

/// Results of a quality run against one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityReport {
    pub rating: QualityRating,
    pub passed: u32,
    pub failed: u32,
    pub reports: Vec<String>,
}

/// Find an asset given its connector, connection name and the remainder of
/// its qualified name.
///
/// Every connection with that name is considered; the first match wins.
#[instrument(skip(ctx, projection))]
pub async fn find_asset(
    ctx: &ReconcileContext,
    connector_type: &str,
    connection_name: &str,
    asset_path: &str,
    projection: Projection,
) -> ReconcileResult<Option<EntitySnapshot>> {
    let timeout = ctx.config().call_timeout;
    let gateway = ctx.gateway();

    let connections = search(
        gateway,
        timeout,
        &SearchQuery::new()
            .type_name(CONNECTION_TYPE)
            .term(search_fields::NAME, connection_name)
            .term(search_fields::CONNECTOR_NAME, connector_type),
    )
    .await?;

    let candidates: Vec<String> = connections
        .iter()
        .filter_map(EntitySnapshot::qualified_name)
        .map(|qn| format!("{qn}/{}", asset_path.trim_start_matches('/')))
        .collect();
    if candidates.is_empty() {
        info!("No matching connection");
        return Ok(None);
    }

    let mut found = search(
        gateway,
        timeout,
        &SearchQuery::new()
            .terms(search_fields::QUALIFIED_NAME, candidates)
            .page(0, 1)
            .with_projection(projection),
    )
    .await?;
    Ok(if found.is_empty() {
        None
    } else {
        Some(found.swap_remove(0))
    })
}

/// Merge a quality report into an asset, provisioning the definition first.
#[instrument(skip(ctx, report), fields(guid = %asset.guid))]
pub async fn annotate_quality(
    ctx: &ReconcileContext,
    asset: &EntityRef,
    report: &QualityReport,
) -> ReconcileResult<EntityRef> {
    ctx.provisioner().ensure_enum(&quality_rating_enum()).await?;
    let schema = ctx
        .provisioner()
        .ensure_schema(&quality_data_definition())
        .await?;

    let change = quality_change(&schema, asset, report)?;
    let updated = bounded(
        ctx.config().call_timeout,
        "merge_upsert",
        ctx.gateway().merge_upsert(&change),
    )
    .await
    .map_err(|e| ReconcileError::catalog("merge_upsert", e))?;

    info!(rating = report.rating.as_str(), "Quality annotation written");
    Ok(updated)
}

fn quality_change(
    schema: &RegisteredSchema,
    asset: &EntityRef,
    report: &QualityReport,
) -> ReconcileResult<ChangeSet> {
    let key = |attribute: &str| {
        schema
            .key(attribute)
            .map_err(|e| ReconcileError::catalog("resolve_attribute", e))
    };
    let reports: Vec<Value> = report.reports.iter().cloned().map(Value::String).collect();

    Ok(ChangeSet::for_entity(asset)
        .set_custom_metadata(&key(QUALITY_RATING)?, report.rating.as_str())
        .set_custom_metadata(&key(QUALITY_PASSED)?, report.passed)
        .set_custom_metadata(&key(QUALITY_FAILED)?, report.failed)
        .set_custom_metadata(&key(QUALITY_REPORTS)?, reports))
}

async fn search(
    gateway: &dyn EntityGateway,
    timeout: std::time::Duration,
    query: &SearchQuery,
) -> ReconcileResult<Vec<EntitySnapshot>> {
    bounded(timeout, "search_entities", gateway.search_entities(query))
        .await
        .map_err(|e| ReconcileError::catalog("search_entities", e))
}

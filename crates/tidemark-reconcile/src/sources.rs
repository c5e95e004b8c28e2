//! Verified upstream sources of downstream assets.
//!
//! For each active asset of a given type, walks lineage upstream and keeps
//! the tables, views and materialised views that carry a VERIFIED
//! certificate.

use serde::Serialize;
use tracing::{info, instrument};

use tidemark_catalog::{
    AssetField, CertificateStatus, EntityRef, EntitySnapshot, LineageFilter, LineageRequest,
    Projection, SearchQuery,
};

use crate::context::{bounded, ReconcileContext};
use crate::error::{ReconcileError, ReconcileResult};

/// Asset type whose sources are reported when none is given.
pub const DEFAULT_CONSUMER_TYPE: &str = "SigmaWorkbook";

const SOURCE_TYPES: [&str; 3] = ["Table", "View", "MaterialisedView"];
const PAGE_SIZE: usize = 100;

/// Verified sources found upstream of one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub asset: EntityRef,
    pub verified_sources: Vec<EntityRef>,
}

impl SourceReport {
    pub fn has_verified_sources(&self) -> bool {
        !self.verified_sources.is_empty()
    }
}

/// Every verified table, view or materialised view upstream of `guid`.
#[instrument(skip(ctx))]
pub async fn verified_upstream_sources(
    ctx: &ReconcileContext,
    guid: &str,
) -> ReconcileResult<Vec<EntityRef>> {
    let timeout = ctx.config().call_timeout;
    let mut sources = Vec::new();
    let mut from = 0;
    loop {
        let request = LineageRequest::upstream(guid)
            .page(from, PAGE_SIZE)
            .filter(LineageFilter::Contains {
                field: AssetField::CertificateStatus,
                value: CertificateStatus::Verified.as_str().to_string(),
            })
            .with_projection(Projection::new([
                AssetField::Name,
                AssetField::CertificateStatus,
            ]));
        let reached = bounded(timeout, "lineage_list", ctx.gateway().lineage_list(&request))
            .await
            .map_err(|e| ReconcileError::catalog("lineage_list", e))?;
        let page_len = reached.len();

        sources.extend(
            reached
                .iter()
                .filter(|e| SOURCE_TYPES.contains(&e.type_name()))
                .map(EntitySnapshot::reference)
                .cloned(),
        );

        if page_len < PAGE_SIZE {
            break;
        }
        from += page_len;
    }
    Ok(sources)
}

/// Report verified upstream sources for every active asset of a type.
#[instrument(skip(ctx))]
pub async fn verified_sources_by_type(
    ctx: &ReconcileContext,
    type_name: &str,
) -> ReconcileResult<Vec<SourceReport>> {
    let timeout = ctx.config().call_timeout;
    let mut reports = Vec::new();
    let mut from = 0;
    loop {
        let query = SearchQuery::new()
            .type_name(type_name)
            .page(from, PAGE_SIZE)
            .with_projection(Projection::new([AssetField::Name]));
        let assets = bounded(timeout, "search_entities", ctx.gateway().search_entities(&query))
            .await
            .map_err(|e| ReconcileError::catalog("search_entities", e))?;
        let page_len = assets.len();

        for asset in &assets {
            let verified_sources = verified_upstream_sources(ctx, asset.guid()).await?;
            info!(
                guid = %asset.guid(),
                sources = verified_sources.len(),
                "Checked upstream sources"
            );
            reports.push(SourceReport {
                asset: asset.reference().clone(),
                verified_sources,
            });
        }

        if page_len < PAGE_SIZE {
            break;
        }
        from += page_len;
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconcileConfig;
    use std::sync::Arc;
    use tidemark_catalog::InMemoryCatalog;

    fn asset(guid: &str, type_name: &str, status: &str) -> EntitySnapshot {
        EntitySnapshot::new(
            EntityRef::new(guid, type_name).with_qualified_name(format!("default/x/{guid}")),
        )
        .with_attribute(AssetField::Name, guid)
        .with_attribute(AssetField::CertificateStatus, status)
    }

    /// Two workbooks: one fed by a verified table through a process and a
    /// verified dashboard, one fed only by a draft view.
    fn seeded() -> ReconcileContext {
        let catalog = Arc::new(InMemoryCatalog::new());
        for snapshot in [
            asset("wb-1", DEFAULT_CONSUMER_TYPE, "DRAFT"),
            asset("wb-2", DEFAULT_CONSUMER_TYPE, "VERIFIED"),
            asset("dash-1", "TableauDashboard", "VERIFIED"),
            asset("proc-1", "Process", "VERIFIED"),
            asset("t-1", "Table", "VERIFIED"),
            asset("v-1", "View", "DRAFT"),
        ] {
            catalog.insert_entity(snapshot);
        }
        catalog.add_lineage("dash-1", "wb-1");
        catalog.add_lineage("proc-1", "dash-1");
        catalog.add_lineage("t-1", "proc-1");
        catalog.add_lineage("v-1", "wb-2");
        ReconcileContext::new(catalog, ReconcileConfig::immediate())
    }

    #[tokio::test]
    async fn test_keeps_only_verified_source_types() {
        let ctx = seeded();

        let sources = verified_upstream_sources(&ctx, "wb-1").await.unwrap();

        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].guid, "t-1");
        assert_eq!(sources[0].qualified_name.as_deref(), Some("default/x/t-1"));
    }

    #[tokio::test]
    async fn test_reports_every_asset_of_the_type() {
        let ctx = seeded();

        let reports = verified_sources_by_type(&ctx, DEFAULT_CONSUMER_TYPE)
            .await
            .unwrap();

        assert_eq!(reports.len(), 2);
        let wb1 = reports.iter().find(|r| r.asset.guid == "wb-1").unwrap();
        let wb2 = reports.iter().find(|r| r.asset.guid == "wb-2").unwrap();
        assert!(wb1.has_verified_sources());
        assert!(!wb2.has_verified_sources());
    }

    #[tokio::test]
    async fn test_missing_start_fails() {
        let ctx = seeded();
        let err = verified_upstream_sources(&ctx, "gone").await.unwrap_err();
        assert!(matches!(err, ReconcileError::Catalog { operation: "lineage_list", .. }));
        assert!(!err.is_transient());
    }
}

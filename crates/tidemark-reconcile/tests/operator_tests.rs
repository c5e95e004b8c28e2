//! Operator command tests: starring glossary terms and verified sources.

mod common;

use serde_json::json;
use std::sync::Arc;

use common::TestCatalog;
use tidemark_catalog::{AssetField, EntityGateway, EntityRef, EntitySnapshot};
use tidemark_reconcile::{
    star_glossary_terms, verified_sources_by_type, ReconcileConfig, ReconcileContext,
    ReconcileError,
};

const GLOSSARY_QN: &str = "gls-metrics-7Hq2";

fn context(catalog: &Arc<TestCatalog>) -> ReconcileContext {
    let gateway: Arc<dyn EntityGateway> = catalog.clone();
    ReconcileContext::new(gateway, ReconcileConfig::immediate())
}

fn glossary_term(guid: &str, name: &str, starred_by: &[&str]) -> EntitySnapshot {
    let details: Vec<serde_json::Value> = starred_by
        .iter()
        .map(|u| json!({ "assetStarredBy": u, "assetStarredAt": 1_686_000_000_000_i64 }))
        .collect();
    EntitySnapshot::new(
        EntityRef::new(guid, "AtlasGlossaryTerm")
            .with_qualified_name(format!("{guid}@{GLOSSARY_QN}"))
            .with_name(name),
    )
    .with_attribute(AssetField::Name, name)
    .with_attribute(AssetField::Description, format!("{name} as reported to finance"))
    .with_attribute(
        AssetField::Anchor,
        json!({ "typeName": "AtlasGlossary", "uniqueAttributes": { "qualifiedName": GLOSSARY_QN } }),
    )
    .with_attribute(AssetField::StarredBy, json!(starred_by))
    .with_attribute(AssetField::StarredCount, starred_by.len())
    .with_attribute(AssetField::StarredDetailsList, details)
}

/// Metrics glossary with two terms, one already starred by jsmith, plus a
/// term in another glossary and an Admins group of two.
fn metrics_catalog() -> Arc<TestCatalog> {
    let catalog = Arc::new(TestCatalog::new());
    catalog.inner.insert_entity(
        EntitySnapshot::new(
            EntityRef::new("gls-1", "AtlasGlossary")
                .with_qualified_name(GLOSSARY_QN)
                .with_name("Metrics"),
        )
        .with_attribute(AssetField::Name, "Metrics"),
    );
    catalog
        .inner
        .insert_entity(glossary_term("term-1", "Revenue", &["jsmith"]));
    catalog.inner.insert_entity(glossary_term("term-2", "Churn", &[]));
    catalog.inner.insert_entity(
        EntitySnapshot::new(EntityRef::new("term-9", "AtlasGlossaryTerm").with_name("Other"))
            .with_attribute(
                AssetField::Anchor,
                json!({ "typeName": "AtlasGlossary", "uniqueAttributes": { "qualifiedName": "gls-other" } }),
            ),
    );
    catalog.inner.insert_group("Admins", ["jsmith", "achen"]);
    catalog
}

fn starred_by(catalog: &TestCatalog, guid: &str) -> serde_json::Value {
    catalog
        .inner
        .entity(guid)
        .and_then(|e| e.get(AssetField::StarredBy).cloned())
        .unwrap_or_default()
}

// =============================================================================
// Starring
// =============================================================================

#[tokio::test]
async fn test_stars_every_term_for_every_member() {
    let catalog = metrics_catalog();
    let ctx = context(&catalog);

    let summary = star_glossary_terms(&ctx, "Metrics", "Admins").await.unwrap();

    assert_eq!(summary.members, 2);
    assert_eq!(summary.terms, 2);
    assert_eq!(summary.terms_updated, 2);
    assert_eq!(summary.stars_added, 3);
    assert_eq!(starred_by(&catalog, "term-1"), json!(["jsmith", "achen"]));
    assert_eq!(starred_by(&catalog, "term-2"), json!(["jsmith", "achen"]));

    let revenue = catalog.inner.entity("term-1").unwrap();
    assert_eq!(revenue.get(AssetField::StarredCount), Some(&json!(2)));
    assert_eq!(
        revenue.get(AssetField::StarredDetailsList).unwrap()[0]["assetStarredAt"],
        1_686_000_000_000_i64
    );
    assert_eq!(
        revenue.text(AssetField::Description),
        Some("Revenue as reported to finance")
    );
    assert!(catalog.inner.entity("term-9").unwrap().get(AssetField::StarredBy).is_none());
}

#[tokio::test]
async fn test_rerun_writes_nothing() {
    let catalog = metrics_catalog();
    let ctx = context(&catalog);

    star_glossary_terms(&ctx, "Metrics", "Admins").await.unwrap();
    assert_eq!(catalog.upsert_calls(), 2);

    let summary = star_glossary_terms(&ctx, "Metrics", "Admins").await.unwrap();

    assert_eq!(summary.terms, 2);
    assert_eq!(summary.terms_updated, 0);
    assert_eq!(summary.stars_added, 0);
    assert_eq!(catalog.upsert_calls(), 2);
}

#[tokio::test]
async fn test_star_patch_is_trimmed_to_star_fields() {
    let catalog = metrics_catalog();
    let ctx = context(&catalog);

    star_glossary_terms(&ctx, "Metrics", "Admins").await.unwrap();

    for change in catalog.inner.upserts() {
        let mut names = change.changed_names();
        names.sort();
        assert_eq!(names, vec!["starredBy", "starredCount", "starredDetailsList"]);
        assert!(change.target().qualified_name.is_some());
    }
}

#[tokio::test]
async fn test_unknown_group_writes_nothing() {
    let catalog = metrics_catalog();
    let ctx = context(&catalog);

    let err = star_glossary_terms(&ctx, "Metrics", "Stewards").await.unwrap_err();

    assert!(matches!(err, ReconcileError::Missing { kind: "group", ref name } if name == "Stewards"));
    assert!(!err.is_transient());
    assert_eq!(catalog.upsert_calls(), 0);
}

#[tokio::test]
async fn test_unknown_glossary_writes_nothing() {
    let catalog = metrics_catalog();
    let ctx = context(&catalog);

    let err = star_glossary_terms(&ctx, "Finance", "Admins").await.unwrap_err();

    assert!(matches!(err, ReconcileError::Missing { kind: "glossary", .. }));
    assert_eq!(catalog.upsert_calls(), 0);
}

// =============================================================================
// Verified Sources
// =============================================================================

#[tokio::test]
async fn test_verified_sources_are_read_only() {
    let catalog = Arc::new(TestCatalog::new());
    for (guid, type_name, status) in [
        ("wb-1", "SigmaWorkbook", "DRAFT"),
        ("mv-1", "MaterialisedView", "VERIFIED"),
        ("t-1", "Table", "DEPRECATED"),
    ] {
        catalog.inner.insert_entity(
            EntitySnapshot::new(EntityRef::new(guid, type_name))
                .with_attribute(AssetField::CertificateStatus, status),
        );
    }
    catalog.inner.add_lineage("t-1", "mv-1");
    catalog.inner.add_lineage("mv-1", "wb-1");
    let ctx = context(&catalog);

    let reports = verified_sources_by_type(&ctx, "SigmaWorkbook").await.unwrap();

    assert_eq!(reports.len(), 1);
    let sources: Vec<&str> = reports[0]
        .verified_sources
        .iter()
        .map(|s| s.guid.as_str())
        .collect();
    assert_eq!(sources, vec!["mv-1"]);
    assert_eq!(catalog.upsert_calls(), 0);
}

//! Custom metadata provisioning under concurrency.

mod common;

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

use common::TestCatalog;
use tidemark_catalog::EntityGateway;
use tidemark_reconcile::schemas::{daap_definition, DAAP};
use tidemark_reconcile::{ReconcileError, SchemaProvisioner};

const CALL_TIMEOUT: Duration = Duration::from_secs(5);

fn provisioner(catalog: &Arc<TestCatalog>) -> SchemaProvisioner {
    let gateway: Arc<dyn EntityGateway> = catalog.clone();
    SchemaProvisioner::new(gateway, CALL_TIMEOUT)
}

// =============================================================================
// Convergence
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_processes_converge_on_one_definition() {
    const RACERS: usize = 4;
    let catalog = Arc::new(TestCatalog::new().with_lookup_race(RACERS));

    // One provisioner per simulated process, so nothing is shared in memory.
    let mut tasks = JoinSet::new();
    for _ in 0..RACERS {
        let provisioner = provisioner(&catalog);
        tasks.spawn(async move { provisioner.ensure_schema(&daap_definition()).await });
    }

    let mut ids = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let schema = joined.unwrap().unwrap();
        ids.push(schema.id.clone());
    }

    assert_eq!(ids.len(), RACERS);
    assert!(ids.iter().all(|id| *id == ids[0]));
    assert_eq!(catalog.create_calls(), RACERS);
    assert_eq!(catalog.conflicts(), RACERS - 1);
    assert_eq!(catalog.inner.schema_creations(), 1);
    // Only the winner decorates the definition.
    assert_eq!(catalog.badge_calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_share_one_initialization() {
    let catalog = Arc::new(TestCatalog::new());
    let provisioner = Arc::new(provisioner(&catalog));

    let mut tasks = JoinSet::new();
    for _ in 0..8 {
        let provisioner = Arc::clone(&provisioner);
        tasks.spawn(async move { provisioner.ensure_schema(&daap_definition()).await });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.unwrap().unwrap();
    }

    assert_eq!(catalog.lookup_calls(), 1);
    assert_eq!(catalog.create_calls(), 1);
    assert!(provisioner.cached_schema(DAAP).await.is_some());
}

// =============================================================================
// Partial Failures
// =============================================================================

#[tokio::test]
async fn test_badge_failure_does_not_fail_provisioning() {
    let catalog = Arc::new(TestCatalog::new());
    catalog.fail_badges();

    let schema = provisioner(&catalog)
        .ensure_schema(&daap_definition())
        .await
        .unwrap();

    assert_eq!(schema.name, DAAP);
    assert_eq!(catalog.badge_calls(), 1);
    assert!(catalog.inner.badges().is_empty());
}

#[tokio::test]
async fn test_conflict_without_readable_winner_is_transient() {
    let catalog = Arc::new(TestCatalog::new());
    catalog.inner.register_schema(&daap_definition());
    catalog.hide_schemas_from_lookup();
    let provisioner = provisioner(&catalog);

    let err = provisioner
        .ensure_schema(&daap_definition())
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::Provisioning { ref name, .. } if name == DAAP));
    assert!(err.is_transient());
    assert_eq!(catalog.conflicts(), 1);
    assert_eq!(catalog.lookup_calls(), 2);
    assert!(provisioner.cached_schema(DAAP).await.is_none());
}

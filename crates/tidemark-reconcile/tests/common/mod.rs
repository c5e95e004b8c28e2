//! Shared fixtures for reconciliation tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;

use tidemark_catalog::{
    BadgeSpec, CatalogError, CatalogResult, ChangeSet, EntityGateway, EntityRef, EntitySnapshot,
    EnumDefinition, InMemoryCatalog, LineageRequest, Projection, RegisteredEnum,
    RegisteredSchema, SchemaDefinition, SearchQuery,
};
use tidemark_reconcile::{Policy, ReconcileConfig, ReconcileContext, ReconcileEngine};

// =============================================================================
// Instrumented Catalog
// =============================================================================

/// Behavior of the next writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteBehavior {
    Success,
    Unavailable,
    Rejected,
}

impl WriteBehavior {
    fn code(self) -> usize {
        match self {
            WriteBehavior::Success => 0,
            WriteBehavior::Unavailable => 1,
            WriteBehavior::Rejected => 2,
        }
    }

    fn error(code: usize) -> Option<CatalogError> {
        match code {
            1 => Some(CatalogError::Unavailable {
                status: 503,
                message: "catalog maintenance".to_string(),
            }),
            2 => Some(CatalogError::InvalidRequest {
                status: 400,
                message: "rejected by catalog".to_string(),
            }),
            _ => None,
        }
    }
}

/// In-memory catalog that counts calls and can be told to misbehave.
pub struct TestCatalog {
    pub inner: InMemoryCatalog,
    fetch_calls: AtomicUsize,
    search_calls: AtomicUsize,
    upsert_calls: AtomicUsize,
    lookup_calls: AtomicUsize,
    create_calls: AtomicUsize,
    conflicts: AtomicUsize,
    badge_calls: AtomicUsize,
    hidden_fetches: AtomicUsize,
    fetch_delay_ms: AtomicU64,
    upsert_behavior: AtomicUsize,
    create_behavior: AtomicUsize,
    fail_badges: AtomicBool,
    /// Definitions that exist remotely yet never show up in lookups.
    invisible_schemas: AtomicBool,
    lookup_race: Option<(Barrier, usize)>,
}

impl TestCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: InMemoryCatalog::new(),
            fetch_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            upsert_calls: AtomicUsize::new(0),
            lookup_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            conflicts: AtomicUsize::new(0),
            badge_calls: AtomicUsize::new(0),
            hidden_fetches: AtomicUsize::new(0),
            fetch_delay_ms: AtomicU64::new(0),
            upsert_behavior: AtomicUsize::new(0),
            create_behavior: AtomicUsize::new(0),
            fail_badges: AtomicBool::new(false),
            invisible_schemas: AtomicBool::new(false),
            lookup_race: None,
        }
    }

    /// Hold the first `racers` lookups until all of them have answered, so
    /// every racer sees the definition as missing and tries to create it.
    #[must_use]
    pub fn with_lookup_race(mut self, racers: usize) -> Self {
        self.lookup_race = Some((Barrier::new(racers), racers));
        self
    }

    /// Report the entity as missing for the next `count` fetches.
    pub fn hide_next_fetches(&self, count: usize) {
        self.hidden_fetches.store(count, Ordering::SeqCst);
    }

    pub fn delay_fetches(&self, delay: Duration) {
        self.fetch_delay_ms
            .store(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX), Ordering::SeqCst);
    }

    pub fn set_upsert_behavior(&self, behavior: WriteBehavior) {
        self.upsert_behavior.store(behavior.code(), Ordering::SeqCst);
    }

    pub fn set_create_behavior(&self, behavior: WriteBehavior) {
        self.create_behavior.store(behavior.code(), Ordering::SeqCst);
    }

    pub fn fail_badges(&self) {
        self.fail_badges.store(true, Ordering::SeqCst);
    }

    pub fn hide_schemas_from_lookup(&self) {
        self.invisible_schemas.store(true, Ordering::SeqCst);
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn conflicts(&self) -> usize {
        self.conflicts.load(Ordering::SeqCst)
    }

    pub fn badge_calls(&self) -> usize {
        self.badge_calls.load(Ordering::SeqCst)
    }

    /// Total calls of any kind.
    pub fn total_calls(&self) -> usize {
        self.fetch_calls()
            + self.search_calls()
            + self.upsert_calls()
            + self.lookup_calls()
            + self.create_calls()
            + self.badge_calls()
    }
}

#[async_trait]
impl EntityGateway for TestCatalog {
    async fn fetch_entity(
        &self,
        reference: &EntityRef,
        projection: &Projection,
    ) -> CatalogResult<Option<EntitySnapshot>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.fetch_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        let hidden = self
            .hidden_fetches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if hidden {
            return Ok(None);
        }
        self.inner.fetch_entity(reference, projection).await
    }

    async fn search_entities(&self, query: &SearchQuery) -> CatalogResult<Vec<EntitySnapshot>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.search_entities(query).await
    }

    async fn lineage_list(&self, request: &LineageRequest) -> CatalogResult<Vec<EntitySnapshot>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.lineage_list(request).await
    }

    async fn group_members(&self, group: &str) -> CatalogResult<Option<Vec<String>>> {
        self.inner.group_members(group).await
    }

    async fn merge_upsert(&self, change_set: &ChangeSet) -> CatalogResult<EntityRef> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = WriteBehavior::error(self.upsert_behavior.load(Ordering::SeqCst)) {
            return Err(err);
        }
        self.inner.merge_upsert(change_set).await
    }

    async fn lookup_schema_by_name(&self, name: &str) -> CatalogResult<Option<RegisteredSchema>> {
        let index = self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        let found = if self.invisible_schemas.load(Ordering::SeqCst) {
            None
        } else {
            self.inner.lookup_schema_by_name(name).await?
        };
        if let Some((barrier, racers)) = &self.lookup_race {
            if index < *racers {
                barrier.wait().await;
            }
        }
        Ok(found)
    }

    async fn create_schema(&self, definition: &SchemaDefinition) -> CatalogResult<RegisteredSchema> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = WriteBehavior::error(self.create_behavior.load(Ordering::SeqCst)) {
            return Err(err);
        }
        let created = self.inner.create_schema(definition).await;
        if matches!(&created, Err(e) if e.is_conflict()) {
            self.conflicts.fetch_add(1, Ordering::SeqCst);
        }
        created
    }

    async fn create_display_artifact(
        &self,
        schema: &RegisteredSchema,
        badge: &BadgeSpec,
    ) -> CatalogResult<String> {
        self.badge_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_badges.load(Ordering::SeqCst) {
            return Err(CatalogError::Forbidden {
                message: "badges require admin".to_string(),
            });
        }
        self.inner.create_display_artifact(schema, badge).await
    }

    async fn lookup_enum_by_name(&self, name: &str) -> CatalogResult<Option<RegisteredEnum>> {
        self.inner.lookup_enum_by_name(name).await
    }

    async fn create_enum(&self, definition: &EnumDefinition) -> CatalogResult<RegisteredEnum> {
        self.inner.create_enum(definition).await
    }
}

// =============================================================================
// Helpers
// =============================================================================

pub fn engine_for(catalog: &Arc<TestCatalog>, policy: Arc<dyn Policy>) -> ReconcileEngine {
    engine_with_config(catalog, policy, ReconcileConfig::immediate())
}

pub fn engine_with_config(
    catalog: &Arc<TestCatalog>,
    policy: Arc<dyn Policy>,
    config: ReconcileConfig,
) -> ReconcileEngine {
    let gateway: Arc<dyn EntityGateway> = catalog.clone();
    ReconcileEngine::new(Arc::new(ReconcileContext::new(gateway, config)), policy)
}

/// Raw delivery body for an entity notification.
pub fn entity_event(guid: &str, type_name: &str, qualified_name: &str, operation: &str) -> Vec<u8> {
    json!({
        "source": {},
        "version": { "version": "1.0.0", "versionParts": [1] },
        "msgCreationTime": 1_686_224_785_123_i64,
        "payload": {
            "type": "ENTITY_NOTIFICATION_V2",
            "operationType": operation,
            "eventTime": 1_686_224_785_000_i64,
            "entity": {
                "typeName": type_name,
                "guid": guid,
                "attributes": { "qualifiedName": qualified_name }
            }
        }
    })
    .to_string()
    .into_bytes()
}

/// Raw delivery body for an administrative notification.
pub fn admin_event() -> Vec<u8> {
    json!({
        "source": {},
        "payload": { "type": "ADMIN_NOTIFICATION", "operationType": "TYPEDEF_UPDATE" }
    })
    .to_string()
    .into_bytes()
}

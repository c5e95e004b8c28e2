//! Lazy, race-tolerant provisioning of shared custom metadata definitions
//!
//! The first reconciliation that needs a definition creates it. Concurrent
//! callers inside one process share a single in-flight initialization
//! through the cache; callers in different processes converge because the
//! catalog rejects duplicate creates with a conflict, after which the loser
//! reads the winner's definition back.
//!
//! Resolved definitions stay cached for the life of the process: the caches
//! are unbounded and never evict. Failures are never cached, so the next
//! event retries from scratch.

use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use tidemark_catalog::{
    EntityGateway, EnumDefinition, RegisteredEnum, RegisteredSchema, SchemaDefinition,
};

use crate::context::bounded;
use crate::error::{ReconcileError, ReconcileResult};

/// Ensures custom metadata definitions and enumerations exist exactly once.
pub struct SchemaProvisioner {
    gateway: Arc<dyn EntityGateway>,
    schemas: Cache<String, Arc<RegisteredSchema>>,
    enums: Cache<String, Arc<RegisteredEnum>>,
    call_timeout: Duration,
}

impl std::fmt::Debug for SchemaProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaProvisioner")
            .field("cached_schemas", &self.schemas.entry_count())
            .field("cached_enums", &self.enums.entry_count())
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}

impl SchemaProvisioner {
    pub fn new(gateway: Arc<dyn EntityGateway>, call_timeout: Duration) -> Self {
        Self {
            gateway,
            schemas: Cache::builder().build(),
            enums: Cache::builder().build(),
            call_timeout,
        }
    }

    /// Resolve a definition by name, creating it if the catalog lacks it.
    #[instrument(skip(self, definition), fields(schema = %definition.name))]
    pub async fn ensure_schema(
        &self,
        definition: &SchemaDefinition,
    ) -> ReconcileResult<Arc<RegisteredSchema>> {
        self.schemas
            .try_get_with(definition.name.clone(), self.provision_schema(definition))
            .await
            .map_err(|e| provisioning_failure(&definition.name, &e))
    }

    /// Resolve an options enumeration by name, creating it if needed.
    #[instrument(skip(self, definition), fields(enum_name = %definition.name))]
    pub async fn ensure_enum(
        &self,
        definition: &EnumDefinition,
    ) -> ReconcileResult<Arc<RegisteredEnum>> {
        self.enums
            .try_get_with(definition.name.clone(), self.provision_enum(definition))
            .await
            .map_err(|e| provisioning_failure(&definition.name, &e))
    }

    /// Definition already resolved by this process, if any.
    pub async fn cached_schema(&self, name: &str) -> Option<Arc<RegisteredSchema>> {
        self.schemas.get(name).await
    }

    async fn lookup_schema(&self, name: &str) -> ReconcileResult<Option<RegisteredSchema>> {
        bounded(
            self.call_timeout,
            "lookup_schema_by_name",
            self.gateway.lookup_schema_by_name(name),
        )
        .await
        .map_err(|e| ReconcileError::catalog("lookup_schema_by_name", e))
    }

    async fn provision_schema(
        &self,
        definition: &SchemaDefinition,
    ) -> ReconcileResult<Arc<RegisteredSchema>> {
        if let Some(found) = self.lookup_schema(&definition.name).await? {
            debug!(schema_id = %found.id, "Custom metadata already exists");
            return Ok(Arc::new(found));
        }

        let created = bounded(
            self.call_timeout,
            "create_schema",
            self.gateway.create_schema(definition),
        )
        .await;

        match created {
            Ok(schema) => {
                info!(schema_id = %schema.id, "Created custom metadata");
                self.create_badges(&schema, definition).await;
                Ok(Arc::new(schema))
            }
            Err(e) if e.is_conflict() => {
                debug!("Custom metadata created concurrently, reading it back");
                match self.lookup_schema(&definition.name).await? {
                    Some(schema) => Ok(Arc::new(schema)),
                    None => {
                        error!("Custom metadata missing after conflicting create");
                        Err(ReconcileError::ProvisioningLost {
                            name: definition.name.clone(),
                        })
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to create custom metadata");
                Err(ReconcileError::catalog("create_schema", e))
            }
        }
    }

    /// Badges are cosmetic; failures are logged and never fail provisioning.
    async fn create_badges(&self, schema: &RegisteredSchema, definition: &SchemaDefinition) {
        for badge in &definition.badges {
            let created = bounded(
                self.call_timeout,
                "create_display_artifact",
                self.gateway.create_display_artifact(schema, badge),
            )
            .await;
            match created {
                Ok(guid) => info!(badge = %badge.name, guid = %guid, "Created badge"),
                Err(e) => warn!(badge = %badge.name, error = %e, "Unable to create badge"),
            }
        }
    }

    async fn lookup_enum(&self, name: &str) -> ReconcileResult<Option<RegisteredEnum>> {
        bounded(
            self.call_timeout,
            "lookup_enum_by_name",
            self.gateway.lookup_enum_by_name(name),
        )
        .await
        .map_err(|e| ReconcileError::catalog("lookup_enum_by_name", e))
    }

    async fn provision_enum(
        &self,
        definition: &EnumDefinition,
    ) -> ReconcileResult<Arc<RegisteredEnum>> {
        if let Some(found) = self.lookup_enum(&definition.name).await? {
            debug!("Enumeration already exists");
            return Ok(Arc::new(found));
        }

        match bounded(
            self.call_timeout,
            "create_enum",
            self.gateway.create_enum(definition),
        )
        .await
        {
            Ok(created) => {
                info!(values = created.values.len(), "Created enumeration");
                Ok(Arc::new(created))
            }
            Err(e) if e.is_conflict() => {
                debug!("Enumeration created concurrently, reading it back");
                self.lookup_enum(&definition.name)
                    .await?
                    .map(Arc::new)
                    .ok_or_else(|| ReconcileError::ProvisioningLost {
                        name: definition.name.clone(),
                    })
            }
            Err(e) => {
                error!(error = %e, "Failed to create enumeration");
                Err(ReconcileError::catalog("create_enum", e))
            }
        }
    }
}

fn provisioning_failure(name: &str, cause: &Arc<ReconcileError>) -> ReconcileError {
    ReconcileError::Provisioning {
        name: name.to_string(),
        message: cause.to_string(),
        transient: cause.is_transient(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidemark_catalog::{AttributeDef, AttributeType, InMemoryCatalog};

    fn daap() -> SchemaDefinition {
        SchemaDefinition::new("DaaP")
            .with_attribute(AttributeDef::new("Score", AttributeType::Decimal))
    }

    #[tokio::test]
    async fn test_creates_once_then_serves_from_cache() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let provisioner = SchemaProvisioner::new(catalog.clone(), Duration::from_secs(1));

        let first = provisioner.ensure_schema(&daap()).await.unwrap();
        let second = provisioner.ensure_schema(&daap()).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(catalog.schema_creations(), 1);
        assert!(provisioner.cached_schema("DaaP").await.is_some());
    }

    #[tokio::test]
    async fn test_resolved_definitions_are_never_evicted() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let provisioner = SchemaProvisioner::new(catalog.clone(), Duration::from_secs(1));

        for i in 0..600 {
            let definition = SchemaDefinition::new(format!("Checks {i}"))
                .with_attribute(AttributeDef::new("Passed", AttributeType::Integer));
            provisioner.ensure_schema(&definition).await.unwrap();
        }
        provisioner.schemas.run_pending_tasks().await;

        assert_eq!(provisioner.schemas.entry_count(), 600);
        assert!(provisioner.cached_schema("Checks 0").await.is_some());
        assert_eq!(catalog.schema_creations(), 600);
    }

    #[tokio::test]
    async fn test_existing_definition_is_not_recreated() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let existing = catalog.register_schema(&daap());
        let provisioner = SchemaProvisioner::new(catalog.clone(), Duration::from_secs(1));

        let resolved = provisioner.ensure_schema(&daap()).await.unwrap();

        assert_eq!(resolved.id, existing.id);
        assert_eq!(catalog.schema_creations(), 0);
    }

    #[tokio::test]
    async fn test_invalid_definition_is_not_cached() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let provisioner = SchemaProvisioner::new(catalog, Duration::from_secs(1));

        let err = provisioner
            .ensure_schema(&SchemaDefinition::new("Empty"))
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::Provisioning { ref name, .. } if name == "Empty"));
        assert!(provisioner.cached_schema("Empty").await.is_none());
    }

    #[tokio::test]
    async fn test_ensure_enum_is_idempotent() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let provisioner = SchemaProvisioner::new(catalog.clone(), Duration::from_secs(1));
        let definition = EnumDefinition::new("QDRating", ["Poor", "OK", "Great"]);

        provisioner.ensure_enum(&definition).await.unwrap();
        let again = provisioner.ensure_enum(&definition).await.unwrap();

        assert_eq!(again.values, vec!["Poor", "OK", "Great"]);
        assert!(catalog.enum_definition("QDRating").is_some());
    }
}

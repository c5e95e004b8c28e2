//! Process-wide reconciliation context.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tidemark_catalog::{
    CatalogError, CatalogResult, EntityGateway, EntityRef, EntitySnapshot, Projection,
    RegisteredSchema,
};

use crate::config::ReconcileConfig;
use crate::error::{ReconcileError, ReconcileResult};
use crate::provisioner::SchemaProvisioner;

/// Run a catalog call under a deadline, reporting expiry as a timeout.
pub(crate) async fn bounded<T, F>(limit: Duration, operation: &'static str, call: F) -> CatalogResult<T>
where
    F: Future<Output = CatalogResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(CatalogError::Timeout {
            operation: operation.to_string(),
            timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

/// Everything a reconciliation needs besides the event.
///
/// Built once at process start and shared by reference; holds the gateway,
/// the schema provisioner with its resolved-definition cache, and settings.
pub struct ReconcileContext {
    gateway: Arc<dyn EntityGateway>,
    provisioner: SchemaProvisioner,
    config: ReconcileConfig,
}

impl std::fmt::Debug for ReconcileContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcileContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ReconcileContext {
    pub fn new(gateway: Arc<dyn EntityGateway>, config: ReconcileConfig) -> Self {
        let provisioner = SchemaProvisioner::new(Arc::clone(&gateway), config.call_timeout);
        Self {
            gateway,
            provisioner,
            config,
        }
    }

    pub fn gateway(&self) -> &dyn EntityGateway {
        self.gateway.as_ref()
    }

    pub fn provisioner(&self) -> &SchemaProvisioner {
        &self.provisioner
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }
}

/// View of the context handed to a policy while it computes changes.
pub struct PolicyContext<'a> {
    gateway: &'a dyn EntityGateway,
    schema: Option<&'a RegisteredSchema>,
    call_timeout: Duration,
}

impl<'a> PolicyContext<'a> {
    pub fn new(
        gateway: &'a dyn EntityGateway,
        schema: Option<&'a RegisteredSchema>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            gateway,
            schema,
            call_timeout,
        }
    }

    /// The policy's custom metadata definition, once provisioned.
    pub fn schema(&self) -> Option<&RegisteredSchema> {
        self.schema
    }

    /// Read another entity the policy depends on, such as a linked readme.
    pub async fn fetch_related(
        &self,
        reference: &EntityRef,
        projection: &Projection,
    ) -> ReconcileResult<Option<EntitySnapshot>> {
        bounded(
            self.call_timeout,
            "fetch_related",
            self.gateway.fetch_entity(reference, projection),
        )
        .await
        .map_err(|e| ReconcileError::catalog("fetch_related", e))
    }
}

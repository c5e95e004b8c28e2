//! Reconciliation engine
//!
//! Drives one event through the handler contract:
//!
//! ```text
//! received ──► prerequisites checked ──► no-op
//!                      │
//!                      ▼
//!            current state loaded ──► no-op (not found)
//!                      │
//!                      ▼
//!             candidate computed ──► no-op (nothing proposed / unchanged)
//!                      │
//!                      ▼
//!                merge-upsert ──► updated | failed
//! ```
//!
//! The engine holds no per-event state; every call starts from the event.

use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use tidemark_catalog::{EntitySnapshot, Projection, RegisteredSchema};
use tidemark_events::{decode, DecodedEvent};

use crate::context::{bounded, PolicyContext, ReconcileContext};
use crate::error::ReconcileError;
use crate::outcome::{NoOpReason, ReconciliationOutcome, UpdatedEntity};
use crate::policy::Policy;

/// Applies one policy to incoming events.
pub struct ReconcileEngine {
    ctx: Arc<ReconcileContext>,
    policy: Arc<dyn Policy>,
}

impl std::fmt::Debug for ReconcileEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcileEngine")
            .field("policy", &self.policy.name())
            .field("ctx", &self.ctx)
            .finish()
    }
}

impl ReconcileEngine {
    pub fn new(ctx: Arc<ReconcileContext>, policy: Arc<dyn Policy>) -> Self {
        Self { ctx, policy }
    }

    pub fn policy_name(&self) -> &str {
        self.policy.name()
    }

    /// Decode a raw delivery and reconcile it.
    pub async fn reconcile_raw(&self, raw: &[u8]) -> ReconciliationOutcome {
        match decode(raw) {
            Ok(event) => self.reconcile(&event).await,
            Err(e) => {
                debug!(policy = %self.policy.name(), reason = e.kind(), error = %e, "Ignoring delivery");
                ReconciliationOutcome::NoOp(NoOpReason::Undecodable(e))
            }
        }
    }

    /// Reconcile one decoded event. Never panics and never returns early
    /// with an error: every path ends in an outcome.
    #[instrument(
        skip(self, event),
        fields(policy = %self.policy.name(), guid = %event.guid(), type_name = %event.type_name(), kind = %event.kind)
    )]
    pub async fn reconcile(&self, event: &DecodedEvent) -> ReconciliationOutcome {
        if !self.policy.accepts(event) {
            debug!("Policy declined event");
            return ReconciliationOutcome::NoOp(NoOpReason::Rejected);
        }

        let schema = match self.required_schema().await {
            Ok(schema) => schema,
            Err(reason) => return ReconciliationOutcome::NoOp(reason),
        };

        let mut projection = self.policy.projection();
        if let Some(schema) = &schema {
            projection = projection.with_schema(schema);
        }

        let current = match self.load_current(event, &projection).await {
            Ok(Some(current)) => current,
            Ok(None) => {
                info!("Entity not found, nothing to reconcile");
                return ReconciliationOutcome::NoOp(NoOpReason::EntityNotFound);
            }
            Err(e) => return self.failed(e),
        };

        let policy_ctx = PolicyContext::new(
            self.ctx.gateway(),
            schema.as_deref(),
            self.ctx.config().call_timeout,
        );

        let candidate = match self.policy.calculate_changes(&policy_ctx, &current).await {
            Ok(Some(candidate)) if !candidate.is_empty() => candidate,
            Ok(_) => {
                debug!(qualified_name = ?current.qualified_name(), "No change proposed");
                return ReconciliationOutcome::NoOp(NoOpReason::NoChangeProposed);
            }
            Err(e) => return self.failed(e),
        };

        if !self.policy.has_changes(&policy_ctx, &current, &candidate) {
            debug!(qualified_name = ?current.qualified_name(), "Entity already in target state");
            return ReconciliationOutcome::NoOp(NoOpReason::Unchanged);
        }

        let changed = candidate.changed_names();
        let written = bounded(
            self.ctx.config().call_timeout,
            "merge_upsert",
            self.ctx.gateway().merge_upsert(&candidate),
        )
        .await;

        match written {
            Ok(reference) => {
                info!(changed = ?changed, "Entity updated");
                ReconciliationOutcome::Updated(UpdatedEntity { reference, changed })
            }
            Err(e) => self.failed(ReconcileError::catalog("merge_upsert", e)),
        }
    }

    async fn required_schema(&self) -> Result<Option<Arc<RegisteredSchema>>, NoOpReason> {
        let Some(definition) = self.policy.required_schema() else {
            return Ok(None);
        };
        match self.ctx.provisioner().ensure_schema(definition).await {
            Ok(schema) => Ok(Some(schema)),
            Err(cause) => {
                warn!(schema = %definition.name, error = %cause, "Custom metadata unavailable, skipping event");
                Err(NoOpReason::SchemaUnavailable {
                    schema: definition.name.clone(),
                    cause,
                })
            }
        }
    }

    /// Fetch the entity, re-checking a bounded number of times when it is
    /// not yet visible.
    async fn load_current(
        &self,
        event: &DecodedEvent,
        projection: &Projection,
    ) -> Result<Option<EntitySnapshot>, ReconcileError> {
        let config = self.ctx.config();
        let mut attempt = 0;
        loop {
            let found = bounded(
                config.call_timeout,
                "fetch_entity",
                self.ctx.gateway().fetch_entity(&event.reference, projection),
            )
            .await
            .map_err(|e| ReconcileError::catalog("fetch_entity", e))?;

            if found.is_some() || attempt >= config.not_found_rechecks {
                return Ok(found);
            }
            attempt += 1;
            debug!(attempt, "Entity not visible yet, re-checking");
            tokio::time::sleep(config.recheck_delay).await;
        }
    }

    fn failed(&self, e: ReconcileError) -> ReconciliationOutcome {
        if e.is_transient() {
            warn!(error = %e, "Reconciliation failed, redelivery may succeed");
        } else {
            error!(error = %e, "Reconciliation failed");
        }
        ReconciliationOutcome::Failed(e)
    }
}

//! Business rules plugged into the engine.

use async_trait::async_trait;

use tidemark_catalog::{ChangeSet, EntitySnapshot, Projection, SchemaDefinition};
use tidemark_events::DecodedEvent;

use crate::context::PolicyContext;
use crate::error::ReconcileResult;

/// Computes the state an entity should be in.
///
/// Only `name`, `projection` and `calculate_changes` are required; the
/// remaining hooks have defaults that suit most policies.
#[async_trait]
pub trait Policy: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Standard attributes the policy reads. Attributes of the policy's
    /// custom metadata definition are added by the engine.
    fn projection(&self) -> Projection;

    /// Custom metadata definition the policy writes, provisioned on first use.
    fn required_schema(&self) -> Option<&SchemaDefinition> {
        None
    }

    /// Whether the policy wants to look at this event at all.
    ///
    /// Deleted entities cannot be patched, so deletes are declined.
    fn accepts(&self, event: &DecodedEvent) -> bool {
        !event.kind.is_delete()
    }

    /// Candidate patch for the entity, or `None` when nothing should change.
    ///
    /// Must be a pure function of the snapshot (plus any related entities
    /// read through the context), so replays converge.
    async fn calculate_changes(
        &self,
        ctx: &PolicyContext<'_>,
        current: &EntitySnapshot,
    ) -> ReconcileResult<Option<ChangeSet>>;

    /// Whether writing the candidate would change anything.
    fn has_changes(
        &self,
        _ctx: &PolicyContext<'_>,
        current: &EntitySnapshot,
        candidate: &ChangeSet,
    ) -> bool {
        candidate.differs_from(current)
    }
}

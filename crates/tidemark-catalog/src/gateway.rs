//! Entity store gateway trait
//!
//! The narrow surface through which reconciliation talks to the catalog.
//! Implementations must be safe to share across concurrent invocations.

use async_trait::async_trait;

use crate::change::ChangeSet;
use crate::error::CatalogResult;
use crate::ids::EntityRef;
use crate::lineage::LineageRequest;
use crate::metadata::{BadgeSpec, EnumDefinition, RegisteredEnum, RegisteredSchema, SchemaDefinition};
use crate::model::{EntitySnapshot, Projection};
use crate::search::SearchQuery;

#[async_trait]
pub trait EntityGateway: Send + Sync {
    /// Fetch the current state of an entity with the requested projection.
    ///
    /// Returns `Ok(None)` when the entity does not exist (or is no longer
    /// active).
    async fn fetch_entity(
        &self,
        reference: &EntityRef,
        projection: &Projection,
    ) -> CatalogResult<Option<EntitySnapshot>>;

    /// Run a search and return one page of matching entities.
    async fn search_entities(&self, query: &SearchQuery) -> CatalogResult<Vec<EntitySnapshot>>;

    /// Walk lineage from one entity and return one page of the entities
    /// reached, excluding the starting entity.
    async fn lineage_list(&self, request: &LineageRequest) -> CatalogResult<Vec<EntitySnapshot>>;

    /// Usernames of the members of a group, or `None` when no group has
    /// that name.
    async fn group_members(&self, group: &str) -> CatalogResult<Option<Vec<String>>>;

    /// Apply a change set, merging custom metadata with what is stored.
    async fn merge_upsert(&self, change_set: &ChangeSet) -> CatalogResult<EntityRef>;

    /// Resolve a custom metadata definition by display name.
    async fn lookup_schema_by_name(&self, name: &str) -> CatalogResult<Option<RegisteredSchema>>;

    /// Create a custom metadata definition.
    ///
    /// Fails with `CatalogError::Conflict` when a definition with the same
    /// name already exists.
    async fn create_schema(&self, definition: &SchemaDefinition) -> CatalogResult<RegisteredSchema>;

    /// Create a badge over an attribute of a registered definition.
    async fn create_display_artifact(
        &self,
        schema: &RegisteredSchema,
        badge: &BadgeSpec,
    ) -> CatalogResult<String>;

    /// Resolve an options enumeration by name.
    async fn lookup_enum_by_name(&self, name: &str) -> CatalogResult<Option<RegisteredEnum>>;

    /// Create an options enumeration. Fails with `Conflict` on duplicates.
    async fn create_enum(&self, definition: &EnumDefinition) -> CatalogResult<RegisteredEnum>;
}

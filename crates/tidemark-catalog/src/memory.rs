//! In-memory catalog
//!
//! A process-local [`EntityGateway`] with the same merge and conflict
//! semantics as the REST API, for exercising reconciliation without a
//! tenant.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::change::ChangeSet;
use crate::error::{CatalogError, CatalogResult};
use crate::gateway::EntityGateway;
use crate::ids::{EntityRef, SchemaId};
use crate::lineage::{LineageDirection, LineageRequest};
use crate::metadata::{
    BadgeSpec, EnumDefinition, RegisteredAttribute, RegisteredEnum, RegisteredSchema,
    SchemaDefinition,
};
use crate::model::{AssetField, EntitySnapshot, Projection};
use crate::search::{fields, SearchFilter, SearchQuery};

#[derive(Default)]
struct State {
    entities: BTreeMap<String, EntitySnapshot>,
    schemas: HashMap<String, RegisteredSchema>,
    enums: HashMap<String, RegisteredEnum>,
    badges: Vec<(SchemaId, BadgeSpec)>,
    upserts: Vec<ChangeSet>,
    schema_creations: usize,
    /// (upstream guid, downstream guid)
    lineage: Vec<(String, String)>,
    groups: HashMap<String, Vec<String>>,
}

/// Catalog held entirely in memory.
#[derive(Default)]
pub struct InMemoryCatalog {
    state: Mutex<State>,
}

impl std::fmt::Debug for InMemoryCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("InMemoryCatalog")
            .field("entities", &state.entities.len())
            .field("schemas", &state.schemas.len())
            .finish()
    }
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store (or replace) an entity with its full state.
    pub fn insert_entity(&self, snapshot: EntitySnapshot) {
        self.lock()
            .entities
            .insert(snapshot.guid().to_string(), snapshot);
    }

    /// Remove an entity, as if it had been deleted.
    pub fn remove_entity(&self, guid: &str) -> Option<EntitySnapshot> {
        self.lock().entities.remove(guid)
    }

    /// Record that `downstream` is produced from `upstream`.
    pub fn add_lineage(&self, upstream: &str, downstream: &str) {
        self.lock()
            .lineage
            .push((upstream.to_string(), downstream.to_string()));
    }

    /// Create or replace a group with the given members.
    pub fn insert_group<I, S>(&self, name: &str, members: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock()
            .groups
            .insert(name.to_string(), members.into_iter().map(Into::into).collect());
    }

    /// Full stored state of an entity.
    pub fn entity(&self, guid: &str) -> Option<EntitySnapshot> {
        self.lock().entities.get(guid).cloned()
    }

    /// Register a definition directly, without counting it as a creation.
    pub fn register_schema(&self, definition: &SchemaDefinition) -> RegisteredSchema {
        let mut state = self.lock();
        let schema = Self::registered_from(definition, state.schemas.len());
        state.schemas.insert(schema.name.clone(), schema.clone());
        schema
    }

    /// Every change set applied so far, in order.
    pub fn upserts(&self) -> Vec<ChangeSet> {
        self.lock().upserts.clone()
    }

    pub fn upsert_count(&self) -> usize {
        self.lock().upserts.len()
    }

    /// Number of successful `create_schema` calls.
    pub fn schema_creations(&self) -> usize {
        self.lock().schema_creations
    }

    pub fn badges(&self) -> Vec<BadgeSpec> {
        self.lock().badges.iter().map(|(_, b)| b.clone()).collect()
    }

    pub fn enum_definition(&self, name: &str) -> Option<RegisteredEnum> {
        self.lock().enums.get(name).cloned()
    }

    fn registered_from(definition: &SchemaDefinition, ordinal: usize) -> RegisteredSchema {
        let id = format!("cm{ordinal:04}");
        RegisteredSchema {
            id: SchemaId::new(id.clone()),
            name: definition.name.clone(),
            attributes: definition
                .attributes
                .iter()
                .enumerate()
                .map(|(i, a)| RegisteredAttribute {
                    name: a.name.clone(),
                    internal_name: format!("{id}a{i}"),
                    attribute_type: a.attribute_type.clone(),
                    multi_valued: a.multi_valued,
                })
                .collect(),
        }
    }

    fn project(stored: &EntitySnapshot, projection: &Projection) -> EntitySnapshot {
        let mut view = EntitySnapshot::new(stored.reference().clone());
        let attributes = stored.attributes();

        let mut wanted: Vec<&str> = projection.attribute_names();
        wanted.extend([AssetField::Name.as_str(), AssetField::QualifiedName.as_str()]);
        if projection.include_terms {
            wanted.push(AssetField::Meanings.as_str());
        }
        if projection.include_tags {
            wanted.push(AssetField::Classifications.as_str());
        }
        for name in wanted {
            if let Some(value) = attributes.get(name) {
                view.insert_raw(name.to_string(), value.clone());
            }
        }

        for key in &projection.custom_metadata {
            if let Some(value) = stored.custom_metadata_values().get(key) {
                view = view.with_custom_metadata(key, value.clone());
            }
        }
        view
    }

    fn field_value<'a>(snapshot: &'a EntitySnapshot, field: &str) -> Option<&'a str> {
        match field {
            fields::GUID => Some(snapshot.guid()),
            fields::TYPE_NAME => Some(snapshot.type_name()),
            fields::QUALIFIED_NAME => snapshot.qualified_name(),
            fields::NAME => snapshot
                .reference()
                .name
                .as_deref()
                .or_else(|| snapshot.text(AssetField::Name)),
            fields::GLOSSARY => snapshot
                .get(AssetField::Anchor)
                .and_then(|anchor| anchor.pointer("/uniqueAttributes/qualifiedName"))
                .and_then(Value::as_str),
            other => snapshot.attributes().get(other).and_then(Value::as_str),
        }
    }

    /// Guids reachable from `start` within `depth` hops, nearest first.
    fn walk(state: &State, start: &str, direction: LineageDirection, depth: u32) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::from([start]);
        let mut queue: VecDeque<(&str, u32)> = VecDeque::from([(start, 0)]);
        let mut reached = Vec::new();

        while let Some((current, hops)) = queue.pop_front() {
            if hops >= depth {
                continue;
            }
            let next = state.lineage.iter().filter_map(|(up, down)| match direction {
                LineageDirection::Upstream if down == current => Some(up.as_str()),
                LineageDirection::Downstream if up == current => Some(down.as_str()),
                _ => None,
            });
            for guid in next {
                if seen.insert(guid) {
                    reached.push(guid.to_string());
                    queue.push_back((guid, hops + 1));
                }
            }
        }
        reached
    }

    fn matches(snapshot: &EntitySnapshot, filter: &SearchFilter) -> bool {
        if filter.field() == fields::STATE {
            return filter.matches("ACTIVE");
        }
        Self::field_value(snapshot, filter.field()).is_some_and(|v| filter.matches(v))
    }
}

#[async_trait]
impl EntityGateway for InMemoryCatalog {
    async fn fetch_entity(
        &self,
        reference: &EntityRef,
        projection: &Projection,
    ) -> CatalogResult<Option<EntitySnapshot>> {
        let state = self.lock();
        Ok(state
            .entities
            .get(&reference.guid)
            .map(|stored| Self::project(stored, projection)))
    }

    async fn search_entities(&self, query: &SearchQuery) -> CatalogResult<Vec<EntitySnapshot>> {
        let state = self.lock();
        Ok(state
            .entities
            .values()
            .filter(|e| query.filters.iter().all(|f| Self::matches(e, f)))
            .skip(query.from)
            .take(query.page_size)
            .map(|e| Self::project(e, &query.projection))
            .collect())
    }

    async fn lineage_list(&self, request: &LineageRequest) -> CatalogResult<Vec<EntitySnapshot>> {
        let state = self.lock();
        if !state.entities.contains_key(&request.guid) {
            return Err(CatalogError::NotFound {
                identifier: request.guid.clone(),
            });
        }
        Ok(Self::walk(&state, &request.guid, request.direction, request.depth)
            .iter()
            .filter_map(|guid| state.entities.get(guid))
            .filter(|e| request.admits(e))
            .skip(request.from)
            .take(request.page_size)
            .map(|e| Self::project(e, &request.projection))
            .collect())
    }

    async fn group_members(&self, group: &str) -> CatalogResult<Option<Vec<String>>> {
        Ok(self.lock().groups.get(group).cloned())
    }

    async fn merge_upsert(&self, change_set: &ChangeSet) -> CatalogResult<EntityRef> {
        let mut state = self.lock();

        for key in change_set.custom_metadata().keys() {
            let schema = state
                .schemas
                .get(key.schema())
                .ok_or_else(|| CatalogError::UnknownSchema {
                    schema: key.schema().to_string(),
                })?;
            schema.attribute(key.attribute())?;
        }

        let target = change_set.target();
        let stored = state
            .entities
            .get_mut(&target.guid)
            .ok_or_else(|| CatalogError::NotFound {
                identifier: target.to_string(),
            })?;

        for (field, value) in change_set.fields() {
            stored.insert_raw(field.as_str().to_string(), value.clone());
        }
        for (key, value) in change_set.custom_metadata() {
            if value.is_null() {
                stored.custom_metadata_mut().remove(key);
            } else {
                stored.custom_metadata_mut().insert(key.clone(), value.clone());
            }
        }
        let reference = stored.reference().clone();

        state.upserts.push(change_set.clone());
        Ok(reference)
    }

    async fn lookup_schema_by_name(&self, name: &str) -> CatalogResult<Option<RegisteredSchema>> {
        Ok(self.lock().schemas.get(name).cloned())
    }

    async fn create_schema(&self, definition: &SchemaDefinition) -> CatalogResult<RegisteredSchema> {
        definition.validate()?;
        let mut state = self.lock();
        if state.schemas.contains_key(&definition.name) {
            return Err(CatalogError::Conflict {
                message: format!("custom metadata '{}' already exists", definition.name),
            });
        }
        let schema = Self::registered_from(definition, state.schemas.len());
        state.schemas.insert(schema.name.clone(), schema.clone());
        state.schema_creations += 1;
        Ok(schema)
    }

    async fn create_display_artifact(
        &self,
        schema: &RegisteredSchema,
        badge: &BadgeSpec,
    ) -> CatalogResult<String> {
        let attribute = schema.attribute(&badge.attribute)?;
        let mut state = self.lock();
        state.badges.push((schema.id.clone(), badge.clone()));
        Ok(format!("badge-{}-{}", schema.id, attribute.internal_name))
    }

    async fn lookup_enum_by_name(&self, name: &str) -> CatalogResult<Option<RegisteredEnum>> {
        Ok(self.lock().enums.get(name).cloned())
    }

    async fn create_enum(&self, definition: &EnumDefinition) -> CatalogResult<RegisteredEnum> {
        let mut state = self.lock();
        if state.enums.contains_key(&definition.name) {
            return Err(CatalogError::Conflict {
                message: format!("enumeration '{}' already exists", definition.name),
            });
        }
        let registered = RegisteredEnum {
            name: definition.name.clone(),
            values: definition.values.clone(),
        };
        state.enums.insert(registered.name.clone(), registered.clone());
        Ok(registered)
    }
}

//! Minimal patches written back to the catalog.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::ids::EntityRef;
use crate::metadata::CustomMetadataKey;
use crate::model::{values_equal, AssetField, EntitySnapshot};

/// Attribute assignments to merge into one entity.
///
/// A change set carries the identifying fields of its target plus the
/// fields being changed, never a full entity body, so concurrent writers
/// touching other fields are not clobbered.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet {
    target: EntityRef,
    fields: BTreeMap<AssetField, Value>,
    custom_metadata: BTreeMap<CustomMetadataKey, Value>,
}

impl ChangeSet {
    /// Start an empty change set for the given entity.
    pub fn for_entity(target: &EntityRef) -> Self {
        Self {
            target: target.clone(),
            fields: BTreeMap::new(),
            custom_metadata: BTreeMap::new(),
        }
    }

    /// Start an empty change set for the entity a snapshot describes.
    pub fn for_snapshot(snapshot: &EntitySnapshot) -> Self {
        let mut target = snapshot.reference().clone();
        if target.qualified_name.is_none() {
            target.qualified_name = snapshot.qualified_name().map(str::to_string);
        }
        if target.name.is_none() {
            target.name = snapshot.text(AssetField::Name).map(str::to_string);
        }
        Self::for_entity(&target)
    }

    /// Assign a standard attribute.
    pub fn set(mut self, field: AssetField, value: impl Into<Value>) -> Self {
        self.fields.insert(field, value.into());
        self
    }

    /// Assign a custom metadata attribute.
    pub fn set_custom_metadata(mut self, key: &CustomMetadataKey, value: impl Into<Value>) -> Self {
        self.custom_metadata.insert(key.clone(), value.into());
        self
    }

    pub fn target(&self) -> &EntityRef {
        &self.target
    }

    pub fn fields(&self) -> &BTreeMap<AssetField, Value> {
        &self.fields
    }

    pub fn field(&self, field: AssetField) -> Option<&Value> {
        self.fields.get(&field)
    }

    pub fn custom_metadata(&self) -> &BTreeMap<CustomMetadataKey, Value> {
        &self.custom_metadata
    }

    pub fn custom_metadata_value(&self, key: &CustomMetadataKey) -> Option<&Value> {
        self.custom_metadata.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.custom_metadata.is_empty()
    }

    /// Names of everything this change set assigns, for logging.
    pub fn changed_names(&self) -> Vec<String> {
        self.fields
            .keys()
            .map(|f| f.as_str().to_string())
            .chain(self.custom_metadata.keys().map(ToString::to_string))
            .collect()
    }

    /// Whether applying this change set would alter the snapshot.
    pub fn differs_from(&self, current: &EntitySnapshot) -> bool {
        let fields_differ = self
            .fields
            .iter()
            .any(|(field, value)| !values_equal(Some(value), current.get(*field)));

        fields_differ
            || self
                .custom_metadata
                .iter()
                .any(|(key, value)| !values_equal(Some(value), current.custom_metadata(key)))
    }
}

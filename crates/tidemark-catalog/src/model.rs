//! Entity snapshots and attribute projections.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::ids::EntityRef;
use crate::metadata::{CustomMetadataKey, RegisteredSchema};

/// Standard entity attribute, named as the catalog names it on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssetField {
    Name,
    QualifiedName,
    Description,
    UserDescription,
    OwnerUsers,
    OwnerGroups,
    CertificateStatus,
    CertificateStatusMessage,
    HasLineage,
    InputToProcesses,
    OutputFromProcesses,
    /// Assigned glossary terms.
    Meanings,
    /// Assigned tags.
    Classifications,
    SeeAlso,
    Links,
    AssignedEntities,
    Readme,
    /// Glossary a term or category belongs to.
    Anchor,
    StarredBy,
    StarredCount,
    StarredDetailsList,
    ConnectorName,
}

impl AssetField {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetField::Name => "name",
            AssetField::QualifiedName => "qualifiedName",
            AssetField::Description => "description",
            AssetField::UserDescription => "userDescription",
            AssetField::OwnerUsers => "ownerUsers",
            AssetField::OwnerGroups => "ownerGroups",
            AssetField::CertificateStatus => "certificateStatus",
            AssetField::CertificateStatusMessage => "certificateStatusMessage",
            AssetField::HasLineage => "__hasLineage",
            AssetField::InputToProcesses => "inputToProcesses",
            AssetField::OutputFromProcesses => "outputFromProcesses",
            AssetField::Meanings => "meanings",
            AssetField::Classifications => "classifications",
            AssetField::SeeAlso => "seeAlso",
            AssetField::Links => "links",
            AssetField::AssignedEntities => "assignedEntities",
            AssetField::Readme => "readme",
            AssetField::Anchor => "anchor",
            AssetField::StarredBy => "starredBy",
            AssetField::StarredCount => "starredCount",
            AssetField::StarredDetailsList => "starredDetailsList",
            AssetField::ConnectorName => "connectorName",
        }
    }
}

impl fmt::Display for AssetField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Certification state of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificateStatus {
    Draft,
    Verified,
    Deprecated,
}

impl CertificateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateStatus::Draft => "DRAFT",
            CertificateStatus::Verified => "VERIFIED",
            CertificateStatus::Deprecated => "DEPRECATED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "DRAFT" => Some(CertificateStatus::Draft),
            "VERIFIED" => Some(CertificateStatus::Verified),
            "DEPRECATED" => Some(CertificateStatus::Deprecated),
            _ => None,
        }
    }
}

impl From<CertificateStatus> for Value {
    fn from(status: CertificateStatus) -> Self {
        Value::String(status.as_str().to_string())
    }
}

/// Attributes a reconciliation asks the catalog for.
///
/// Under-fetching yields wrong diffs, so policies declare exactly the
/// fields they read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    pub fields: Vec<AssetField>,
    pub custom_metadata: Vec<CustomMetadataKey>,
    pub include_terms: bool,
    pub include_tags: bool,
}

impl Projection {
    pub fn new(fields: impl IntoIterator<Item = AssetField>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_terms(mut self) -> Self {
        self.include_terms = true;
        self
    }

    pub fn with_tags(mut self) -> Self {
        self.include_tags = true;
        self
    }

    /// Request every attribute of a custom metadata definition.
    pub fn with_schema(mut self, schema: &RegisteredSchema) -> Self {
        for key in schema.keys() {
            if !self.custom_metadata.contains(&key) {
                self.custom_metadata.push(key);
            }
        }
        self
    }

    /// Wire names of the requested standard attributes.
    pub fn attribute_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(AssetField::as_str).collect()
    }
}

/// Read-only view of an entity's current state.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot {
    reference: EntityRef,
    attributes: Map<String, Value>,
    custom_metadata: BTreeMap<CustomMetadataKey, Value>,
}

impl EntitySnapshot {
    pub fn new(reference: EntityRef) -> Self {
        Self {
            reference,
            attributes: Map::new(),
            custom_metadata: BTreeMap::new(),
        }
    }

    /// Set a standard attribute (used by gateways when assembling a snapshot).
    pub fn with_attribute(mut self, field: AssetField, value: impl Into<Value>) -> Self {
        self.attributes.insert(field.as_str().to_string(), value.into());
        self
    }

    pub(crate) fn insert_raw(&mut self, name: String, value: Value) {
        self.attributes.insert(name, value);
    }

    pub(crate) fn custom_metadata_mut(&mut self) -> &mut BTreeMap<CustomMetadataKey, Value> {
        &mut self.custom_metadata
    }

    /// Set a custom metadata value.
    pub fn with_custom_metadata(mut self, key: &CustomMetadataKey, value: impl Into<Value>) -> Self {
        self.custom_metadata.insert(key.clone(), value.into());
        self
    }

    pub fn reference(&self) -> &EntityRef {
        &self.reference
    }

    pub fn guid(&self) -> &str {
        &self.reference.guid
    }

    pub fn type_name(&self) -> &str {
        &self.reference.type_name
    }

    pub fn qualified_name(&self) -> Option<&str> {
        self.reference
            .qualified_name
            .as_deref()
            .or_else(|| self.text(AssetField::QualifiedName))
    }

    /// Raw value of a standard attribute; JSON `null` reads as absent.
    pub fn get(&self, field: AssetField) -> Option<&Value> {
        self.attributes
            .get(field.as_str())
            .filter(|v| !v.is_null())
    }

    /// Non-blank string value of an attribute.
    pub fn text(&self, field: AssetField) -> Option<&str> {
        self.get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// Number of elements of a list-valued attribute (0 when absent).
    pub fn count(&self, field: AssetField) -> usize {
        match self.get(field) {
            Some(Value::Array(items)) => items.len(),
            Some(Value::Object(_)) => 1,
            _ => 0,
        }
    }

    pub fn has_any(&self, field: AssetField) -> bool {
        self.count(field) > 0
    }

    pub fn flag(&self, field: AssetField) -> bool {
        self.get(field).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn certificate_status(&self) -> Option<CertificateStatus> {
        self.text(AssetField::CertificateStatus)
            .and_then(CertificateStatus::parse)
    }

    /// Current value of a custom metadata attribute.
    pub fn custom_metadata(&self, key: &CustomMetadataKey) -> Option<&Value> {
        self.custom_metadata.get(key).filter(|v| !v.is_null())
    }

    pub fn custom_metadata_f64(&self, key: &CustomMetadataKey) -> Option<f64> {
        self.custom_metadata(key).and_then(Value::as_f64)
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn custom_metadata_values(&self) -> &BTreeMap<CustomMetadataKey, Value> {
        &self.custom_metadata
    }
}

/// Compare two attribute values the way the catalog stores them.
///
/// Absent and `null` are equal, and numbers compare by value so that `60`
/// and `60.0` are the same score.
pub fn values_equal(left: Option<&Value>, right: Option<&Value>) -> bool {
    let left = left.filter(|v| !v.is_null());
    let right = right.filter(|v| !v.is_null());
    match (left, right) {
        (None, None) => true,
        (Some(Value::Number(a)), Some(Value::Number(b))) => a.as_f64() == b.as_f64(),
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

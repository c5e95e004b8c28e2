//! Decoded entity change notifications.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

use tidemark_catalog::EntityRef;

/// What happened to the entity, as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    EntityCreate,
    EntityUpdate,
    EntityDelete,
    TagAdd,
    TagUpdate,
    TagDelete,
    CustomMetadataUpdate,
    TermAdd,
    TermDelete,
    Other(String),
}

impl ChangeKind {
    /// Map the catalog's `operationType`.
    pub fn from_operation(operation: &str) -> Self {
        match operation {
            "ENTITY_CREATE" => ChangeKind::EntityCreate,
            "ENTITY_UPDATE" => ChangeKind::EntityUpdate,
            "ENTITY_DELETE" => ChangeKind::EntityDelete,
            "CLASSIFICATION_ADD" => ChangeKind::TagAdd,
            "CLASSIFICATION_UPDATE" => ChangeKind::TagUpdate,
            "CLASSIFICATION_DELETE" => ChangeKind::TagDelete,
            "BUSINESS_ATTRIBUTE_UPDATE" => ChangeKind::CustomMetadataUpdate,
            "TERM_ADD" => ChangeKind::TermAdd,
            "TERM_DELETE" => ChangeKind::TermDelete,
            other => ChangeKind::Other(other.to_string()),
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, ChangeKind::EntityDelete)
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::EntityCreate => f.write_str("ENTITY_CREATE"),
            ChangeKind::EntityUpdate => f.write_str("ENTITY_UPDATE"),
            ChangeKind::EntityDelete => f.write_str("ENTITY_DELETE"),
            ChangeKind::TagAdd => f.write_str("CLASSIFICATION_ADD"),
            ChangeKind::TagUpdate => f.write_str("CLASSIFICATION_UPDATE"),
            ChangeKind::TagDelete => f.write_str("CLASSIFICATION_DELETE"),
            ChangeKind::CustomMetadataUpdate => f.write_str("BUSINESS_ATTRIBUTE_UPDATE"),
            ChangeKind::TermAdd => f.write_str("TERM_ADD"),
            ChangeKind::TermDelete => f.write_str("TERM_DELETE"),
            ChangeKind::Other(op) => f.write_str(op),
        }
    }
}

/// An entity notification reduced to what reconciliation needs.
///
/// The attributes carried by the event are kept for logging only: they
/// reflect the entity at emission time and must not be used to compute
/// changes.
#[derive(Debug, Clone)]
pub struct DecodedEvent {
    pub reference: EntityRef,
    pub kind: ChangeKind,
    pub event_time: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub event_attributes: Map<String, Value>,
}

impl DecodedEvent {
    pub fn new(reference: EntityRef, kind: ChangeKind) -> Self {
        Self {
            reference,
            kind,
            event_time: None,
            created_by: None,
            event_attributes: Map::new(),
        }
    }

    pub fn guid(&self) -> &str {
        &self.reference.guid
    }

    pub fn type_name(&self) -> &str {
        &self.reference.type_name
    }
}

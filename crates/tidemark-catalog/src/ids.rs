//! Identifier types
//!
//! Entity references and schema identifiers as the catalog hands them out.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a catalog entity named in an inbound event.
///
/// `guid` and `type_name` identify the entity; `qualified_name` and `name`
/// are carried along when known because the catalog requires them on writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRef {
    pub guid: String,
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualified_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl EntityRef {
    /// Create a reference from its guid and type name.
    pub fn new(guid: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            type_name: type_name.into(),
            qualified_name: None,
            name: None,
        }
    }

    /// Attach the qualified name.
    pub fn with_qualified_name(mut self, qualified_name: impl Into<String>) -> Self {
        self.qualified_name = Some(qualified_name.into());
        self
    }

    /// Attach the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Whether the referenced entity is a glossary, term or category.
    pub fn is_glossary_type(&self) -> bool {
        self.type_name.starts_with("AtlasGlossary")
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_name, self.guid)
    }
}

/// Catalog-internal identifier of a custom metadata definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaId(String);

impl SchemaId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SchemaId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

//! Custom metadata definitions
//!
//! A custom metadata definition is a named, catalog-wide set of typed
//! attributes that can be attached to any entity. Definitions are declared
//! with [`SchemaDefinition`], and once the catalog has accepted one it is
//! known by its [`RegisteredSchema`], which is the only way to obtain a
//! [`CustomMetadataKey`] for reading or writing values.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CatalogError, CatalogResult};
use crate::ids::SchemaId;

/// Primitive type of a custom metadata attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttributeType {
    Text,
    Integer,
    Decimal,
    Boolean,
    Date,
    Url,
    /// Value restricted to the named options enumeration.
    Options { enum_name: String },
}

impl AttributeType {
    /// Type name the catalog stores for this attribute.
    pub fn type_name(&self) -> &str {
        match self {
            AttributeType::Text | AttributeType::Url => "string",
            AttributeType::Integer => "int",
            AttributeType::Decimal => "float",
            AttributeType::Boolean => "boolean",
            AttributeType::Date => "date",
            AttributeType::Options { enum_name } => enum_name,
        }
    }
}

/// Declaration of one attribute inside a custom metadata definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDef {
    pub name: String,
    pub attribute_type: AttributeType,
    #[serde(default)]
    pub multi_valued: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AttributeDef {
    pub fn new(name: impl Into<String>, attribute_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attribute_type,
            multi_valued: false,
            description: None,
        }
    }

    /// Allow the attribute to hold a list of values.
    pub fn multi_valued(mut self) -> Self {
        self.multi_valued = true;
        self
    }
}

/// Logo shown next to the custom metadata in the catalog UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Logo {
    Emoji(String),
    ImageUrl(String),
}

/// Custom metadata definition to be provisioned on first use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    /// Display name, unique across the catalog.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub attributes: Vec<AttributeDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<Logo>,
    /// Badges created alongside the definition. Creation is best-effort.
    #[serde(default)]
    pub badges: Vec<BadgeSpec>,
}

impl SchemaDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            attributes: Vec::new(),
            logo: None,
            badges: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, attribute: AttributeDef) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_logo(mut self, logo: Logo) -> Self {
        self.logo = Some(logo);
        self
    }

    pub fn with_badge(mut self, badge: BadgeSpec) -> Self {
        self.badges.push(badge);
        self
    }

    /// Check the definition before sending it to the catalog.
    pub fn validate(&self) -> CatalogResult<()> {
        if self.name.trim().is_empty() {
            return Err(CatalogError::InvalidRequest {
                status: 0,
                message: "custom metadata name is empty".to_string(),
            });
        }
        if self.attributes.is_empty() {
            return Err(CatalogError::InvalidRequest {
                status: 0,
                message: format!("custom metadata '{}' declares no attributes", self.name),
            });
        }
        for badge in &self.badges {
            if !self.attributes.iter().any(|a| a.name == badge.attribute) {
                return Err(CatalogError::UnknownAttribute {
                    schema: self.name.clone(),
                    attribute: badge.attribute.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Attribute of a registered definition, with its catalog-internal name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredAttribute {
    pub name: String,
    pub internal_name: String,
    pub attribute_type: AttributeType,
    #[serde(default)]
    pub multi_valued: bool,
}

/// Custom metadata definition as the catalog knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredSchema {
    pub id: SchemaId,
    pub name: String,
    pub attributes: Vec<RegisteredAttribute>,
}

impl RegisteredSchema {
    /// Typed key for one of this definition's attributes.
    pub fn key(&self, attribute: &str) -> CatalogResult<CustomMetadataKey> {
        self.attribute(attribute).map(|a| CustomMetadataKey {
            schema: self.name.clone(),
            attribute: a.name.clone(),
        })
    }

    /// Keys for every attribute of this definition.
    pub fn keys(&self) -> Vec<CustomMetadataKey> {
        self.attributes
            .iter()
            .map(|a| CustomMetadataKey {
                schema: self.name.clone(),
                attribute: a.name.clone(),
            })
            .collect()
    }

    /// Look up an attribute by display name.
    pub fn attribute(&self, name: &str) -> CatalogResult<&RegisteredAttribute> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| CatalogError::UnknownAttribute {
                schema: self.name.clone(),
                attribute: name.to_string(),
            })
    }

    /// Look up an attribute by catalog-internal name.
    pub fn attribute_by_internal_name(&self, internal_name: &str) -> Option<&RegisteredAttribute> {
        self.attributes
            .iter()
            .find(|a| a.internal_name == internal_name)
    }

    /// Attribute name used when requesting the value in a search.
    pub fn search_attribute(&self, key: &CustomMetadataKey) -> CatalogResult<String> {
        if key.schema != self.name {
            return Err(CatalogError::UnknownSchema {
                schema: key.schema.clone(),
            });
        }
        let attribute = self.attribute(&key.attribute)?;
        Ok(format!("{}.{}", self.id, attribute.internal_name))
    }
}

/// Validated reference to one custom metadata attribute.
///
/// Only obtainable from a [`RegisteredSchema`], so holding a key means the
/// definition and the attribute exist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CustomMetadataKey {
    schema: String,
    attribute: String,
}

impl CustomMetadataKey {
    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }
}

impl fmt::Display for CustomMetadataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.attribute)
    }
}

/// Options enumeration used by `Options` attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDefinition {
    pub name: String,
    pub values: Vec<String>,
}

impl EnumDefinition {
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// Options enumeration as the catalog knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredEnum {
    pub name: String,
    pub values: Vec<String>,
}

/// Comparison applied by a badge condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeOperator {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl BadgeOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeOperator::Eq => "eq",
            BadgeOperator::Neq => "neq",
            BadgeOperator::Lt => "lt",
            BadgeOperator::Lte => "lte",
            BadgeOperator::Gt => "gt",
            BadgeOperator::Gte => "gte",
        }
    }
}

/// Color a badge takes when its condition holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeColor {
    Green,
    Yellow,
    Red,
    Gray,
}

impl BadgeColor {
    pub fn hex(&self) -> &'static str {
        match self {
            BadgeColor::Green => "#047960",
            BadgeColor::Yellow => "#F7B43D",
            BadgeColor::Red => "#BF1B1B",
            BadgeColor::Gray => "#525C73",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeCondition {
    pub operator: BadgeOperator,
    /// Literal compared against the attribute; strings must be quoted.
    pub value: String,
    pub color: BadgeColor,
}

impl BadgeCondition {
    pub fn new(operator: BadgeOperator, value: impl Into<String>, color: BadgeColor) -> Self {
        Self {
            operator,
            value: value.into(),
            color,
        }
    }
}

/// Badge displayed over one custom metadata attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeSpec {
    pub name: String,
    /// Display name of the attribute the badge summarizes.
    pub attribute: String,
    pub conditions: Vec<BadgeCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl BadgeSpec {
    pub fn new(attribute: impl Into<String>, conditions: Vec<BadgeCondition>) -> Self {
        let attribute = attribute.into();
        Self {
            name: attribute.clone(),
            attribute,
            conditions,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

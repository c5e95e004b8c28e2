//! JSON shapes of the catalog REST API.
//!
//! Custom metadata travels under catalog-internal names on the wire; the
//! conversions here translate to and from display names using the
//! definitions the gateway has resolved.

use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::change::ChangeSet;
use crate::error::{CatalogError, CatalogResult};
use crate::ids::{EntityRef, SchemaId};
use crate::metadata::{
    AttributeDef, AttributeType, BadgeSpec, EnumDefinition, Logo, RegisteredAttribute,
    RegisteredEnum, RegisteredSchema, SchemaDefinition,
};
use crate::model::{AssetField, EntitySnapshot};

const MAX_VALUES: i64 = 2_147_483_647;

fn invalid(message: impl Into<String>) -> CatalogError {
    CatalogError::InvalidResponse {
        message: message.into(),
    }
}

fn attribute_def_to_wire(attribute: &AttributeDef) -> Value {
    let base_type = attribute.attribute_type.type_name();
    let type_name = if attribute.multi_valued {
        format!("array<{base_type}>")
    } else {
        base_type.to_string()
    };

    let mut options = Map::new();
    options.insert(
        "applicableEntityTypes".into(),
        Value::String("[\"Asset\"]".into()),
    );
    options.insert(
        "multiValueSelect".into(),
        Value::String(attribute.multi_valued.to_string()),
    );
    options.insert("primitiveType".into(), Value::String(base_type.to_string()));
    match &attribute.attribute_type {
        AttributeType::Url => {
            options.insert("customType".into(), Value::String("url".into()));
        }
        AttributeType::Options { enum_name } => {
            options.insert("isEnum".into(), Value::String("true".into()));
            options.insert("enumType".into(), Value::String(enum_name.clone()));
        }
        _ => {}
    }

    json!({
        "name": attribute.name,
        "displayName": attribute.name,
        "description": attribute.description.clone().unwrap_or_default(),
        "typeName": type_name,
        "cardinality": if attribute.multi_valued { "SET" } else { "SINGLE" },
        "isOptional": true,
        "isIndexable": true,
        "isUnique": false,
        "valuesMinCount": 0,
        "valuesMaxCount": if attribute.multi_valued { MAX_VALUES } else { 1 },
        "options": options,
    })
}

/// Body of a create request for one custom metadata definition.
pub(crate) fn schema_definition_to_wire(definition: &SchemaDefinition) -> Value {
    let options = match &definition.logo {
        Some(Logo::Emoji(emoji)) => json!({ "logoType": "emoji", "emoji": emoji }),
        Some(Logo::ImageUrl(url)) => json!({ "logoType": "image", "logoUrl": url }),
        None => json!({}),
    };

    json!({
        "businessMetadataDefs": [{
            "category": "BUSINESS_METADATA",
            "name": definition.name,
            "displayName": definition.name,
            "description": definition.description.clone().unwrap_or_default(),
            "attributeDefs": definition.attributes.iter().map(attribute_def_to_wire).collect::<Vec<_>>(),
            "options": options,
        }]
    })
}

fn option_str<'a>(options: Option<&'a Value>, key: &str) -> Option<&'a str> {
    options.and_then(|o| o.get(key)).and_then(Value::as_str)
}

fn registered_attribute_from_wire(value: &Value) -> CatalogResult<Option<RegisteredAttribute>> {
    let options = value.get("options");
    if option_str(options, "isArchived") == Some("true") {
        return Ok(None);
    }

    let internal_name = value
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("attribute definition without name"))?;
    let name = value
        .get("displayName")
        .and_then(Value::as_str)
        .unwrap_or(internal_name);
    let type_name = value
        .get("typeName")
        .and_then(Value::as_str)
        .unwrap_or("string");

    let (base_type, multi_valued) = match type_name
        .strip_prefix("array<")
        .and_then(|t| t.strip_suffix('>'))
    {
        Some(inner) => (inner, true),
        None => (type_name, false),
    };

    let attribute_type = if option_str(options, "isEnum") == Some("true") {
        AttributeType::Options {
            enum_name: option_str(options, "enumType")
                .unwrap_or(base_type)
                .to_string(),
        }
    } else if option_str(options, "customType") == Some("url") {
        AttributeType::Url
    } else {
        match base_type {
            "int" | "long" => AttributeType::Integer,
            "float" | "double" => AttributeType::Decimal,
            "boolean" => AttributeType::Boolean,
            "date" => AttributeType::Date,
            _ => AttributeType::Text,
        }
    };

    Ok(Some(RegisteredAttribute {
        name: name.to_string(),
        internal_name: internal_name.to_string(),
        attribute_type,
        multi_valued,
    }))
}

pub(crate) fn registered_schema_from_wire(value: &Value) -> CatalogResult<RegisteredSchema> {
    let id = value
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("custom metadata definition without name"))?;
    let name = value
        .get("displayName")
        .and_then(Value::as_str)
        .unwrap_or(id);

    let mut attributes = Vec::new();
    if let Some(defs) = value.get("attributeDefs").and_then(Value::as_array) {
        for def in defs {
            if let Some(attribute) = registered_attribute_from_wire(def)? {
                attributes.push(attribute);
            }
        }
    }

    Ok(RegisteredSchema {
        id: SchemaId::new(id),
        name: name.to_string(),
        attributes,
    })
}

/// Find a definition by display name in a typedef listing.
pub(crate) fn find_schema_in_typedefs(
    typedefs: &Value,
    name: &str,
) -> CatalogResult<Option<RegisteredSchema>> {
    let Some(defs) = typedefs.get("businessMetadataDefs").and_then(Value::as_array) else {
        return Ok(None);
    };
    defs.iter()
        .find(|d| d.get("displayName").and_then(Value::as_str) == Some(name))
        .map(registered_schema_from_wire)
        .transpose()
}

/// First definition returned by a create call.
pub(crate) fn created_schema_from_wire(response: &Value) -> CatalogResult<RegisteredSchema> {
    response
        .get("businessMetadataDefs")
        .and_then(Value::as_array)
        .and_then(|defs| defs.first())
        .ok_or_else(|| invalid("create response carries no custom metadata definition"))
        .and_then(registered_schema_from_wire)
}

pub(crate) fn enum_definition_to_wire(definition: &EnumDefinition) -> Value {
    let elements: Vec<Value> = definition
        .values
        .iter()
        .enumerate()
        .map(|(ordinal, value)| json!({ "value": value, "ordinal": ordinal }))
        .collect();
    json!({
        "enumDefs": [{
            "category": "ENUM",
            "name": definition.name,
            "elementDefs": elements,
        }]
    })
}

fn registered_enum_from_wire(value: &Value) -> CatalogResult<RegisteredEnum> {
    let name = value
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("enum definition without name"))?;
    let mut elements: Vec<(i64, String)> = value
        .get("elementDefs")
        .and_then(Value::as_array)
        .map(|defs| {
            defs.iter()
                .filter_map(|d| {
                    let v = d.get("value").and_then(Value::as_str)?;
                    let ordinal = d.get("ordinal").and_then(Value::as_i64).unwrap_or(0);
                    Some((ordinal, v.to_string()))
                })
                .collect()
        })
        .unwrap_or_default();
    elements.sort_by_key(|(ordinal, _)| *ordinal);

    Ok(RegisteredEnum {
        name: name.to_string(),
        values: elements.into_iter().map(|(_, v)| v).collect(),
    })
}

pub(crate) fn find_enum_in_typedefs(
    typedefs: &Value,
    name: &str,
) -> CatalogResult<Option<RegisteredEnum>> {
    let Some(defs) = typedefs.get("enumDefs").and_then(Value::as_array) else {
        return Ok(None);
    };
    defs.iter()
        .find(|d| d.get("name").and_then(Value::as_str) == Some(name))
        .map(registered_enum_from_wire)
        .transpose()
}

pub(crate) fn created_enum_from_wire(response: &Value) -> CatalogResult<RegisteredEnum> {
    response
        .get("enumDefs")
        .and_then(Value::as_array)
        .and_then(|defs| defs.first())
        .ok_or_else(|| invalid("create response carries no enum definition"))
        .and_then(registered_enum_from_wire)
}

/// Badge entity for the bulk endpoint.
pub(crate) fn badge_to_wire(schema: &RegisteredSchema, badge: &BadgeSpec) -> CatalogResult<Value> {
    let attribute = schema.attribute(&badge.attribute)?;
    let metadata_attribute = format!("{}.{}", schema.id, attribute.internal_name);
    let conditions: Vec<Value> = badge
        .conditions
        .iter()
        .map(|c| {
            json!({
                "badgeConditionOperator": c.operator.as_str(),
                "badgeConditionValue": c.value,
                "badgeConditionColorhex": c.color.hex(),
            })
        })
        .collect();

    let mut attributes = json!({
        "name": badge.name,
        "qualifiedName": format!("badges/global/{metadata_attribute}"),
        "badgeMetadataAttribute": metadata_attribute,
        "badgeConditions": conditions,
    });
    if let Some(description) = &badge.description {
        attributes["userDescription"] = Value::String(description.clone());
    }

    Ok(json!({
        "entities": [{ "typeName": "Badge", "attributes": attributes }]
    }))
}

/// Bulk body for a change set, custom metadata keyed by internal names.
pub(crate) fn change_set_to_wire(
    change: &ChangeSet,
    schemas: &[Arc<RegisteredSchema>],
) -> CatalogResult<Value> {
    let target = change.target();

    let mut attributes = Map::new();
    if let Some(qualified_name) = &target.qualified_name {
        attributes.insert("qualifiedName".into(), Value::String(qualified_name.clone()));
    }
    if let Some(name) = &target.name {
        attributes.insert("name".into(), Value::String(name.clone()));
    }
    for (field, value) in change.fields() {
        attributes.insert(field.as_str().to_string(), value.clone());
    }

    let mut business = Map::new();
    for (key, value) in change.custom_metadata() {
        let schema = schemas
            .iter()
            .find(|s| s.name == key.schema())
            .ok_or_else(|| CatalogError::UnknownSchema {
                schema: key.schema().to_string(),
            })?;
        let attribute = schema.attribute(key.attribute())?;
        let entry = business
            .entry(schema.id.as_str().to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(values) = entry {
            values.insert(attribute.internal_name.clone(), value.clone());
        }
    }

    let mut entity = json!({
        "typeName": target.type_name,
        "guid": target.guid,
        "attributes": attributes,
    });
    if !business.is_empty() {
        entity["businessAttributes"] = Value::Object(business);
    }

    Ok(json!({ "entities": [entity] }))
}

fn record_custom_metadata(
    snapshot: EntitySnapshot,
    schemas: &[Arc<RegisteredSchema>],
    schema_id: &str,
    attribute_id: &str,
    value: &Value,
) -> EntitySnapshot {
    let Some(schema) = schemas.iter().find(|s| s.id.as_str() == schema_id) else {
        return snapshot;
    };
    let Some(attribute) = schema.attribute_by_internal_name(attribute_id) else {
        return snapshot;
    };
    match schema.key(&attribute.name) {
        Ok(key) => snapshot.with_custom_metadata(&key, value.clone()),
        Err(_) => snapshot,
    }
}

/// Build a snapshot from an entity returned by search or fetch.
///
/// Tag names and assigned terms sit outside `attributes` on the wire; they
/// are folded into the `classifications` and `meanings` attributes.
pub(crate) fn snapshot_from_wire(
    entity: &Value,
    schemas: &[Arc<RegisteredSchema>],
) -> CatalogResult<EntitySnapshot> {
    let guid = entity
        .get("guid")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("entity without guid"))?;
    let type_name = entity
        .get("typeName")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("entity without typeName"))?;

    let empty = Map::new();
    let attributes = entity
        .get("attributes")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let mut reference = EntityRef::new(guid, type_name);
    if let Some(qn) = attributes.get("qualifiedName").and_then(Value::as_str) {
        reference = reference.with_qualified_name(qn);
    }
    if let Some(name) = attributes.get("name").and_then(Value::as_str) {
        reference = reference.with_name(name);
    }

    let mut snapshot = EntitySnapshot::new(reference);
    for (name, value) in attributes {
        match name.split_once('.') {
            Some((schema_id, attribute_id)) => {
                snapshot = record_custom_metadata(snapshot, schemas, schema_id, attribute_id, value);
            }
            None => snapshot.insert_raw(name.clone(), value.clone()),
        }
    }

    if let Some(tags) = entity.get("classificationNames").filter(|v| v.is_array()) {
        snapshot.insert_raw(AssetField::Classifications.as_str().to_string(), tags.clone());
    } else if let Some(tags) = entity.get("classifications").filter(|v| v.is_array()) {
        snapshot.insert_raw(AssetField::Classifications.as_str().to_string(), tags.clone());
    }
    if !attributes.contains_key(AssetField::Meanings.as_str()) {
        if let Some(terms) = entity.get("meanings").filter(|v| v.is_array()) {
            snapshot.insert_raw(AssetField::Meanings.as_str().to_string(), terms.clone());
        }
    }

    if let Some(business) = entity.get("businessAttributes").and_then(Value::as_object) {
        for (schema_id, values) in business {
            if let Some(values) = values.as_object() {
                for (attribute_id, value) in values {
                    snapshot = record_custom_metadata(snapshot, schemas, schema_id, attribute_id, value);
                }
            }
        }
    }

    Ok(snapshot)
}

/// Reference to the entity a bulk mutation touched, if any was reported.
pub(crate) fn mutated_reference(response: &Value) -> Option<EntityRef> {
    let mutated = response.get("mutatedEntities")?;
    ["UPDATE", "PARTIAL_UPDATE", "CREATE"]
        .iter()
        .filter_map(|kind| mutated.get(*kind).and_then(Value::as_array))
        .flatten()
        .find_map(|entity| {
            let guid = entity.get("guid").and_then(Value::as_str)?;
            let type_name = entity.get("typeName").and_then(Value::as_str)?;
            let mut reference = EntityRef::new(guid, type_name);
            if let Some(qn) = entity
                .get("attributes")
                .and_then(|a| a.get("qualifiedName"))
                .and_then(Value::as_str)
            {
                reference = reference.with_qualified_name(qn);
            }
            Some(reference)
        })
}

/// Id of the group in a group listing whose alias matches `alias`.
///
/// The listing filter is a case-insensitive pattern, so an exact match is
/// preferred over the first record.
pub(crate) fn group_id_from_wire(response: &Value, alias: &str) -> Option<String> {
    let records = response.get("records").and_then(Value::as_array)?;
    let alias_of = |r: &Value| r.get("alias").and_then(Value::as_str).map(str::to_string);
    records
        .iter()
        .find(|r| alias_of(r).as_deref() == Some(alias))
        .or_else(|| {
            records
                .iter()
                .find(|r| alias_of(r).is_some_and(|a| a.eq_ignore_ascii_case(alias)))
        })
        .and_then(|r| r.get("id"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Usernames in one page of a group member listing.
pub(crate) fn usernames_from_wire(response: &Value) -> Vec<String> {
    response
        .get("records")
        .and_then(Value::as_array)
        .map(|records| {
            records
                .iter()
                .filter_map(|r| r.get("username").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Guid assigned to the first entity a bulk call created.
pub(crate) fn assigned_guid(response: &Value) -> Option<String> {
    response
        .get("guidAssignments")
        .and_then(Value::as_object)
        .and_then(|m| m.values().next())
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| mutated_reference(response).map(|r| r.guid))
}

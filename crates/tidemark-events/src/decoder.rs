//! Event envelope decoder
//!
//! Turns a raw delivery into a [`DecodedEvent`]. Two body shapes are
//! accepted: the envelope document itself, and a serverless-style wrapper
//! whose `body` field holds the envelope as a JSON string.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::debug;

use tidemark_catalog::EntityRef;

use crate::envelope::RawEnvelope;
use crate::error::DecodeError;
use crate::event::{ChangeKind, DecodedEvent};

/// Decode a raw delivery body.
pub fn decode(raw: &[u8]) -> Result<DecodedEvent, DecodeError> {
    let value: Value =
        serde_json::from_slice(raw).map_err(|e| DecodeError::malformed(e.to_string()))?;
    decode_value(value)
}

/// Decode an already-parsed delivery body.
pub fn decode_value(value: Value) -> Result<DecodedEvent, DecodeError> {
    let value = unwrap_body(value)?;
    let envelope = RawEnvelope::from_value(value)?;
    let created_by = envelope.msg_created_by.clone();
    let creation_time = envelope.msg_creation_time;

    let payload = envelope.into_entity_payload()?;
    let entity = match payload.entity {
        Some(Value::Object(entity)) => entity,
        Some(_) => {
            return Err(DecodeError::MissingEntity {
                reason: "entity is not an object".to_string(),
            })
        }
        None => {
            return Err(DecodeError::MissingEntity {
                reason: "no entity in payload".to_string(),
            })
        }
    };

    let guid = required_str(&entity, "guid")?;
    let type_name = required_str(&entity, "typeName")?;
    let attributes = entity
        .get("attributes")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let mut reference = EntityRef::new(guid, type_name);
    if let Some(qn) = attributes.get("qualifiedName").and_then(Value::as_str) {
        reference = reference.with_qualified_name(qn);
    }
    if let Some(name) = attributes.get("name").and_then(Value::as_str) {
        reference = reference.with_name(name);
    }

    let kind = payload
        .operation_type
        .as_deref()
        .map(ChangeKind::from_operation)
        .unwrap_or_else(|| ChangeKind::Other("UNSPECIFIED".to_string()));

    let event_time = payload
        .event_time
        .or(creation_time)
        .and_then(DateTime::<Utc>::from_timestamp_millis);

    debug!(guid = %reference.guid, type_name = %reference.type_name, kind = %kind, "Decoded entity notification");

    Ok(DecodedEvent {
        reference,
        kind,
        event_time,
        created_by,
        event_attributes: attributes,
    })
}

/// Strip a serverless wrapper, if present.
fn unwrap_body(value: Value) -> Result<Value, DecodeError> {
    let Value::Object(mut outer) = value else {
        return Err(DecodeError::malformed("delivery is not a JSON object"));
    };
    if outer.contains_key("payload") {
        return Ok(Value::Object(outer));
    }
    match outer.remove("body") {
        Some(Value::String(body)) => serde_json::from_str(&body)
            .map_err(|e| DecodeError::malformed(format!("wrapped body: {e}"))),
        Some(body @ Value::Object(_)) => Ok(body),
        Some(_) => Err(DecodeError::malformed("wrapped body is neither string nor object")),
        None => Ok(Value::Object(outer)),
    }
}

fn required_str(entity: &Map<String, Value>, key: &str) -> Result<String, DecodeError> {
    entity
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| DecodeError::MissingEntity {
            reason: format!("entity has no {key}"),
        })
}

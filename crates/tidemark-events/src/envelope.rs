//! Delivery envelope for catalog notifications.

use serde::Deserialize;
use serde_json::Value;

use crate::error::DecodeError;

/// Payload type of entity change notifications.
pub const ENTITY_NOTIFICATION_V2: &str = "ENTITY_NOTIFICATION_V2";

/// Envelope as delivered, before the payload type is known.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEnvelope {
    #[serde(default)]
    pub source: Value,
    #[serde(default)]
    pub version: Value,
    /// Milliseconds since the epoch at which the catalog emitted the message.
    #[serde(default)]
    pub msg_creation_time: Option<i64>,
    #[serde(default)]
    pub msg_created_by: Option<String>,
    pub payload: Value,
}

impl RawEnvelope {
    /// Parse from a JSON document.
    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        serde_json::from_value(value).map_err(|e| DecodeError::malformed(e.to_string()))
    }

    /// Payload type, e.g. `ENTITY_NOTIFICATION_V2`.
    pub fn payload_type(&self) -> Option<&str> {
        self.payload.get("type").and_then(Value::as_str)
    }

    /// Interpret the payload as an entity notification.
    pub fn into_entity_payload(self) -> Result<EntityPayload, DecodeError> {
        match self.payload_type() {
            Some(ENTITY_NOTIFICATION_V2) => {}
            Some(other) => {
                return Err(DecodeError::UnsupportedPayload {
                    payload_type: other.to_string(),
                })
            }
            None => return Err(DecodeError::malformed("payload has no type")),
        }
        serde_json::from_value(self.payload).map_err(|e| DecodeError::malformed(e.to_string()))
    }
}

/// Body of an `ENTITY_NOTIFICATION_V2` payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityPayload {
    #[serde(rename = "type")]
    pub payload_type: String,
    #[serde(default)]
    pub operation_type: Option<String>,
    #[serde(default)]
    pub event_time: Option<i64>,
    #[serde(default)]
    pub entity: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rejects_other_payload_types() {
        let envelope = RawEnvelope::from_value(json!({
            "payload": { "type": "ADMIN_EVENT", "operationType": "USER_LOGIN" }
        }))
        .unwrap();

        assert_eq!(envelope.payload_type(), Some("ADMIN_EVENT"));
        assert!(matches!(
            envelope.into_entity_payload(),
            Err(DecodeError::UnsupportedPayload { ref payload_type }) if payload_type == "ADMIN_EVENT"
        ));
    }

    #[test]
    fn test_missing_payload_is_malformed() {
        let err = RawEnvelope::from_value(json!({ "source": {} })).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { .. }));
    }
}

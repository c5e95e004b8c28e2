//! Error types for the tidemark-events crate.

use thiserror::Error;

/// Reasons a delivery cannot be turned into a reconcilable event.
///
/// None of these are failures of the handler: the catalog emits many
/// notifications a policy has no interest in, and redelivering a malformed
/// body will not fix it.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Body is not JSON or does not have the envelope shape.
    #[error("Malformed event: {reason}")]
    Malformed { reason: String },

    /// Envelope carries a payload type other than entity notifications.
    #[error("Unsupported payload type: {payload_type}")]
    UnsupportedPayload { payload_type: String },

    /// Entity notification without a usable entity.
    #[error("Entity notification carries no entity: {reason}")]
    MissingEntity { reason: String },
}

impl DecodeError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        DecodeError::Malformed {
            reason: reason.into(),
        }
    }

    /// Returns true if the event should be acknowledged without processing.
    pub fn is_expected_noop(&self) -> bool {
        matches!(
            self,
            DecodeError::Malformed { .. }
                | DecodeError::UnsupportedPayload { .. }
                | DecodeError::MissingEntity { .. }
        )
    }

    /// Short label used in logs and outcome reasons.
    pub fn kind(&self) -> &'static str {
        match self {
            DecodeError::Malformed { .. } => "malformed",
            DecodeError::UnsupportedPayload { .. } => "unsupported_payload",
            DecodeError::MissingEntity { .. } => "missing_entity",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_decode_errors_are_noops() {
        assert!(DecodeError::malformed("eof").is_expected_noop());
        assert!(DecodeError::UnsupportedPayload {
            payload_type: "ADMIN_EVENT".to_string()
        }
        .is_expected_noop());
    }

    #[test]
    fn test_error_display() {
        let err = DecodeError::UnsupportedPayload {
            payload_type: "ADMIN_EVENT".to_string(),
        };
        assert_eq!(err.to_string(), "Unsupported payload type: ADMIN_EVENT");
        assert_eq!(err.kind(), "unsupported_payload");
    }
}

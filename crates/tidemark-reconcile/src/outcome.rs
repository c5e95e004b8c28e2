//! Result of reconciling one event.

use serde::Serialize;
use std::fmt;

use tidemark_catalog::EntityRef;
use tidemark_events::DecodeError;

use crate::error::ReconcileError;

/// Why a reconciliation ended without writing.
#[derive(Debug)]
pub enum NoOpReason {
    /// The delivery did not decode to an entity notification.
    Undecodable(DecodeError),
    /// The policy declined the event.
    Rejected,
    /// The policy's custom metadata definition could not be provisioned.
    SchemaUnavailable { schema: String, cause: ReconcileError },
    /// The entity does not exist, or is not yet searchable.
    EntityNotFound,
    /// The policy proposed no patch.
    NoChangeProposed,
    /// The proposed patch matches the current state.
    Unchanged,
}

impl NoOpReason {
    pub fn label(&self) -> &'static str {
        match self {
            NoOpReason::Undecodable(e) => e.kind(),
            NoOpReason::Rejected => "rejected",
            NoOpReason::SchemaUnavailable { .. } => "schema_unavailable",
            NoOpReason::EntityNotFound => "entity_not_found",
            NoOpReason::NoChangeProposed => "no_change_proposed",
            NoOpReason::Unchanged => "unchanged",
        }
    }
}

impl fmt::Display for NoOpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoOpReason::Undecodable(e) => write!(f, "{e}"),
            NoOpReason::SchemaUnavailable { schema, cause } => {
                write!(f, "custom metadata {schema} unavailable: {cause}")
            }
            other => f.write_str(other.label()),
        }
    }
}

/// Entity written back by a reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedEntity {
    pub reference: EntityRef,
    /// Attribute names the patch assigned.
    pub changed: Vec<String>,
}

/// Terminal state of one reconciliation.
#[derive(Debug)]
pub enum ReconciliationOutcome {
    NoOp(NoOpReason),
    Updated(UpdatedEntity),
    Failed(ReconcileError),
}

impl ReconciliationOutcome {
    pub fn is_noop(&self) -> bool {
        matches!(self, ReconciliationOutcome::NoOp(_))
    }

    pub fn is_updated(&self) -> bool {
        matches!(self, ReconciliationOutcome::Updated(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ReconciliationOutcome::Failed(_))
    }

    /// Failed, and worth redelivering.
    pub fn is_transient_failure(&self) -> bool {
        matches!(self, ReconciliationOutcome::Failed(e) if e.is_transient())
    }

    pub fn noop_reason(&self) -> Option<&NoOpReason> {
        match self {
            ReconciliationOutcome::NoOp(reason) => Some(reason),
            _ => None,
        }
    }

    /// Serializable summary for responses and logs.
    pub fn summary(&self) -> OutcomeSummary {
        match self {
            ReconciliationOutcome::NoOp(reason) => OutcomeSummary {
                outcome: "noop",
                reason: Some(reason.label().to_string()),
                entity: None,
                changed: Vec::new(),
                error: None,
            },
            ReconciliationOutcome::Updated(updated) => OutcomeSummary {
                outcome: "updated",
                reason: None,
                entity: Some(updated.reference.clone()),
                changed: updated.changed.clone(),
                error: None,
            },
            ReconciliationOutcome::Failed(e) => OutcomeSummary {
                outcome: if e.is_transient() { "retry" } else { "failed" },
                reason: None,
                entity: None,
                changed: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }
}

/// Flattened view of an outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeSummary {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<EntityRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changed: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

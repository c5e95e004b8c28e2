//! Error types for reconciliation.

use thiserror::Error;

use tidemark_catalog::CatalogError;

/// Result type for reconciliation operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Errors that end a reconciliation as failed.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A catalog call failed.
    #[error("Catalog call {operation} failed: {source}")]
    Catalog {
        operation: &'static str,
        #[source]
        source: CatalogError,
    },

    /// A custom metadata definition or enumeration could not be provisioned.
    #[error("Provisioning of {name} failed: {message}")]
    Provisioning {
        name: String,
        message: String,
        transient: bool,
    },

    /// A create reported a conflict, yet the winner's definition cannot be read.
    #[error("{name} exists according to the catalog but cannot be looked up")]
    ProvisioningLost { name: String },

    /// A named catalog object an operator command starts from does not exist.
    #[error("No {kind} named '{name}'")]
    Missing { kind: &'static str, name: String },

    /// A policy could not compute its target state.
    #[error("Policy {policy} failed: {message}")]
    Policy { policy: String, message: String },
}

impl ReconcileError {
    pub fn catalog(operation: &'static str, source: CatalogError) -> Self {
        ReconcileError::Catalog { operation, source }
    }

    pub fn missing(kind: &'static str, name: impl Into<String>) -> Self {
        ReconcileError::Missing {
            kind,
            name: name.into(),
        }
    }

    pub fn policy(policy: impl Into<String>, message: impl Into<String>) -> Self {
        ReconcileError::Policy {
            policy: policy.into(),
            message: message.into(),
        }
    }

    /// Returns true if redelivering the event may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ReconcileError::Catalog { source, .. } => source.is_transient(),
            ReconcileError::Provisioning { transient, .. } => *transient,
            ReconcileError::ProvisioningLost { .. } => true,
            ReconcileError::Missing { .. } => false,
            ReconcileError::Policy { .. } => false,
        }
    }
}

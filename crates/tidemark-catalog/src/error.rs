//! Catalog gateway error types
//!
//! Every failure of a catalog call is classified as transient (worth a
//! redelivery by the invoking runtime) or permanent.

use thiserror::Error;

/// Error that can occur while talking to the metadata catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    // Expected outcomes
    /// The requested entity or definition does not exist.
    #[error("not found: {identifier}")]
    NotFound { identifier: String },

    /// A create collided with an existing object of the same name.
    #[error("conflict: {message}")]
    Conflict { message: String },

    // Transient errors
    /// The call did not complete within its time budget.
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// The catalog could not be reached.
    #[error("connection failed: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The catalog answered with a throttling or server-side error.
    #[error("catalog unavailable (status {status}): {message}")]
    Unavailable { status: u16, message: String },

    // Permanent errors
    /// The API token was rejected.
    #[error("authentication rejected by catalog")]
    Unauthorized,

    /// The API token lacks a permission required for the call.
    #[error("permission denied: {message}")]
    Forbidden { message: String },

    /// The catalog rejected the request itself.
    #[error("invalid request (status {status}): {message}")]
    InvalidRequest { status: u16, message: String },

    /// The catalog answered with a body we could not interpret.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    /// Custom metadata referenced by name has not been registered.
    #[error("unknown custom metadata: {schema}")]
    UnknownSchema { schema: String },

    /// Attribute is not declared by the named custom metadata.
    #[error("attribute '{attribute}' is not defined in custom metadata '{schema}'")]
    UnknownAttribute { schema: String, attribute: String },

    /// Gateway configuration is unusable.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

impl CatalogError {
    /// Map a non-success HTTP status and its body to an error.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let message = body.into();
        match status {
            401 => CatalogError::Unauthorized,
            403 => CatalogError::Forbidden { message },
            404 => CatalogError::NotFound {
                identifier: message,
            },
            409 => CatalogError::Conflict { message },
            429 | 500..=599 => CatalogError::Unavailable { status, message },
            _ => CatalogError::InvalidRequest { status, message },
        }
    }

    /// Build a connection error that keeps its cause.
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        CatalogError::Connection {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns true if the failure may succeed when the event is redelivered.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CatalogError::Timeout { .. }
                | CatalogError::Connection { .. }
                | CatalogError::Unavailable { .. }
        )
    }

    /// Returns true if a create lost a race against another writer.
    pub fn is_conflict(&self) -> bool {
        matches!(self, CatalogError::Conflict { .. })
    }

    /// Returns true if the target does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound { .. })
    }
}

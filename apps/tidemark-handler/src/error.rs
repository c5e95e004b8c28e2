//! Command errors and exit codes.

use thiserror::Error;

use tidemark_catalog::{CatalogError, ConfigError};
use tidemark_reconcile::ReconcileError;

/// Exit codes
/// - 0: Success
/// - 1: General error
/// - 2: Configuration error
/// - 3: Transient failure, retrying may succeed
/// - 4: Invalid input
pub type HandlerResult<T> = Result<T, HandlerError>;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("Unable to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl HandlerError {
    pub fn exit_code(&self) -> i32 {
        match self {
            HandlerError::Config(_) => 2,
            HandlerError::Catalog(e) if e.is_transient() => 3,
            HandlerError::Reconcile(e) if e.is_transient() => 3,
            HandlerError::InvalidInput(_) | HandlerError::Reconcile(ReconcileError::Missing { .. }) => 4,
            _ => 1,
        }
    }

    /// Print the error to stderr.
    pub fn print(&self) {
        eprintln!("Error: {self}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            HandlerError::Config(ConfigError::MissingVar("ATLAN_API_KEY".into())).exit_code(),
            2
        );
        assert_eq!(
            HandlerError::Catalog(CatalogError::Unavailable {
                status: 503,
                message: "down".into()
            })
            .exit_code(),
            3
        );
        assert_eq!(HandlerError::Catalog(CatalogError::Unauthorized).exit_code(), 1);
        assert_eq!(HandlerError::InvalidInput("x".into()).exit_code(), 4);
        assert_eq!(
            HandlerError::Reconcile(ReconcileError::missing("group", "Stewards")).exit_code(),
            4
        );
    }
}

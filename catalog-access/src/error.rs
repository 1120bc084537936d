//! Error types for the catalog access core

use thiserror::Error;

use crate::model::CategoryId;
use crate::repository::{RepositoryError, RepositoryErrorKind};

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the crate
///
/// Large error variants are boxed to reduce stack size
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Malformed search criteria or entity input; never retried
    #[error("Validation error: {0}")]
    Validation(String),

    /// A category move that would make a node its own ancestor
    #[error("Cycle rejected: category {child} cannot be placed under {parent}")]
    Cycle {
        /// Node being attached or moved
        child: CategoryId,
        /// Requested parent
        parent: CategoryId,
    },

    /// Referenced entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Entity with the same identity already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage failure that may succeed if the caller retries
    #[error("Transient storage error: {0}")]
    TransientStorage(Box<RepositoryError>),

    /// Permanent storage failure
    #[error("Storage error: {0}")]
    Storage(Box<RepositoryError>),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the caller may retry the operation unchanged
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::TransientStorage(_))
    }

    pub(crate) fn not_found(entity_type: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{entity_type} {id}"))
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl From<RepositoryError> for Error {
    fn from(err: RepositoryError) -> Self {
        if err.is_retriable() {
            return Error::TransientStorage(Box::new(err));
        }
        match err.kind {
            RepositoryErrorKind::NotFound => Error::NotFound(describe(&err)),
            RepositoryErrorKind::AlreadyExists => Error::Conflict(describe(&err)),
            RepositoryErrorKind::ValidationFailed => Error::Validation(err.message),
            _ => Error::Storage(Box::new(err)),
        }
    }
}

fn describe(err: &RepositoryError) -> String {
    match (&err.entity_type, &err.entity_id) {
        (Some(entity_type), Some(entity_id)) => format!("{entity_type} {entity_id}"),
        _ => err.message.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RepositoryOperation;

    #[test]
    fn test_timeout_is_transient() {
        let err: Error = RepositoryError::timeout(RepositoryOperation::Fetch, "5s").into();
        assert!(matches!(err, Error::TransientStorage(_)));
        assert!(err.is_retriable());
    }

    #[test]
    fn test_classification() {
        let err: Error = RepositoryError::not_found("Product", 3).into();
        assert!(matches!(err, Error::NotFound(ref what) if what == "Product 3"));

        let err: Error = RepositoryError::already_exists("User", 8).into();
        assert!(matches!(err, Error::Conflict(_)));

        let err: Error =
            RepositoryError::database_error(RepositoryOperation::Save, "disk full").into();
        assert!(matches!(err, Error::Storage(_)));
        assert!(!err.is_retriable());
    }

    #[test]
    fn test_cycle_message() {
        let err = Error::Cycle {
            child: CategoryId::new(1),
            parent: CategoryId::new(3),
        };
        assert_eq!(
            err.to_string(),
            "Cycle rejected: category 1 cannot be placed under 3"
        );
    }
}

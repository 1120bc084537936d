//! Storage backend error types
//!
//! # Example
//!
//! ```rust
//! use catalog_access::repository::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
//!
//! let error = RepositoryError::timeout(RepositoryOperation::Count, "statement timeout after 5s");
//! assert!(error.is_retriable());
//! assert!(matches!(error.kind, RepositoryErrorKind::Timeout));
//! ```

use std::fmt;

/// Storage call that was running when the error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    /// Counting rows matching a predicate
    Count,
    /// Fetching a page of root entities
    Fetch,
    /// Fetching a single entity by id
    FetchById,
    /// Checking whether an id exists
    Exists,
    /// Inserting or updating an entity
    Save,
    /// Deleting an entity by id
    Delete,
    /// Loading a relation for many roots at once
    BatchLoad,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count => write!(f, "count"),
            Self::Fetch => write!(f, "fetch"),
            Self::FetchById => write!(f, "fetch_by_id"),
            Self::Exists => write!(f, "exists"),
            Self::Save => write!(f, "save"),
            Self::Delete => write!(f, "delete"),
            Self::BatchLoad => write!(f, "batch_load"),
        }
    }
}

/// Category of storage error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryErrorKind {
    /// Entity was not found
    NotFound,
    /// Entity already exists (duplicate key)
    AlreadyExists,
    /// Input rejected before reaching storage
    ValidationFailed,
    /// Connection to storage lost or refused
    ConnectionFailed,
    /// Operation timed out
    Timeout,
    /// Any other storage-side failure
    DatabaseError,
}

impl fmt::Display for RepositoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::AlreadyExists => write!(f, "already_exists"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::DatabaseError => write!(f, "database_error"),
        }
    }
}

/// Structured storage error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryError {
    /// The storage call that failed
    pub operation: RepositoryOperation,
    /// The category of error
    pub kind: RepositoryErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The type of entity involved (e.g. "Product")
    pub entity_type: Option<String>,
    /// The id of the entity involved
    pub entity_id: Option<String>,
}

impl RepositoryError {
    pub fn new(
        operation: RepositoryOperation,
        kind: RepositoryErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
        }
    }

    /// A lookup by id found nothing
    ///
    /// # Example
    ///
    /// ```rust
    /// use catalog_access::repository::RepositoryError;
    ///
    /// let error = RepositoryError::not_found("Category", 42);
    /// assert_eq!(error.entity_id.as_deref(), Some("42"));
    /// ```
    pub fn not_found(entity_type: impl Into<String>, entity_id: impl ToString) -> Self {
        Self::new(
            RepositoryOperation::FetchById,
            RepositoryErrorKind::NotFound,
            "Entity not found",
        )
        .with_entity(entity_type, entity_id)
    }

    /// An insert collided with an existing id
    pub fn already_exists(entity_type: impl Into<String>, entity_id: impl ToString) -> Self {
        Self::new(
            RepositoryOperation::Save,
            RepositoryErrorKind::AlreadyExists,
            "Entity already exists",
        )
        .with_entity(entity_type, entity_id)
    }

    pub fn validation_failed(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::ValidationFailed, message)
    }

    pub fn connection_failed(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::ConnectionFailed, message)
    }

    pub fn timeout(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::Timeout, message)
    }

    pub fn database_error(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::DatabaseError, message)
    }

    /// Attach the entity the error is about
    #[must_use]
    pub fn with_entity(mut self, entity_type: impl Into<String>, entity_id: impl ToString) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.to_string());
        self
    }

    /// Re-label the failing operation
    #[must_use]
    pub fn with_operation(mut self, operation: RepositoryOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Whether the failure is transient and the caller may retry
    ///
    /// The core never retries on its own; this only drives classification.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            RepositoryErrorKind::ConnectionFailed | RepositoryErrorKind::Timeout
        )
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Repository {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let (Some(entity_type), Some(entity_id)) = (&self.entity_type, &self.entity_id) {
            write!(f, " [{entity_type}: {entity_id}]")?;
        }
        Ok(())
    }
}

impl std::error::Error for RepositoryError {}

//! Storage capability consumed by the query core
//!
//! The core never talks to a database directly. It hands a [`Predicate`],
//! an [`OrderSpec`], a [`Pagination`] window and a [`FetchPlan`] to a
//! [`StorageBackend`] and expects the backend to evaluate them faithfully.
//!
//! # Features
//!
//! - **Storage capability**: [`StorageBackend`] for count, windowed fetch and CRUD
//! - **Secondary loading**: [`RelationLoader`] for keyed batch loads of one relation
//! - **Errors**: [`RepositoryError`] with operation context and retry classification
//! - **In-memory backend**: [`MemoryStore`] for tests, fixtures and the CLI
//!
//! [`Predicate`]: crate::query::Predicate
//! [`OrderSpec`]: crate::query::OrderSpec
//! [`FetchPlan`]: crate::query::FetchPlan

mod error;
mod memory;
mod pagination;
mod traits;

pub use error::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
pub use memory::MemoryStore;
pub use pagination::Pagination;
pub use traits::{RelationLoader, RepositoryResult, StorageBackend};

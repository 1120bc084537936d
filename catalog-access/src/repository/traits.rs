//! Storage capability traits
//!
//! Async methods use RPITIT (return-position `impl Trait` in traits, Rust
//! 1.75+), so backends implement them with plain `async fn` and no boxing.
//!
//! - [`StorageBackend`]: predicate evaluation, ordering, paging and CRUD
//! - [`RelationLoader`]: keyed secondary loading of one relation for many roots

use std::collections::HashMap;
use std::future::Future;

use super::error::RepositoryError;
use super::pagination::Pagination;
use crate::model::Entity;
use crate::query::{FetchPlan, OrderSpec, Predicate};

/// Result type for storage operations
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// A store able to evaluate predicate trees for entity `E`
///
/// # Example
///
/// ```rust,ignore
/// use catalog_access::repository::{Pagination, RepositoryResult, StorageBackend};
///
/// impl StorageBackend<Product> for PgProductStore {
///     async fn count(&self, predicate: &Predicate<ProductField>) -> RepositoryResult<u64> {
///         let sql = format!("SELECT count(*) FROM product WHERE {predicate}");
///         // bind and run
///         todo!()
///     }
///     // ... other methods
/// }
/// ```
pub trait StorageBackend<E: Entity>: Send + Sync {
    /// Number of roots matching `predicate`, unaffected by ordering or paging
    fn count(
        &self,
        predicate: &Predicate<E::Field>,
    ) -> impl Future<Output = RepositoryResult<u64>> + Send;

    /// A window of matching roots in `order`, with the plan's joined
    /// relations populated
    ///
    /// Relations listed in [`FetchPlan::secondary`] are left empty; the
    /// caller loads them through a [`RelationLoader`].
    fn fetch(
        &self,
        predicate: &Predicate<E::Field>,
        order: &OrderSpec<E::Field>,
        pagination: Pagination,
        plan: &FetchPlan<E::Relation>,
    ) -> impl Future<Output = RepositoryResult<Vec<E>>> + Send;

    /// A single root by id, `None` when absent
    fn fetch_by_id(
        &self,
        id: E::Id,
        plan: &FetchPlan<E::Relation>,
    ) -> impl Future<Output = RepositoryResult<Option<E>>> + Send;

    /// Whether a root with `id` exists
    fn exists(&self, id: E::Id) -> impl Future<Output = RepositoryResult<bool>> + Send;

    /// Insert a new root
    ///
    /// Assigns an id when the entity has none. An explicit id that is
    /// already taken fails with `AlreadyExists`.
    fn insert(&self, entity: E) -> impl Future<Output = RepositoryResult<E>> + Send;

    /// Insert or update a root
    ///
    /// Assigns an id when the entity has none. Updating an existing row
    /// rewrites its columns and keeps its stored relations.
    fn save(&self, entity: E) -> impl Future<Output = RepositoryResult<E>> + Send;

    /// Delete a root by id; `false` when it did not exist
    fn delete(&self, id: E::Id) -> impl Future<Output = RepositoryResult<bool>> + Send;
}

/// Loads one relation for many roots in a single round trip
///
/// Used for to-many relations that the fetch plan keeps out of the root
/// query. Roots with no related rows may be missing from the map.
pub trait RelationLoader<E: Entity>: Send + Sync {
    fn batch_load(
        &self,
        relation: E::Relation,
        ids: &[E::Id],
    ) -> impl Future<Output = RepositoryResult<HashMap<E::Id, Vec<E::Child>>>> + Send;
}

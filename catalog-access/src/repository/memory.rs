//! In-memory storage backend
//!
//! Rows are kept as full entity graphs keyed by id. Reads evaluate the
//! predicate tree in memory and materialise joined relations the way a SQL
//! `LEFT JOIN` would: one result row per combination of related rows, folded
//! back into the root. Joining a single to-many relation therefore yields
//! exact collections, while joining two reproduces the cartesian duplication
//! a relational store would produce.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};

use tokio::sync::{Mutex, RwLock};

use super::error::{RepositoryError, RepositoryOperation};
use super::pagination::Pagination;
use super::traits::{RelationLoader, RepositoryResult, StorageBackend};
use crate::model::{Entity, EntityId, EntityRelation};
use crate::query::{FetchPlan, OrderSpec, Predicate};

struct Fault {
    skip: usize,
    error: RepositoryError,
}

/// Thread-safe in-memory store for one entity type
///
/// # Example
///
/// ```rust
/// use catalog_access::model::{Product, ProductId};
/// use catalog_access::repository::{MemoryStore, StorageBackend};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store = MemoryStore::seeded([Product::new("Trail Shoe", 12_900)]);
/// let saved = store.save(Product::new("Rain Jacket", 25_000)).await.unwrap();
/// assert_eq!(saved.id, Some(ProductId::new(2)));
/// # }
/// ```
pub struct MemoryStore<E: Entity> {
    rows: RwLock<BTreeMap<E::Id, E>>,
    /// Highest id handed out or stored so far
    last_id: AtomicI64,
    fault: Mutex<Option<Fault>>,
}

impl<E: Entity> Default for MemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> MemoryStore<E> {
    /// An empty store; the first assigned id is 1
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            last_id: AtomicI64::new(0),
            fault: Mutex::new(None),
        }
    }

    /// A store pre-loaded with `rows`
    ///
    /// Rows without an id are numbered after the highest explicit id; a
    /// later row with a duplicate explicit id replaces the earlier one. Rows
    /// without an id are dropped, with a warning, once no id is left to give.
    pub fn seeded(rows: impl IntoIterator<Item = E>) -> Self {
        let rows: Vec<E> = rows.into_iter().collect();
        let mut last_id = rows
            .iter()
            .filter_map(|row| row.id())
            .map(EntityId::value)
            .fold(0, i64::max);

        let mut table = BTreeMap::new();
        for row in rows {
            let row = match row.id() {
                Some(_) => row,
                None => match last_id.checked_add(1) {
                    Some(next) => {
                        last_id = next;
                        row.assign_id(E::Id::from(next))
                    }
                    None => {
                        tracing::warn!(
                            entity = E::ENTITY_TYPE,
                            "id space exhausted, dropping seed row without id"
                        );
                        continue;
                    }
                },
            };
            if let Some(id) = row.id() {
                table.insert(id, row);
            }
        }

        Self {
            rows: RwLock::new(table),
            last_id: AtomicI64::new(last_id),
            fault: Mutex::new(None),
        }
    }

    /// Make the next storage call fail with `error`
    pub async fn inject_failure(&self, error: RepositoryError) {
        self.inject_failure_after(0, error).await;
    }

    /// Let `skip` storage calls succeed, then fail the next one with `error`
    pub async fn inject_failure_after(&self, skip: usize, error: RepositoryError) {
        *self.fault.lock().await = Some(Fault { skip, error });
    }

    /// Number of stored roots
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Stored row as last written, relations included
    pub async fn snapshot(&self, id: E::Id) -> Option<E> {
        self.rows.read().await.get(&id).cloned()
    }

    async fn check_fault(&self, operation: RepositoryOperation) -> RepositoryResult<()> {
        let mut slot = self.fault.lock().await;
        let Some(pending) = slot.as_mut() else {
            return Ok(());
        };
        if pending.skip > 0 {
            pending.skip -= 1;
            return Ok(());
        }
        match slot.take() {
            Some(pending) => Err(pending.error.with_operation(operation)),
            None => Ok(()),
        }
    }

    fn allocate_id(&self) -> RepositoryResult<E::Id> {
        let previous = self
            .last_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| last.checked_add(1))
            .map_err(|last| {
                RepositoryError::database_error(
                    RepositoryOperation::Save,
                    format!("no {} id left after {last}", E::ENTITY_TYPE),
                )
            })?;
        Ok(E::Id::from(previous + 1))
    }

    fn reserve_id(&self, id: E::Id) {
        self.last_id.fetch_max(id.value(), Ordering::SeqCst);
    }

    fn related_rows(row: &E, relation: E::Relation, table: &BTreeMap<E::Id, E>) -> Vec<E::Child> {
        row.self_join(relation, table)
            .unwrap_or_else(|| row.related(relation))
    }

    /// Build the result entity for one root, simulating joined row expansion
    fn materialize(row: &E, joined: &[E::Relation], table: &BTreeMap<E::Id, E>) -> E {
        let mut root = row.detached();
        let mut collections: Vec<(E::Relation, Vec<E::Child>)> = Vec::new();

        for &relation in joined {
            let children = Self::related_rows(row, relation, table);
            if relation.is_to_many() {
                collections.push((relation, children));
            } else {
                root.attach(relation, children);
            }
        }

        if collections.is_empty() {
            return root;
        }

        // One joined row per combination; a relation without rows still
        // contributes a single NULL column like a LEFT JOIN.
        let mut joined_rows: Vec<Vec<Option<&E::Child>>> = vec![Vec::new()];
        for (_, children) in &collections {
            joined_rows = joined_rows
                .into_iter()
                .flat_map(|prefix| {
                    let columns: Vec<Option<&E::Child>> = if children.is_empty() {
                        vec![None]
                    } else {
                        children.iter().map(Some).collect()
                    };
                    columns.into_iter().map(move |column| {
                        let mut row = prefix.clone();
                        row.push(column);
                        row
                    })
                })
                .collect();
        }

        for (position, (relation, _)) in collections.iter().enumerate() {
            let folded = joined_rows
                .iter()
                .filter_map(|joined_row| joined_row[position].cloned())
                .collect();
            root.attach(*relation, folded);
        }

        root
    }
}

impl<E: Entity> StorageBackend<E> for MemoryStore<E> {
    async fn count(&self, predicate: &Predicate<E::Field>) -> RepositoryResult<u64> {
        self.check_fault(RepositoryOperation::Count).await?;
        let rows = self.rows.read().await;
        let count = rows.values().filter(|row| predicate.matches(*row)).count();
        Ok(count as u64)
    }

    async fn fetch(
        &self,
        predicate: &Predicate<E::Field>,
        order: &OrderSpec<E::Field>,
        pagination: Pagination,
        plan: &FetchPlan<E::Relation>,
    ) -> RepositoryResult<Vec<E>> {
        self.check_fault(RepositoryOperation::Fetch).await?;
        let rows = self.rows.read().await;

        let mut matching: Vec<&E> = rows.values().filter(|row| predicate.matches(*row)).collect();
        // Stable sort over id-ordered input keeps ties in id order.
        matching.sort_by(|a, b| order.compare(*a, *b));

        let page = pagination
            .slice(matching)
            .into_iter()
            .map(|row| Self::materialize(row, plan.joined(), &rows))
            .collect();
        Ok(page)
    }

    async fn fetch_by_id(
        &self,
        id: E::Id,
        plan: &FetchPlan<E::Relation>,
    ) -> RepositoryResult<Option<E>> {
        self.check_fault(RepositoryOperation::FetchById).await?;
        let rows = self.rows.read().await;
        Ok(rows
            .get(&id)
            .map(|row| Self::materialize(row, plan.joined(), &rows)))
    }

    async fn exists(&self, id: E::Id) -> RepositoryResult<bool> {
        self.check_fault(RepositoryOperation::Exists).await?;
        Ok(self.rows.read().await.contains_key(&id))
    }

    async fn insert(&self, entity: E) -> RepositoryResult<E> {
        self.check_fault(RepositoryOperation::Save).await?;
        let mut rows = self.rows.write().await;

        let entity = match entity.id() {
            Some(id) if rows.contains_key(&id) => {
                return Err(RepositoryError::already_exists(E::ENTITY_TYPE, id));
            }
            Some(id) => {
                self.reserve_id(id);
                entity
            }
            None => entity.assign_id(self.allocate_id()?),
        };

        if let Some(id) = entity.id() {
            rows.insert(id, entity.clone());
        }
        Ok(entity)
    }

    async fn save(&self, entity: E) -> RepositoryResult<E> {
        self.check_fault(RepositoryOperation::Save).await?;
        let mut rows = self.rows.write().await;

        let (id, entity) = match entity.id() {
            Some(id) => {
                self.reserve_id(id);
                (id, entity)
            }
            None => {
                let id = self.allocate_id()?;
                (id, entity.assign_id(id))
            }
        };

        let stored = match rows.get(&id) {
            Some(previous) => {
                let mut updated = entity.detached();
                for &relation in E::Relation::ALL {
                    updated.attach(relation, previous.related(relation));
                }
                updated
            }
            None => entity.clone(),
        };
        rows.insert(id, stored);
        Ok(entity)
    }

    async fn delete(&self, id: E::Id) -> RepositoryResult<bool> {
        self.check_fault(RepositoryOperation::Delete).await?;
        Ok(self.rows.write().await.remove(&id).is_some())
    }
}

impl<E: Entity> RelationLoader<E> for MemoryStore<E> {
    async fn batch_load(
        &self,
        relation: E::Relation,
        ids: &[E::Id],
    ) -> RepositoryResult<HashMap<E::Id, Vec<E::Child>>> {
        self.check_fault(RepositoryOperation::BatchLoad).await?;
        let rows = self.rows.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| rows.get(id).map(|row| (*id, row)))
            .map(|(id, row)| (id, Self::related_rows(row, relation, &rows)))
            .filter(|(_, children)| !children.is_empty())
            .collect())
    }
}

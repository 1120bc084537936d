//! Category hierarchy maintenance backed by storage

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::instrument;

use crate::error::{Error, Result};
use crate::model::{Category, CategoryId, Entity};
use crate::query::{FetchPlan, OrderSpec, Predicate};
use crate::repository::{Pagination, StorageBackend};
use crate::tree::{CategoryTree, ParentChange};

/// Applies tree guard operations and writes the resulting parent ids
///
/// Each operation runs against a working copy of the tree under a lock, so
/// structural changes are serialised. The copy replaces the live tree only
/// after every changed row is stored; if storage fails part way, rows already
/// written are put back and the live tree is left as it was.
pub struct CategoryService<S> {
    store: Arc<S>,
    tree: Mutex<CategoryTree>,
}

impl<S> CategoryService<S>
where
    S: StorageBackend<Category>,
{
    /// Load every stored category into a tree
    ///
    /// Fails when stored parent links reference a missing row or form a cycle.
    #[instrument(skip(store))]
    pub async fn load(store: Arc<S>) -> Result<Self> {
        let rows = store
            .fetch(
                &Predicate::All,
                &OrderSpec::by_id(),
                Pagination::new(0, u64::MAX),
                &FetchPlan::root_only(),
            )
            .await?;
        let tree = CategoryTree::from_categories(&rows)?;
        tracing::info!(categories = tree.len(), roots = tree.roots().len(), "category tree loaded");

        Ok(Self {
            store,
            tree: Mutex::new(tree),
        })
    }

    /// Copy of the current tree
    pub async fn tree(&self) -> CategoryTree {
        self.tree.lock().await.clone()
    }

    /// Store a new category and place it in the tree
    ///
    /// The parent, when given, must already exist.
    #[instrument(skip(self, category), fields(name = %category.name))]
    pub async fn create(&self, category: Category) -> Result<Category> {
        let mut tree = self.tree.lock().await;
        if let Some(parent) = category.parent_id {
            if !tree.contains(parent) {
                return Err(Error::not_found(Category::ENTITY_TYPE, parent));
            }
        }

        let created = self.store.insert(category.detached()).await?;
        let id = created
            .id
            .ok_or_else(|| Error::Internal("storage returned a category without id".into()))?;

        let mut working = tree.clone();
        working.insert(id, created.name.clone())?;
        if let Some(parent) = created.parent_id {
            working.attach_child(parent, id)?;
        }
        working.clear_pending();
        *tree = working;
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn attach_child(&self, parent: CategoryId, child: CategoryId) -> Result<()> {
        self.apply(|tree| tree.attach_child(parent, child)).await
    }

    #[instrument(skip(self))]
    pub async fn reparent(&self, node: CategoryId, new_parent: Option<CategoryId>) -> Result<()> {
        self.apply(|tree| tree.reparent(node, new_parent)).await
    }

    #[instrument(skip(self))]
    pub async fn detach_child(&self, parent: CategoryId, child: CategoryId) -> Result<()> {
        self.apply(|tree| tree.detach_child(parent, child)).await
    }

    /// Delete a category; its children become roots
    #[instrument(skip(self))]
    pub async fn remove(&self, id: CategoryId) -> Result<()> {
        let mut tree = self.tree.lock().await;
        let mut working = tree.clone();
        working.remove(id)?;

        let changes = working.pending_changes();
        let written = self.persist(&changes).await?;
        match self.store.delete(id).await {
            Ok(true) => {}
            Ok(false) => {
                self.revert(&written).await;
                return Err(Error::not_found(Category::ENTITY_TYPE, id));
            }
            Err(err) => {
                self.revert(&written).await;
                return Err(err.into());
            }
        }

        working.clear_pending();
        *tree = working;
        Ok(())
    }

    async fn apply<F>(&self, op: F) -> Result<()>
    where
        F: FnOnce(&mut CategoryTree) -> Result<()>,
    {
        let mut tree = self.tree.lock().await;
        let mut working = tree.clone();
        op(&mut working)?;

        let changes = working.pending_changes();
        if changes.is_empty() {
            return Ok(());
        }
        self.persist(&changes).await?;

        working.clear_pending();
        *tree = working;
        Ok(())
    }

    /// Write every change, undoing earlier writes if one fails
    ///
    /// Returns the changes written so a caller with a later step can undo them.
    async fn persist(&self, changes: &[ParentChange]) -> Result<Vec<ParentChange>> {
        let mut written = Vec::with_capacity(changes.len());
        for change in changes {
            if let Err(err) = self.write_parent(change.id, change.to).await {
                tracing::warn!(id = %change.id, error = %err, "parent update failed, reverting");
                self.revert(&written).await;
                return Err(err);
            }
            written.push(*change);
        }
        tracing::debug!(changes = written.len(), "category parents persisted");
        Ok(written)
    }

    async fn revert(&self, written: &[ParentChange]) {
        for change in written.iter().rev() {
            if let Err(err) = self.write_parent(change.id, change.from).await {
                tracing::error!(
                    id = %change.id,
                    error = %err,
                    "failed to restore parent, stored hierarchy diverges from tree"
                );
            }
        }
    }

    async fn write_parent(&self, id: CategoryId, parent: Option<CategoryId>) -> Result<()> {
        let row = self
            .store
            .fetch_by_id(id, &FetchPlan::root_only())
            .await?
            .ok_or_else(|| Error::not_found(Category::ENTITY_TYPE, id))?;
        self.store.save(row.with_parent(parent)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityId;
    use crate::repository::{MemoryStore, RepositoryError, RepositoryOperation};

    fn id(n: i64) -> CategoryId {
        CategoryId::new(n)
    }

    async fn setup(rows: Vec<Category>) -> (Arc<MemoryStore<Category>>, CategoryService<MemoryStore<Category>>) {
        let store = Arc::new(MemoryStore::seeded(rows));
        let service = CategoryService::load(Arc::clone(&store)).await.unwrap();
        (store, service)
    }

    fn flat(n: i64) -> Vec<Category> {
        (1..=n).map(|i| Category::new(format!("c{i}")).with_id(id(i))).collect()
    }

    async fn stored_parent(store: &MemoryStore<Category>, n: i64) -> Option<CategoryId> {
        store.snapshot(id(n)).await.and_then(|row| row.parent_id())
    }

    #[tokio::test]
    async fn test_attach_persists_parent() {
        let (store, service) = setup(flat(2)).await;
        service.attach_child(id(1), id(2)).await.unwrap();
        assert_eq!(stored_parent(&store, 2).await, Some(id(1)));
        assert_eq!(service.tree().await.children_of(id(1)), vec![id(2)]);
    }

    #[tokio::test]
    async fn test_cycle_scenario_leaves_tree_and_storage_unchanged() {
        let (store, service) = setup(flat(3)).await;
        service.attach_child(id(1), id(2)).await.unwrap();
        service.attach_child(id(2), id(3)).await.unwrap();
        let before = service.tree().await;

        let err = service.reparent(id(1), Some(id(3))).await.unwrap_err();
        assert!(matches!(err, Error::Cycle { .. }));
        assert_eq!(service.tree().await, before);
        assert_eq!(stored_parent(&store, 1).await, None);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_tree() {
        let (store, service) = setup(flat(2)).await;
        store
            .inject_failure_after(
                1,
                RepositoryError::connection_failed(RepositoryOperation::Save, "reset by peer"),
            )
            .await;

        let err = service.attach_child(id(1), id(2)).await.unwrap_err();
        assert!(err.is_retriable());
        assert_eq!(service.tree().await.parent_of(id(2)), None);
        assert_eq!(stored_parent(&store, 2).await, None);

        service.attach_child(id(1), id(2)).await.unwrap();
        assert_eq!(stored_parent(&store, 2).await, Some(id(1)));
    }

    #[tokio::test]
    async fn test_partial_write_is_reverted() {
        let mut rows = flat(3);
        rows[1] = Category::new("c2").with_id(id(2)).under(id(1));
        rows[2] = Category::new("c3").with_id(id(3)).under(id(1));
        let (store, service) = setup(rows).await;
        let before = service.tree().await;

        // fetch c2, save c2, then the fetch for c3 fails
        store
            .inject_failure_after(2, RepositoryError::timeout(RepositoryOperation::FetchById, "5s"))
            .await;
        let err = service.remove(id(1)).await.unwrap_err();

        assert!(matches!(err, Error::TransientStorage(_)));
        assert_eq!(service.tree().await, before);
        assert_eq!(stored_parent(&store, 2).await, Some(id(1)));
        assert_eq!(stored_parent(&store, 3).await, Some(id(1)));
        assert!(store.snapshot(id(1)).await.is_some());
    }

    #[tokio::test]
    async fn test_remove_orphans_children() {
        let rows = vec![
            Category::new("Apparel").with_id(id(1)),
            Category::new("Shoes").with_id(id(2)).under(id(1)),
        ];
        let (store, service) = setup(rows).await;

        service.remove(id(1)).await.unwrap();
        assert!(store.snapshot(id(1)).await.is_none());
        assert_eq!(stored_parent(&store, 2).await, None);
        assert_eq!(service.tree().await.roots(), vec![id(2)]);
    }

    #[tokio::test]
    async fn test_remove_leaves_no_dangling_parent() {
        let rows = vec![
            Category::new("Apparel").with_id(id(1)),
            Category::new("Shoes").with_id(id(2)).under(id(1)),
            Category::new("Trail").with_id(id(3)).under(id(2)),
            Category::new("Hats").with_id(id(4)).under(id(1)),
        ];
        let (store, service) = setup(rows).await;
        service.remove(id(1)).await.unwrap();

        let stored = store
            .fetch(
                &Predicate::All,
                &OrderSpec::by_id(),
                Pagination::new(0, u64::MAX),
                &FetchPlan::root_only(),
            )
            .await
            .unwrap();
        let ids: Vec<_> = stored.iter().filter_map(|row| row.id).collect();
        assert_eq!(ids, vec![id(2), id(3), id(4)]);
        for row in &stored {
            if let Some(parent) = row.parent_id() {
                assert!(ids.contains(&parent), "{} points at missing {parent}", row.name);
            }
        }

        let reloaded = CategoryService::load(Arc::clone(&store)).await.unwrap();
        assert_eq!(reloaded.tree().await.roots(), vec![id(2), id(4)]);
        assert_eq!(reloaded.tree().await.parent_of(id(3)), Some(id(2)));
    }

    #[tokio::test]
    async fn test_create_under_parent() {
        let (store, service) = setup(flat(1)).await;

        let created = service.create(Category::new("Shoes").under(id(1))).await.unwrap();
        let created_id = created.id.unwrap();
        assert_eq!(service.tree().await.parent_of(created_id), Some(id(1)));
        assert_eq!(stored_parent(&store, created_id.value()).await, Some(id(1)));

        let err = service.create(Category::new("Hats").under(id(99))).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_detach_is_persisted_and_idempotent() {
        let rows = vec![
            Category::new("Apparel").with_id(id(1)),
            Category::new("Shoes").with_id(id(2)).under(id(1)),
        ];
        let (store, service) = setup(rows).await;
        service.detach_child(id(1), id(2)).await.unwrap();
        service.detach_child(id(1), id(2)).await.unwrap();
        assert_eq!(stored_parent(&store, 2).await, None);
    }

    #[tokio::test]
    async fn test_load_rejects_stored_cycle() {
        let store = Arc::new(MemoryStore::seeded([
            Category::new("A").with_id(id(1)).under(id(2)),
            Category::new("B").with_id(id(2)).under(id(1)),
        ]));
        let err = CategoryService::load(store).await.err().unwrap();
        assert!(matches!(err, Error::Cycle { .. }));
    }
}

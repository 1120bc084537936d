//! Page execution and the page result container
//!
//! [`PageExecutor`] runs the content fetch and the total count against the
//! same predicate, concurrently, then fills any relations the fetch plan
//! deferred to secondary queries. [`PageResult`] carries the content slice
//! together with count metadata that is always consistent with it.

use futures::future::try_join_all;
use serde::Serialize;

use crate::model::Entity;
use crate::query::{FetchPlan, OrderSpec, PageRequest, Predicate};
use crate::repository::{RelationLoader, RepositoryResult, StorageBackend};

/// One page of results plus totals
///
/// Invariants: `content.len() <= page_size`; `total_pages` is
/// `ceil(total_elements / page_size)` and is zero exactly when
/// `total_elements` is zero; a page at or past `total_pages` has no content.
///
/// # Example
///
/// ```rust
/// use catalog_access::pagination::PageResult;
/// use catalog_access::query::PageRequest;
///
/// let page = PageResult::new(vec!["a", "b"], PageRequest { page_index: 0, page_size: 2 }, 5);
/// assert_eq!(page.total_pages, 3);
/// assert!(page.has_next());
/// assert!(!page.has_previous());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult<T> {
    /// Entities on this page, in requested order
    pub content: Vec<T>,
    /// Zero-based page index
    pub page_index: u64,
    /// Page size the page was fetched with
    pub page_size: u64,
    /// Rows matching the predicate across all pages
    pub total_elements: u64,
    /// Number of non-empty pages
    pub total_pages: u64,
}

impl<T> PageResult<T> {
    /// Assemble a page, enforcing the container invariants
    pub fn new(mut content: Vec<T>, page: PageRequest, total_elements: u64) -> Self {
        let page_size = page.page_size.max(1);
        let total_pages = calculate_total_pages(total_elements, page_size);

        if page.page_index >= total_pages {
            content.clear();
        }
        let limit = usize::try_from(page_size).unwrap_or(usize::MAX);
        if content.len() > limit {
            tracing::warn!(
                returned = content.len(),
                page_size,
                "storage returned more rows than requested, truncating"
            );
            content.truncate(limit);
        }

        Self {
            content,
            page_index: page.page_index,
            page_size,
            total_elements,
            total_pages,
        }
    }

    /// A page with no matches
    pub fn empty(page: PageRequest) -> Self {
        Self::new(Vec::new(), page, 0)
    }

    /// Transform the content, keeping the metadata
    pub fn map<U, F>(self, f: F) -> PageResult<U>
    where
        F: FnMut(T) -> U,
    {
        PageResult {
            content: self.content.into_iter().map(f).collect(),
            page_index: self.page_index,
            page_size: self.page_size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page_index.saturating_add(1) < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page_index > 0
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Calculate total pages, rounding up
fn calculate_total_pages(total: u64, page_size: u64) -> u64 {
    let page_size = page_size.max(1);
    total / page_size + u64::from(total % page_size != 0)
}

/// Runs count and windowed fetch against a storage backend
pub struct PageExecutor;

impl PageExecutor {
    /// Fetch one page
    ///
    /// The count and the content fetch are issued concurrently with the same
    /// predicate. Storage errors propagate unchanged; nothing is retried.
    pub async fn execute<E, S>(
        store: &S,
        predicate: &Predicate<E::Field>,
        order: &OrderSpec<E::Field>,
        plan: &FetchPlan<E::Relation>,
        page: PageRequest,
    ) -> RepositoryResult<PageResult<E>>
    where
        E: Entity,
        S: StorageBackend<E> + RelationLoader<E>,
    {
        let (total_elements, content) = futures::try_join!(
            store.count(predicate),
            store.fetch(predicate, order, page.pagination(), plan),
        )?;

        let mut result = PageResult::new(content, page, total_elements);
        Self::load_secondary(store, plan, &mut result.content).await?;

        tracing::debug!(
            entity = E::ENTITY_TYPE,
            total_elements,
            returned = result.len(),
            "page fetched"
        );
        Ok(result)
    }

    /// Populate the plan's secondary relations on already-fetched roots
    ///
    /// One batch query per relation, merged back by root id. Roots with no
    /// related rows get an empty collection.
    pub async fn load_secondary<E, S>(
        store: &S,
        plan: &FetchPlan<E::Relation>,
        roots: &mut [E],
    ) -> RepositoryResult<()>
    where
        E: Entity,
        S: RelationLoader<E>,
    {
        if plan.secondary().is_empty() || roots.is_empty() {
            return Ok(());
        }

        let ids: Vec<E::Id> = roots.iter().filter_map(Entity::id).collect();
        let loads = plan.secondary().iter().map(|&relation| {
            let ids = &ids;
            async move {
                store
                    .batch_load(relation, ids)
                    .await
                    .map(|rows| (relation, rows))
            }
        });

        for (relation, mut rows) in try_join_all(loads).await? {
            tracing::debug!(%relation, roots = roots.len(), "merging secondary relation");
            for root in roots.iter_mut() {
                let children = root
                    .id()
                    .and_then(|id| rows.remove(&id))
                    .unwrap_or_default();
                root.attach(relation, children);
            }
        }
        Ok(())
    }
}

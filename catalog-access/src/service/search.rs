//! Search entry point per entity type

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use tracing::instrument;

use crate::config::QueryConfig;
use crate::error::{Error, Result};
use crate::model::{Category, Order, Product, StandaloneRows, User};
use crate::pagination::{PageExecutor, PageResult};
use crate::query::{FetchPlanSelector, Searchable, SearchCriteria, SortResolver};
use crate::repository::{RelationLoader, StorageBackend};

/// Search, lookup and lifecycle operations for one entity type
///
/// This is the only place predicates, order specs and fetch plans are built
/// from caller input, so every request goes through the same validation and
/// the same sort allow-list.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use catalog_access::config::QueryConfig;
/// use catalog_access::model::{Product, ProductView};
/// use catalog_access::query::{SearchCriteria, SortRequest};
/// use catalog_access::repository::MemoryStore;
/// use catalog_access::service::ProductService;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> catalog_access::Result<()> {
/// let store = Arc::new(MemoryStore::seeded([
///     Product::new("Trail Shoe", 12_900),
///     Product::new("Rain Jacket", 25_000),
/// ]));
/// let products = ProductService::new(store, QueryConfig::default());
///
/// let criteria = SearchCriteria::new()
///     .with_price_range(Some(10_000), None)
///     .with_sort(SortRequest::new("price", "desc"));
/// let page = products.search(&criteria, ProductView::Root).await?;
///
/// assert_eq!(page.total_elements, 2);
/// assert_eq!(page.content[0].name, "Rain Jacket");
/// # Ok(())
/// # }
/// ```
pub struct SearchService<E, S> {
    store: Arc<S>,
    query: QueryConfig,
    _entity: PhantomData<fn() -> E>,
}

pub type ProductService<S> = SearchService<Product, S>;
pub type UserService<S> = SearchService<User, S>;
pub type OrderService<S> = SearchService<Order, S>;
/// Read-only access to categories; structural writes go through
/// [`CategoryService`](super::CategoryService)
pub type CategorySearchService<S> = SearchService<Category, S>;

impl<E, S> Clone for SearchService<E, S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            query: self.query,
            _entity: PhantomData,
        }
    }
}

impl<E, S> SearchService<E, S>
where
    E: Searchable,
    S: StorageBackend<E> + RelationLoader<E>,
{
    pub fn new(store: Arc<S>, query: QueryConfig) -> Self {
        Self {
            store,
            query,
            _entity: PhantomData,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// One page of entities matching `criteria`, shaped by `view`
    ///
    /// Fails with [`Error::Validation`] for malformed criteria. Unknown sort
    /// fields are not an error; they fall back to id order. Storage failures
    /// propagate without retry.
    #[instrument(skip(self, criteria), fields(entity = E::ENTITY_TYPE))]
    pub async fn search(&self, criteria: &SearchCriteria, view: E::View) -> Result<PageResult<E>> {
        let started = Instant::now();

        let page = criteria.validate(&self.query)?;
        let predicate = E::predicate(criteria);
        let order = SortResolver::resolve::<E::Field>(criteria.sort());
        let plan = FetchPlanSelector::for_view(&view);
        tracing::debug!(%predicate, %order, ?plan, "executing search");

        let result =
            PageExecutor::execute::<E, S>(self.store.as_ref(), &predicate, &order, &plan, page).await?;

        tracing::info!(
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            total_elements = result.total_elements,
            returned = result.len(),
            "search completed"
        );
        Ok(result)
    }

    /// A single entity with the relations named by `view`
    #[instrument(skip(self), fields(entity = E::ENTITY_TYPE))]
    pub async fn find_by_id(&self, id: E::Id, view: E::View) -> Result<E> {
        let plan = FetchPlanSelector::for_view(&view);
        let mut entity = self
            .store
            .fetch_by_id(id, &plan)
            .await?
            .ok_or_else(|| Error::not_found(E::ENTITY_TYPE, id))?;

        PageExecutor::load_secondary(self.store.as_ref(), &plan, std::slice::from_mut(&mut entity))
            .await?;
        Ok(entity)
    }
}

/// Row lifecycle, only for entities no other row of the same type points at
///
/// Categories are excluded: creating or deleting one changes the hierarchy,
/// which only [`CategoryService`](super::CategoryService) may do.
///
/// ```compile_fail
/// use std::sync::Arc;
/// use catalog_access::config::QueryConfig;
/// use catalog_access::model::{Category, CategoryId};
/// use catalog_access::repository::MemoryStore;
/// use catalog_access::service::CategorySearchService;
///
/// # async fn run() {
/// let categories: CategorySearchService<_> =
///     CategorySearchService::new(Arc::new(MemoryStore::<Category>::new()), QueryConfig::default());
/// categories.delete(CategoryId::new(1)).await;
/// # }
/// ```
impl<E, S> SearchService<E, S>
where
    E: Searchable + StandaloneRows,
    S: StorageBackend<E> + RelationLoader<E>,
{
    /// Store a new entity
    ///
    /// An entity built without an id gets one assigned. An explicit id that
    /// is already taken fails with [`Error::Conflict`]; nothing is
    /// overwritten.
    #[instrument(skip(self, entity), fields(entity = E::ENTITY_TYPE, id = ?entity.id()))]
    pub async fn create(&self, entity: E) -> Result<E> {
        let created = self.store.insert(entity).await?;
        tracing::info!(id = ?created.id(), "entity created");
        Ok(created)
    }

    /// Remove an entity by id
    #[instrument(skip(self), fields(entity = E::ENTITY_TYPE))]
    pub async fn delete(&self, id: E::Id) -> Result<()> {
        if self.store.delete(id).await? {
            Ok(())
        } else {
            Err(Error::not_found(E::ENTITY_TYPE, id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Address, BrandId, CategoryId, CategoryView, OrderId, OrderItem, OrderStatus, OrderSummary,
        OrderView, ProductId, ProductImage, ProductView, UserId, UserProfile, UserView,
    };
    use crate::query::SortRequest;
    use crate::repository::{MemoryStore, RepositoryError, RepositoryOperation};
    use chrono::{DateTime, TimeZone, Utc};

    /// 1000 products; prices are pairwise distinct and spread over [0, 100000),
    /// brands cycle through 0..10
    fn product_fixture() -> Vec<Product> {
        (1..=1000)
            .map(|i: i64| {
                Product::new(format!("product-{i:04}"), (i * 7919) % 100_000)
                    .with_brand_id(BrandId::new(i % 10))
                    .with_category_id(CategoryId::new(i % 4 + 1))
            })
            .collect()
    }

    fn product_service(rows: Vec<Product>) -> ProductService<MemoryStore<Product>> {
        SearchService::new(Arc::new(MemoryStore::seeded(rows)), QueryConfig::default())
    }

    #[tokio::test]
    async fn test_price_brand_scenario() {
        let fixture = product_fixture();
        let expected_total = fixture
            .iter()
            .filter(|p| p.brand_id == Some(BrandId::new(7)))
            .filter(|p| (10_000..=50_000).contains(&p.price))
            .count() as u64;
        let service = product_service(fixture);

        let criteria = SearchCriteria::new()
            .with_price_range(Some(10_000), Some(50_000))
            .with_brand(BrandId::new(7))
            .with_sort(SortRequest::new("price", "desc"))
            .with_page(0)
            .with_size(10);
        let page = service.search(&criteria, ProductView::Root).await.unwrap();

        assert!(expected_total > 10);
        assert_eq!(page.total_elements, expected_total);
        assert_eq!(page.len(), 10);
        for product in &page.content {
            assert_eq!(product.brand_id, Some(BrandId::new(7)));
            assert!((10_000..=50_000).contains(&product.price));
        }
        assert!(page.content.windows(2).all(|w| w[0].price > w[1].price));
    }

    #[tokio::test]
    async fn test_range_holds_on_every_page() {
        let service = product_service(product_fixture());
        let mut seen = 0;
        for index in 0.. {
            let criteria = SearchCriteria::new()
                .with_price_range(Some(20_000), Some(30_000))
                .with_page(index)
                .with_size(25);
            let page = service.search(&criteria, ProductView::Root).await.unwrap();
            if page.is_empty() {
                assert_eq!(page.total_elements, seen);
                break;
            }
            assert!(page.content.iter().all(|p| (20_000..=30_000).contains(&p.price)));
            seen += page.len() as u64;
        }
        assert!(seen > 0);
    }

    #[tokio::test]
    async fn test_inverted_price_range_returns_empty_page() {
        let service = product_service(product_fixture());
        let criteria = SearchCriteria::new().with_price_range(Some(50_000), Some(10_000));
        let page = service.search(&criteria, ProductView::Root).await.unwrap();
        assert!(page.is_empty());
        assert_eq!(page.total_elements, 0);
        assert_eq!(page.total_pages, 0);
    }

    #[tokio::test]
    async fn test_empty_criteria_returns_everything_that_fits() {
        let service = product_service((1..=15).map(|i| Product::new(format!("p{i}"), i)).collect());
        let page = service.search(&SearchCriteria::new(), ProductView::Root).await.unwrap();
        assert_eq!(page.total_elements, 15);
        assert_eq!(page.len(), 15);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.content[0].id, Some(ProductId::new(1)));
    }

    #[tokio::test]
    async fn test_page_past_end_keeps_total() {
        let service = product_service(product_fixture());
        let first = service
            .search(&SearchCriteria::new().with_brand(BrandId::new(3)), ProductView::Root)
            .await
            .unwrap();
        let past = service
            .search(
                &SearchCriteria::new().with_brand(BrandId::new(3)).with_page(999),
                ProductView::Root,
            )
            .await
            .unwrap();
        assert!(past.is_empty());
        assert_eq!(past.total_elements, first.total_elements);
    }

    #[tokio::test]
    async fn test_unknown_sort_field_falls_back_to_id_order() {
        let service = product_service(product_fixture());
        let criteria = SearchCriteria::new()
            .with_sort(SortRequest::new("cost_price; DROP TABLE product", "desc"))
            .with_size(5);
        let page = service.search(&criteria, ProductView::Root).await.unwrap();
        let ids: Vec<_> = page.content.iter().filter_map(|p| p.id).collect();
        assert_eq!(ids, (1..=5).map(ProductId::new).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_invalid_criteria_rejected_before_storage() {
        let store = Arc::new(MemoryStore::seeded(product_fixture()));
        store
            .inject_failure(RepositoryError::connection_failed(RepositoryOperation::Count, "down"))
            .await;
        let service = ProductService::new(Arc::clone(&store), QueryConfig::default());

        let err = service
            .search(&SearchCriteria::new().with_page(-1), ProductView::Root)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        // The fault was not consumed by the rejected request.
        let err = service
            .search(&SearchCriteria::new(), ProductView::Root)
            .await
            .unwrap_err();
        assert!(err.is_retriable());
    }

    #[tokio::test]
    async fn test_two_collections_page_holds_distinct_roots() {
        let users = (1..=12).map(|i| {
            User::new(format!("user{i}"), format!("user{i}@example.com"))
                .with_profile(UserProfile::new(format!("nick{i}")))
                .with_address(Address::new("04524", "Seoul").as_default())
                .with_address(Address::new("48058", "Busan"))
                .with_address(Address::new("61452", "Gwangju"))
                .with_order(OrderSummary::new(OrderStatus::Pending, Utc::now()).with_total(1_000))
                .with_order(OrderSummary::new(OrderStatus::Shipped, Utc::now()).with_total(2_000))
        });
        let service: UserService<_> =
            SearchService::new(Arc::new(MemoryStore::seeded(users)), QueryConfig::default());

        let page = service
            .search(&SearchCriteria::new().with_size(5), UserView::Full)
            .await
            .unwrap();

        let mut ids: Vec<_> = page.content.iter().filter_map(|u| u.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 5);
        assert_eq!(page.total_elements, 12);
        for user in &page.content {
            assert!(user.profile.is_some());
            assert_eq!(user.addresses.len(), 3);
            assert_eq!(user.orders.len(), 2);
            assert_eq!(user.default_address().map(|a| a.zipcode.as_str()), Some("04524"));
        }
    }

    #[tokio::test]
    async fn test_user_keyword_search() {
        let service: UserService<_> = SearchService::new(
            Arc::new(MemoryStore::seeded([
                User::new("kim", "kim@acme.io"),
                User::new("lee", "lee@example.com"),
                User::new("acme_bot", "bot@example.com"),
            ])),
            QueryConfig::default(),
        );
        let page = service
            .search(&SearchCriteria::new().with_keyword("acme"), UserView::Root)
            .await
            .unwrap();
        let names: Vec<_> = page.content.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["kim", "acme_bot"]);
    }

    #[tokio::test]
    async fn test_category_roots_search_loads_children() {
        let service: CategorySearchService<_> = SearchService::new(
            Arc::new(MemoryStore::seeded([
                Category::new("Apparel").with_id(CategoryId::new(1)),
                Category::new("Shoes").with_id(CategoryId::new(2)).under(CategoryId::new(1)),
                Category::new("Hats").with_id(CategoryId::new(3)).under(CategoryId::new(1)),
                Category::new("Outdoor").with_id(CategoryId::new(4)),
            ])),
            QueryConfig::default(),
        );
        let page = service
            .search(&SearchCriteria::new().with_roots_only(), CategoryView::WithChildren)
            .await
            .unwrap();
        assert_eq!(page.total_elements, 2);
        assert_eq!(page.content[0].children.len(), 2);
        assert!(page.content[1].children.is_empty());
    }

    #[tokio::test]
    async fn test_find_by_id_includes_requested_relations() {
        let service = product_service(vec![Product::new("Trail Shoe", 12_900)
            .with_id(ProductId::new(3))
            .with_image(ProductImage::new("https://cdn.example.com/a.png").as_thumbnail())
            .with_image(ProductImage::new("https://cdn.example.com/b.png"))]);

        let bare = service.find_by_id(ProductId::new(3), ProductView::Root).await.unwrap();
        assert!(bare.images.is_empty());

        let full = service.find_by_id(ProductId::new(3), ProductView::Full).await.unwrap();
        assert_eq!(full.images.len(), 2);
        assert!(full.thumbnail().is_some());

        let err = service
            .find_by_id(ProductId::new(4), ProductView::Root)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_create_assigns_or_rejects_ids() {
        let service: UserService<_> =
            SearchService::new(Arc::new(MemoryStore::new()), QueryConfig::default());

        let created = service.create(User::new("kim", "kim@acme.io")).await.unwrap();
        assert_eq!(created.id, Some(UserId::new(1)));

        let imported = service
            .create(User::new("lee", "lee@acme.io").with_id(UserId::new(50)))
            .await
            .unwrap();
        assert_eq!(imported.id, Some(UserId::new(50)));

        let err = service
            .create(User::new("park", "park@acme.io").with_id(UserId::new(50)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        let kept = service.find_by_id(UserId::new(50), UserView::Root).await.unwrap();
        assert_eq!(kept.username, "lee");
    }

    #[tokio::test]
    async fn test_delete() {
        let service = product_service(vec![Product::new("p", 1)]);
        service.delete(ProductId::new(1)).await.unwrap();
        let err = service.delete(ProductId::new(1)).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    fn day(n: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, n, 9, 30, 0).unwrap()
    }

    /// Three users, each with orders on days 1..=6 cycling through statuses;
    /// every order has two line items
    fn order_service() -> OrderService<MemoryStore<Order>> {
        let statuses = [OrderStatus::Pending, OrderStatus::Shipped, OrderStatus::Delivered];
        let orders = (0..18_u32).map(|i| {
            let user = User::new(format!("user{}", i % 3 + 1), format!("u{}@acme.io", i % 3 + 1))
                .with_id(UserId::new(i64::from(i % 3 + 1)));
            Order::new(UserId::new(0), day(i / 3 + 1))
                .with_status(statuses[(i % 3) as usize])
                .with_user(user)
                .with_item(OrderItem::new(ProductId::new(1), 1, 1_000))
                .with_item(OrderItem::new(ProductId::new(2), 3, 500))
        });
        SearchService::new(Arc::new(MemoryStore::seeded(orders)), QueryConfig::default())
    }

    #[tokio::test]
    async fn test_order_search_by_user_and_date_window() {
        let service = order_service();
        let criteria = SearchCriteria::new()
            .with_user(UserId::new(2))
            .with_order_dates(Some(day(2)), Some(day(4)))
            .with_sort(SortRequest::new("orderDate", "desc"));
        let page = service.search(&criteria, OrderView::Full).await.unwrap();

        assert_eq!(page.total_elements, 3);
        let dates: Vec<_> = page.content.iter().map(|o| o.ordered_at).collect();
        assert_eq!(dates, vec![day(4), day(3), day(2)]);
        for order in &page.content {
            assert_eq!(order.user_id, UserId::new(2));
            assert_eq!(order.user.as_ref().map(|u| u.username.as_str()), Some("user2"));
            assert_eq!(order.items.len(), 2);
            assert_eq!(order.total(), 2_500);
        }
    }

    #[tokio::test]
    async fn test_order_search_by_status_with_open_end() {
        let service = order_service();
        let criteria = SearchCriteria::new()
            .with_status(OrderStatus::Shipped)
            .with_order_dates(Some(day(5)), None);
        let page = service.search(&criteria, OrderView::Root).await.unwrap();

        assert_eq!(page.total_elements, 2);
        assert!(page.content.iter().all(|o| o.status == OrderStatus::Shipped));
        assert!(page.content.iter().all(|o| o.ordered_at >= day(5)));
        assert!(page.content.iter().all(|o| o.items.is_empty()));
    }

    #[tokio::test]
    async fn test_order_create_and_delete() {
        let service = order_service();
        let created = service
            .create(Order::new(UserId::new(1), day(20)).with_status(OrderStatus::Processing))
            .await
            .unwrap();
        assert_eq!(created.id, Some(OrderId::new(19)));

        service.delete(OrderId::new(19)).await.unwrap();
        let err = service.find_by_id(OrderId::new(19), OrderView::Root).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}

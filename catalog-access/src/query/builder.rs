//! Criteria-to-predicate mapping for each searchable entity

use super::{Predicate, PredicateBuilder, SearchCriteria};
use crate::model::{
    Category, CategoryField, CategoryView, Entity, FetchView, Order, OrderField, OrderView,
    Product, ProductField, ProductView, User, UserField, UserView,
};

/// An entity that can be searched with [`SearchCriteria`]
pub trait Searchable: Entity {
    /// Request shapes offered for this entity
    type View: FetchView<Self::Relation> + Copy + Default + Send + Sync + std::fmt::Debug;

    /// Translate criteria into a filter; criteria that do not apply to this
    /// entity are ignored
    fn predicate(criteria: &SearchCriteria) -> Predicate<Self::Field>;
}

impl Searchable for Product {
    type View = ProductView;

    fn predicate(criteria: &SearchCriteria) -> Predicate<ProductField> {
        PredicateBuilder::new()
            .contains(ProductField::Name, criteria.keyword())
            .range(ProductField::Price, criteria.min_price, criteria.max_price)
            .eq(ProductField::BrandId, criteria.brand_id)
            .eq(ProductField::CategoryId, criteria.category_id)
            .build()
    }
}

impl Searchable for User {
    type View = UserView;

    fn predicate(criteria: &SearchCriteria) -> Predicate<UserField> {
        PredicateBuilder::new()
            .any_contains(&[UserField::Username, UserField::Email], criteria.keyword())
            .contains(UserField::Username, criteria.username())
            .contains(UserField::Email, criteria.email())
            .eq(UserField::Id, criteria.user_id)
            .build()
    }
}

impl Searchable for Order {
    type View = OrderView;

    fn predicate(criteria: &SearchCriteria) -> Predicate<OrderField> {
        PredicateBuilder::new()
            .eq(OrderField::UserId, criteria.user_id)
            .eq(OrderField::Status, criteria.status)
            .time_range(OrderField::OrderedAt, criteria.start_date, criteria.end_date)
            .build()
    }
}

impl Searchable for Category {
    type View = CategoryView;

    fn predicate(criteria: &SearchCriteria) -> Predicate<CategoryField> {
        PredicateBuilder::new()
            .contains(CategoryField::Name, criteria.keyword())
            .eq(CategoryField::ParentId, criteria.category_id)
            .is_null_if(CategoryField::ParentId, criteria.roots_only)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Brand, BrandId, CategoryId, OrderStatus, ProductId, UserId};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_empty_criteria_matches_all_for_every_entity() {
        let criteria = SearchCriteria::new();
        assert!(Product::predicate(&criteria).is_all());
        assert!(User::predicate(&criteria).is_all());
        assert!(Category::predicate(&criteria).is_all());
        assert!(Order::predicate(&criteria).is_all());
    }

    #[test]
    fn test_product_mapping() {
        let criteria = SearchCriteria::new()
            .with_keyword("Shoe")
            .with_price_range(Some(10_000), None)
            .with_brand(BrandId::new(7));
        let predicate = Product::predicate(&criteria);
        assert_eq!(
            predicate.to_string(),
            "(lower(name) LIKE '%shoe%' AND price >= 10000 AND brand_id = 7)"
        );

        let hit = Product::new("Trail Shoe", 12_900)
            .with_id(ProductId::new(1))
            .with_brand(Brand::new(BrandId::new(7), "Summit"));
        let wrong_brand = hit.clone().with_brand_id(BrandId::new(8));
        let too_cheap = Product::new("Kids Shoe", 9_999).with_brand_id(BrandId::new(7));
        assert!(predicate.matches(&hit));
        assert!(!predicate.matches(&wrong_brand));
        assert!(!predicate.matches(&too_cheap));
    }

    #[test]
    fn test_product_ignores_user_filters() {
        let criteria = SearchCriteria::new().with_username("kim").with_roots_only();
        assert!(Product::predicate(&criteria).is_all());
    }

    #[test]
    fn test_user_keyword_matches_username_or_email() {
        let predicate = User::predicate(&SearchCriteria::new().with_keyword("ACME"));
        assert!(predicate.matches(&User::new("acme_admin", "root@example.com")));
        assert!(predicate.matches(&User::new("kim", "kim@acme.io")));
        assert!(!predicate.matches(&User::new("lee", "lee@example.com")));
    }

    #[test]
    fn test_user_id_and_email_filters() {
        let user = User::new("kim", "kim@acme.io").with_id(UserId::new(4));
        let by_id = User::predicate(&SearchCriteria::new().with_user(UserId::new(4)));
        let by_other_id = User::predicate(&SearchCriteria::new().with_user(UserId::new(5)));
        let by_email = User::predicate(&SearchCriteria::new().with_email("@ACME"));
        assert!(by_id.matches(&user));
        assert!(!by_other_id.matches(&user));
        assert!(by_email.matches(&user));
    }

    #[test]
    fn test_category_roots_and_parent_filters() {
        let root = Category::new("Apparel").with_id(CategoryId::new(1));
        let child = Category::new("Shoes").with_id(CategoryId::new(2)).under(CategoryId::new(1));

        let roots = Category::predicate(&SearchCriteria::new().with_roots_only());
        assert!(roots.matches(&root));
        assert!(!roots.matches(&child));

        let children = Category::predicate(&SearchCriteria::new().with_category(CategoryId::new(1)));
        assert!(children.matches(&child));
        assert!(!children.matches(&root));
    }

    #[test]
    fn test_order_user_status_and_date_window() {
        let march = |day| Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap();
        let order = Order::new(UserId::new(3), march(10)).with_status(OrderStatus::Shipped);

        let criteria = SearchCriteria::new()
            .with_user(UserId::new(3))
            .with_status(OrderStatus::Shipped)
            .with_order_dates(Some(march(1)), Some(march(31)));
        let predicate = Order::predicate(&criteria);
        assert_eq!(
            predicate.to_string(),
            "(user_id = 3 AND status = 'SHIPPED' AND ordered_at BETWEEN \
             '2024-03-01T12:00:00+00:00' AND '2024-03-31T12:00:00+00:00')"
        );
        assert!(predicate.matches(&order));

        let pending = Order::predicate(&SearchCriteria::new().with_status(OrderStatus::Pending));
        assert!(!pending.matches(&order));
    }

    #[test]
    fn test_order_date_window_accepts_one_bound() {
        let march = |day| Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap();
        let order = Order::new(UserId::new(1), march(10));

        let from = Order::predicate(&SearchCriteria::new().with_order_dates(Some(march(10)), None));
        let until = Order::predicate(&SearchCriteria::new().with_order_dates(None, Some(march(9))));
        assert_eq!(from.to_string(), "ordered_at >= '2024-03-10T00:00:00+00:00'");
        assert!(from.matches(&order));
        assert!(!until.matches(&order));
    }
}

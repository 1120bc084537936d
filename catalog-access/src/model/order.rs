//! Orders and their line items

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    Cardinality, Entity, EntityField, EntityRelation, FetchView, OrderId, OrderItemId, ProductId,
    StandaloneRows, User, UserId,
};
use crate::query::FilterValue;

/// Lifecycle state of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Processing => write!(f, "PROCESSING"),
            Self::Shipped => write!(f, "SHIPPED"),
            Self::Delivered => write!(f, "DELIVERED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl From<OrderStatus> for FilterValue {
    fn from(status: OrderStatus) -> Self {
        FilterValue::String(status.to_string())
    }
}

/// One product line of an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Option<OrderItemId>,
    pub product_id: ProductId,
    pub quantity: i64,
    /// Unit price at the time of ordering, in minor currency units
    pub order_price: i64,
}

impl OrderItem {
    pub fn new(product_id: ProductId, quantity: i64, order_price: i64) -> Self {
        Self {
            id: None,
            product_id,
            quantity,
            order_price,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: OrderItemId) -> Self {
        self.id = Some(id);
        self
    }

    /// Line total, saturating at the numeric bounds
    pub fn total(&self) -> i64 {
        self.order_price.saturating_mul(self.quantity)
    }
}

/// An order placed by a user
///
/// `user_id` is the stored column; `user` and `items` are filled by a fetch
/// plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: Option<OrderId>,
    pub user_id: UserId,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default = "Utc::now")]
    pub ordered_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Create an unsaved pending order for `user_id`
    pub fn new(user_id: UserId, ordered_at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            user_id,
            status: OrderStatus::default(),
            ordered_at,
            user: None,
            items: Vec::new(),
        }
    }

    /// Use a pre-assigned identifier (import or update-by-id)
    #[must_use]
    pub fn with_id(mut self, id: OrderId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = status;
        self
    }

    /// Attach the ordering user; also sets `user_id` when the user has one
    #[must_use]
    pub fn with_user(mut self, user: User) -> Self {
        if let Some(id) = user.id {
            self.user_id = id;
        }
        self.user = Some(user);
        self
    }

    #[must_use]
    pub fn with_item(mut self, item: OrderItem) -> Self {
        self.items.push(item);
        self
    }

    /// Sum of the loaded line totals
    pub fn total(&self) -> i64 {
        self.items
            .iter()
            .fold(0_i64, |sum, item| sum.saturating_add(item.total()))
    }
}

/// Filterable and sortable order columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderField {
    Id,
    UserId,
    Status,
    OrderedAt,
}

impl EntityField for OrderField {
    const ID: Self = Self::Id;

    fn sort_key(name: &str) -> Option<Self> {
        match name {
            "id" => Some(Self::Id),
            "status" => Some(Self::Status),
            "orderedAt" | "ordered_at" | "orderDate" => Some(Self::OrderedAt),
            _ => None,
        }
    }
}

impl fmt::Display for OrderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id => write!(f, "id"),
            Self::UserId => write!(f, "user_id"),
            Self::Status => write!(f, "status"),
            Self::OrderedAt => write!(f, "ordered_at"),
        }
    }
}

/// Eager-loadable order associations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderRelation {
    User,
    Items,
}

impl EntityRelation for OrderRelation {
    const ALL: &'static [Self] = &[Self::User, Self::Items];

    fn cardinality(self) -> Cardinality {
        match self {
            Self::User => Cardinality::ToOne,
            Self::Items => Cardinality::ToMany,
        }
    }
}

impl fmt::Display for OrderRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Items => write!(f, "items"),
        }
    }
}

/// Row carried by an order relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderChild {
    User(User),
    Item(OrderItem),
}

/// Order request shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderView {
    #[default]
    Root,
    WithUser,
    WithItems,
    Full,
}

impl FetchView<OrderRelation> for OrderView {
    fn relations(&self) -> Vec<OrderRelation> {
        match self {
            Self::Root => Vec::new(),
            Self::WithUser => vec![OrderRelation::User],
            Self::WithItems => vec![OrderRelation::Items],
            Self::Full => vec![OrderRelation::User, OrderRelation::Items],
        }
    }
}

impl StandaloneRows for Order {}

impl Entity for Order {
    type Id = OrderId;
    type Field = OrderField;
    type Relation = OrderRelation;
    type Child = OrderChild;

    const ENTITY_TYPE: &'static str = "Order";

    fn id(&self) -> Option<OrderId> {
        self.id
    }

    fn assign_id(self, id: OrderId) -> Self {
        self.with_id(id)
    }

    fn field_value(&self, field: OrderField) -> FilterValue {
        match field {
            OrderField::Id => self.id.map_or(FilterValue::Null, Into::into),
            OrderField::UserId => self.user_id.into(),
            OrderField::Status => self.status.into(),
            OrderField::OrderedAt => FilterValue::Timestamp(self.ordered_at),
        }
    }

    fn detached(&self) -> Self {
        Self {
            user: None,
            items: Vec::new(),
            ..self.clone()
        }
    }

    fn related(&self, relation: OrderRelation) -> Vec<OrderChild> {
        match relation {
            OrderRelation::User => self
                .user
                .iter()
                .map(|user| OrderChild::User(user.detached()))
                .collect(),
            OrderRelation::Items => self.items.iter().cloned().map(OrderChild::Item).collect(),
        }
    }

    fn attach(&mut self, relation: OrderRelation, rows: Vec<OrderChild>) {
        for row in rows {
            match (relation, row) {
                (OrderRelation::User, OrderChild::User(user)) => {
                    self.user.get_or_insert(user);
                }
                (OrderRelation::Items, OrderChild::Item(item)) => self.items.push(item),
                (relation, row) => {
                    tracing::warn!(%relation, ?row, "ignoring row of the wrong kind for relation");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Order {
        Order::new(UserId::new(3), Utc::now())
            .with_item(OrderItem::new(ProductId::new(1), 2, 1_500))
            .with_item(OrderItem::new(ProductId::new(2), 1, 9_900))
    }

    #[test]
    fn test_order_status_wire_format() {
        let json = serde_json::to_string(&OrderStatus::Cancelled).unwrap();
        assert_eq!(json, "\"CANCELLED\"");
        assert_eq!(OrderStatus::Shipped.to_string(), "SHIPPED");
        assert_eq!(
            FilterValue::from(OrderStatus::Processing),
            FilterValue::String("PROCESSING".into())
        );
    }

    #[test]
    fn test_total_sums_line_items() {
        assert_eq!(order().total(), 12_900);
        let huge = Order::new(UserId::new(1), Utc::now())
            .with_item(OrderItem::new(ProductId::new(1), i64::MAX, 2));
        assert_eq!(huge.total(), i64::MAX);
    }

    #[test]
    fn test_sort_key_allow_list() {
        assert_eq!(OrderField::sort_key("orderDate"), Some(OrderField::OrderedAt));
        assert_eq!(OrderField::sort_key("status"), Some(OrderField::Status));
        assert_eq!(OrderField::sort_key("user_id"), None);
    }

    #[test]
    fn test_with_user_sets_foreign_key() {
        let user = User::new("kim", "kim@acme.io").with_id(UserId::new(9));
        let order = Order::new(UserId::new(1), Utc::now()).with_user(user);
        assert_eq!(order.user_id, UserId::new(9));
        assert_eq!(order.field_value(OrderField::UserId), FilterValue::Integer(9));
    }

    #[test]
    fn test_detached_drops_relations_and_attach_refills() {
        let full = order().with_user(User::new("kim", "kim@acme.io"));
        let mut bare = full.detached();
        assert!(bare.user.is_none());
        assert!(bare.items.is_empty());

        bare.attach(OrderRelation::Items, full.related(OrderRelation::Items));
        bare.attach(OrderRelation::User, full.related(OrderRelation::User));
        bare.attach(
            OrderRelation::User,
            vec![OrderChild::Item(OrderItem::new(ProductId::new(5), 1, 1))],
        );
        assert_eq!(bare.items.len(), 2);
        assert_eq!(bare.user.as_ref().map(|u| u.username.as_str()), Some("kim"));
    }
}

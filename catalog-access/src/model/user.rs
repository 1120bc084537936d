//! Users and their profile, addresses and orders

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    AddressId, Cardinality, Entity, EntityField, EntityRelation, FetchView, OrderId, OrderStatus,
    StandaloneRows, UserId,
};
use crate::query::FilterValue;

/// Display details of a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub nickname: String,
    #[serde(default)]
    pub gender: Option<String>,
}

impl UserProfile {
    pub fn new(nickname: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
            gender: None,
        }
    }

    #[must_use]
    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }
}

/// A delivery address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: Option<AddressId>,
    pub zipcode: String,
    pub detail: String,
    #[serde(default)]
    pub is_default: bool,
}

impl Address {
    pub fn new(zipcode: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            id: None,
            zipcode: zipcode.into(),
            detail: detail.into(),
            is_default: false,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: AddressId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}

/// Header row of an order placed by a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: Option<OrderId>,
    #[serde(default)]
    pub status: OrderStatus,
    pub ordered_at: DateTime<Utc>,
    /// Order total in minor currency units
    #[serde(default)]
    pub total: i64,
}

impl OrderSummary {
    pub fn new(status: OrderStatus, ordered_at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            status,
            ordered_at,
            total: 0,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: OrderId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn with_total(mut self, total: i64) -> Self {
        self.total = total;
        self
    }
}

/// A registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Option<UserId>,
    pub username: String,
    pub email: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserProfile>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<Address>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub orders: Vec<OrderSummary>,
}

impl User {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: None,
            username: username.into(),
            email: email.into(),
            created_at: Utc::now(),
            profile: None,
            addresses: Vec::new(),
            orders: Vec::new(),
        }
    }

    /// Use a pre-assigned identifier (import or update-by-id)
    #[must_use]
    pub fn with_id(mut self, id: UserId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn with_profile(mut self, profile: UserProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    #[must_use]
    pub fn with_address(mut self, address: Address) -> Self {
        self.addresses.push(address);
        self
    }

    #[must_use]
    pub fn with_order(mut self, order: OrderSummary) -> Self {
        self.orders.push(order);
        self
    }

    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// The address flagged as default, if loaded
    pub fn default_address(&self) -> Option<&Address> {
        self.addresses.iter().find(|address| address.is_default)
    }
}

/// Filterable and sortable user columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserField {
    Id,
    Username,
    Email,
    CreatedAt,
}

impl EntityField for UserField {
    const ID: Self = Self::Id;

    fn sort_key(name: &str) -> Option<Self> {
        match name {
            "id" => Some(Self::Id),
            "username" => Some(Self::Username),
            "email" => Some(Self::Email),
            "createdAt" | "created_at" => Some(Self::CreatedAt),
            _ => None,
        }
    }
}

impl fmt::Display for UserField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id => write!(f, "id"),
            Self::Username => write!(f, "username"),
            Self::Email => write!(f, "email"),
            Self::CreatedAt => write!(f, "created_at"),
        }
    }
}

/// Eager-loadable user associations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserRelation {
    Profile,
    Addresses,
    Orders,
}

impl EntityRelation for UserRelation {
    const ALL: &'static [Self] = &[Self::Profile, Self::Addresses, Self::Orders];

    fn cardinality(self) -> Cardinality {
        match self {
            Self::Profile => Cardinality::ToOne,
            Self::Addresses | Self::Orders => Cardinality::ToMany,
        }
    }
}

impl fmt::Display for UserRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Profile => write!(f, "profile"),
            Self::Addresses => write!(f, "addresses"),
            Self::Orders => write!(f, "orders"),
        }
    }
}

/// Row carried by a user relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserChild {
    Profile(UserProfile),
    Address(Address),
    Order(OrderSummary),
}

/// User request shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserView {
    #[default]
    Root,
    WithProfile,
    WithAddresses,
    WithOrders,
    /// Profile and addresses, the account page shape
    ProfileAndAddresses,
    Full,
}

impl FetchView<UserRelation> for UserView {
    fn relations(&self) -> Vec<UserRelation> {
        match self {
            Self::Root => Vec::new(),
            Self::WithProfile => vec![UserRelation::Profile],
            Self::WithAddresses => vec![UserRelation::Addresses],
            Self::WithOrders => vec![UserRelation::Orders],
            Self::ProfileAndAddresses => vec![UserRelation::Profile, UserRelation::Addresses],
            Self::Full => vec![
                UserRelation::Profile,
                UserRelation::Addresses,
                UserRelation::Orders,
            ],
        }
    }
}

impl StandaloneRows for User {}

impl Entity for User {
    type Id = UserId;
    type Field = UserField;
    type Relation = UserRelation;
    type Child = UserChild;

    const ENTITY_TYPE: &'static str = "User";

    fn id(&self) -> Option<UserId> {
        self.id
    }

    fn assign_id(self, id: UserId) -> Self {
        self.with_id(id)
    }

    fn field_value(&self, field: UserField) -> FilterValue {
        match field {
            UserField::Id => self.id.map_or(FilterValue::Null, Into::into),
            UserField::Username => FilterValue::from(self.username.as_str()),
            UserField::Email => FilterValue::from(self.email.as_str()),
            UserField::CreatedAt => FilterValue::Timestamp(self.created_at),
        }
    }

    fn detached(&self) -> Self {
        Self {
            profile: None,
            addresses: Vec::new(),
            orders: Vec::new(),
            ..self.clone()
        }
    }

    fn related(&self, relation: UserRelation) -> Vec<UserChild> {
        match relation {
            UserRelation::Profile => self.profile.iter().cloned().map(UserChild::Profile).collect(),
            UserRelation::Addresses => {
                self.addresses.iter().cloned().map(UserChild::Address).collect()
            }
            UserRelation::Orders => self.orders.iter().cloned().map(UserChild::Order).collect(),
        }
    }

    fn attach(&mut self, relation: UserRelation, rows: Vec<UserChild>) {
        for row in rows {
            match (relation, row) {
                (UserRelation::Profile, UserChild::Profile(profile)) => {
                    self.profile.get_or_insert(profile);
                }
                (UserRelation::Addresses, UserChild::Address(address)) => {
                    self.addresses.push(address);
                }
                (UserRelation::Orders, UserChild::Order(order)) => self.orders.push(order),
                (relation, row) => {
                    tracing::warn!(%relation, ?row, "ignoring row of the wrong kind for relation");
                }
            }
        }
    }
}

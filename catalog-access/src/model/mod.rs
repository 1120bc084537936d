//! Entity model for the catalog and user collections
//!
//! Every persisted collection is described by the [`Entity`] trait: a typed
//! identifier, a closed enum of filterable/sortable [`EntityField`]s and a
//! closed enum of eager-loadable [`EntityRelation`]s. The query core only ever
//! talks to entities through this trait, so an unknown column name can never
//! reach a storage backend.
//!
//! Entities are built through explicit constructors. A pre-assigned identifier
//! (data import, update-by-id) is supplied with the entity's `with_id` builder
//! method instead of being written into the value after the fact.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hash;

use crate::query::FilterValue;

pub mod category;
pub mod order;
pub mod product;
pub mod user;

pub use category::{Category, CategoryField, CategoryRelation, CategoryView};
pub use order::{
    Order, OrderChild, OrderField, OrderItem, OrderRelation, OrderStatus, OrderView,
};
pub use product::{
    Brand, Product, ProductChild, ProductField, ProductImage, ProductRelation, ProductView,
};
pub use user::{
    Address, OrderSummary, User, UserChild, UserField, UserProfile, UserRelation, UserView,
};

/// Declares an `i64`-backed identifier newtype
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw identifier value
            #[must_use]
            pub const fn new(value: i64) -> Self {
                Self(value)
            }
        }

        impl $crate::model::EntityId for $name {
            fn value(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for $crate::query::FilterValue {
            fn from(id: $name) -> Self {
                $crate::query::FilterValue::Integer(id.0)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Identifier of a [`Product`]
    ProductId
);
entity_id!(
    /// Identifier of a [`Brand`]
    BrandId
);
entity_id!(
    /// Identifier of a [`Category`]
    CategoryId
);
entity_id!(
    /// Identifier of a [`ProductImage`]
    ImageId
);
entity_id!(
    /// Identifier of a [`User`]
    UserId
);
entity_id!(
    /// Identifier of an [`Address`]
    AddressId
);
entity_id!(
    /// Identifier of an [`Order`], shared with [`OrderSummary`]
    OrderId
);
entity_id!(
    /// Identifier of an [`OrderItem`]
    OrderItemId
);

/// Identifier of a persisted entity
pub trait EntityId:
    Copy + Eq + Ord + Hash + fmt::Debug + fmt::Display + From<i64> + Send + Sync + 'static
{
    /// The raw numeric value
    fn value(self) -> i64;
}

/// A filterable and sortable column of an entity
///
/// Implemented by closed enums, one per entity. [`sort_key`](Self::sort_key)
/// is the sort allow-list: it only recognises columns that may be ordered by.
pub trait EntityField: Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// The identifier column, used as the fallback ordering
    const ID: Self;

    /// Resolve a caller-supplied sort key to a sortable column
    fn sort_key(name: &str) -> Option<Self>;
}

/// How many related rows a relation yields per root entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// Zero or one related row (many-to-one, one-to-one)
    ToOne,
    /// Any number of related rows (one-to-many)
    ToMany,
}

/// An association that may be eagerly loaded together with its root entity
pub trait EntityRelation:
    Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Every relation of the entity
    const ALL: &'static [Self];

    /// Cardinality of the relation as seen from the root entity
    fn cardinality(self) -> Cardinality;

    /// Whether this is a one-to-many relation
    fn is_to_many(self) -> bool {
        self.cardinality() == Cardinality::ToMany
    }
}

/// A request shape naming which relations a caller wants populated
pub trait FetchView<R> {
    /// Relations requested by this view, in request order
    fn relations(&self) -> Vec<R>;
}

/// An entity whose rows can be stored and removed one at a time
///
/// Not implemented for [`Category`]: category rows point at each other, so
/// creating or deleting one goes through the category tree.
pub trait StandaloneRows: Entity {}

/// A persisted root entity
pub trait Entity: Clone + fmt::Debug + Send + Sync + 'static {
    /// Identifier type
    type Id: EntityId;
    /// Filterable/sortable columns
    type Field: EntityField;
    /// Eager-loadable relations
    type Relation: EntityRelation;
    /// Row type carried by the entity's relations
    type Child: Clone + fmt::Debug + Send + Sync + 'static;

    /// Entity name used in errors and logs
    const ENTITY_TYPE: &'static str;

    /// Identifier, `None` until the entity has been saved
    fn id(&self) -> Option<Self::Id>;

    /// Returns the entity carrying the identifier assigned by storage
    #[must_use]
    fn assign_id(self, id: Self::Id) -> Self;

    /// Value of a column, [`FilterValue::Null`] when the column is empty
    fn field_value(&self, field: Self::Field) -> FilterValue;

    /// Copy of the entity with every relation unloaded
    #[must_use]
    fn detached(&self) -> Self;

    /// Rows currently loaded for `relation`
    fn related(&self, relation: Self::Relation) -> Vec<Self::Child>;

    /// Add loaded rows to `relation`
    ///
    /// To-many relations append, to-one relations take the first row.
    fn attach(&mut self, relation: Self::Relation, rows: Vec<Self::Child>);

    /// Resolve a self-referencing relation against the whole table
    ///
    /// Returns `None` for relations backed by their own rows.
    fn self_join(
        &self,
        _relation: Self::Relation,
        _table: &BTreeMap<Self::Id, Self>,
    ) -> Option<Vec<Self::Child>> {
        None
    }
}

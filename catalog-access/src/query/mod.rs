//! Query construction: predicates, ordering, criteria and fetch plans
//!
//! Callers describe what they want with a [`SearchCriteria`] and a view; the
//! types in this module turn that description into a [`Predicate`], an
//! [`OrderSpec`] and a [`FetchPlan`] that a storage backend can execute. Only
//! closed per-entity field enums ever reach the backend.
//!
//! # Example
//!
//! ```rust
//! use catalog_access::model::{BrandId, Product, ProductField};
//! use catalog_access::query::{Searchable, SearchCriteria, SortRequest, SortResolver};
//!
//! let criteria = SearchCriteria::new()
//!     .with_price_range(Some(10_000), Some(50_000))
//!     .with_brand(BrandId::new(7))
//!     .with_sort(SortRequest::new("price", "desc"));
//!
//! let predicate = Product::predicate(&criteria);
//! assert_eq!(
//!     predicate.to_string(),
//!     "(price BETWEEN 10000 AND 50000 AND brand_id = 7)"
//! );
//!
//! let order = SortResolver::resolve::<ProductField>(criteria.sort());
//! assert_eq!(order.to_string(), "price DESC");
//! ```

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};

mod builder;
mod criteria;
mod fetch_plan;
mod predicate;
mod sort;

pub use builder::Searchable;
pub use criteria::{PageRequest, SearchCriteria};
pub use fetch_plan::{FetchPlan, FetchPlanSelector};
pub use predicate::{Predicate, PredicateBuilder};
pub use sort::{OrderDirection, OrderSpec, SortRequest, SortResolver};

/// A column value a predicate compares against
///
/// # Example
///
/// ```rust
/// use catalog_access::query::FilterValue;
///
/// let name: FilterValue = "shoe".into();
/// let price: FilterValue = 12_900_i64.into();
/// assert!(price > FilterValue::Integer(100));
/// assert_eq!(name.to_string(), "'shoe'");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    /// Text value
    String(String),
    /// 64-bit integer value (prices, identifiers)
    Integer(i64),
    /// Boolean value
    Boolean(bool),
    /// Point in time
    Timestamp(DateTime<Utc>),
    /// Empty column
    Null,
}

impl FilterValue {
    /// Whether the value is [`FilterValue::Null`]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Text content, if this is a string value
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Total order used for sorting: values of one kind compare naturally and
    /// nulls sort after everything else
    #[must_use]
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Greater,
            (_, Self::Null) => Ordering::Less,
            _ => self.partial_cmp(other).unwrap_or_else(|| self.rank().cmp(&other.rank())),
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Boolean(_) => 0,
            Self::Integer(_) => 1,
            Self::String(_) => 2,
            Self::Timestamp(_) => 3,
            Self::Null => 4,
        }
    }
}

impl PartialOrd for FilterValue {
    /// Values of different kinds are not comparable
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Null, Self::Null) => Some(Ordering::Equal),
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Boolean(a), Self::Boolean(b)) => Some(a.cmp(b)),
            (Self::Timestamp(a), Self::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Timestamp(ts) => write!(f, "'{}'", ts.to_rfc3339()),
            Self::Null => write!(f, "NULL"),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for FilterValue {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(ts: DateTime<Utc>) -> Self {
        Self::Timestamp(ts)
    }
}

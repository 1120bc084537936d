//! Sort field resolution against per-entity allow-lists

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{Entity, EntityField};

/// Direction for ordering results
///
/// # Example
///
/// ```rust
/// use catalog_access::query::OrderDirection;
///
/// assert_eq!(OrderDirection::parse_lenient("DESC"), OrderDirection::Descending);
/// assert_eq!(OrderDirection::parse_lenient("sideways"), OrderDirection::Ascending);
/// assert_eq!(format!("{}", OrderDirection::Descending), "desc");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OrderDirection {
    /// Sort in ascending order (A-Z, 0-9)
    #[default]
    Ascending,
    /// Sort in descending order (Z-A, 9-0)
    Descending,
}

impl OrderDirection {
    /// Parse a caller-supplied direction
    ///
    /// Only `desc` (any case, surrounding whitespace ignored) selects
    /// descending; every other input, including garbage, is ascending.
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("desc") {
            Self::Descending
        } else {
            Self::Ascending
        }
    }

    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }

    /// Apply the direction to an ascending comparison
    #[must_use]
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

/// One untrusted `(field, direction)` pair as supplied by a caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortRequest {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
}

impl SortRequest {
    pub fn new(field: impl Into<String>, direction: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Some(direction.into()),
        }
    }

    /// Sort on `field` with no explicit direction
    pub fn field(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: None,
        }
    }
}

/// A validated, non-empty ordering over the fields `F`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSpec<F> {
    keys: Vec<(F, OrderDirection)>,
}

impl<F: EntityField> OrderSpec<F> {
    /// Id ascending, the ordering used whenever nothing valid was asked for
    #[must_use]
    pub fn by_id() -> Self {
        Self {
            keys: vec![(F::ID, OrderDirection::Ascending)],
        }
    }

    /// Sort keys in application order
    pub fn keys(&self) -> &[(F, OrderDirection)] {
        &self.keys
    }

    /// Compare two entities key by key
    pub fn compare<E>(&self, a: &E, b: &E) -> Ordering
    where
        E: Entity<Field = F>,
    {
        self.keys
            .iter()
            .map(|(field, direction)| {
                let ordering = a.field_value(*field).sort_cmp(&b.field_value(*field));
                direction.apply(ordering)
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl<F: EntityField> Default for OrderSpec<F> {
    fn default() -> Self {
        Self::by_id()
    }
}

impl<F: fmt::Display> fmt::Display for OrderSpec<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, direction)) in self.keys.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{field} {}", direction.as_sql())?;
        }
        Ok(())
    }
}

/// Maps caller-supplied sort requests onto an entity's sortable columns
pub struct SortResolver;

impl SortResolver {
    /// Resolve sort requests into an [`OrderSpec`]
    ///
    /// Each request is checked on its own: a field outside the entity's
    /// allow-list becomes `id ASC` for that position and the raw name is
    /// never passed on. No requests at all yields `id ASC`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use catalog_access::model::UserField;
    /// use catalog_access::query::{SortRequest, SortResolver};
    ///
    /// let order = SortResolver::resolve::<UserField>(&[
    ///     SortRequest::new("email", "DESC"),
    ///     SortRequest::new("password", "asc"),
    /// ]);
    /// assert_eq!(order.to_string(), "email DESC, id ASC");
    /// ```
    pub fn resolve<F: EntityField>(requests: &[SortRequest]) -> OrderSpec<F> {
        if requests.is_empty() {
            return OrderSpec::by_id();
        }

        let keys = requests
            .iter()
            .map(|request| match F::sort_key(request.field.trim()) {
                Some(field) => {
                    let direction = request
                        .direction
                        .as_deref()
                        .map(OrderDirection::parse_lenient)
                        .unwrap_or_default();
                    (field, direction)
                }
                None => {
                    tracing::debug!(
                        requested = %request.field,
                        fallback = %F::ID,
                        "sort field not allowed, falling back to id ascending"
                    );
                    (F::ID, OrderDirection::Ascending)
                }
            })
            .collect();

        OrderSpec { keys }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Product, ProductField, ProductId};

    #[test]
    fn test_direction_parsing() {
        for raw in ["desc", "DESC", " Desc "] {
            assert_eq!(OrderDirection::parse_lenient(raw), OrderDirection::Descending);
        }
        for raw in ["asc", "ASC", "", "descending", "down", "1"] {
            assert_eq!(OrderDirection::parse_lenient(raw), OrderDirection::Ascending);
        }
    }

    #[test]
    fn test_empty_requests_resolve_to_id_ascending() {
        let order = SortResolver::resolve::<ProductField>(&[]);
        assert_eq!(order.keys(), &[(ProductField::Id, OrderDirection::Ascending)]);
    }

    #[test]
    fn test_unknown_field_falls_back_to_id_ascending() {
        for field in ["brand_id", "Price", "price desc", "1; DROP TABLE product", ""] {
            let order = SortResolver::resolve::<ProductField>(&[SortRequest::new(field, "desc")]);
            assert_eq!(
                order.keys(),
                &[(ProductField::Id, OrderDirection::Ascending)],
                "field {field:?}"
            );
        }
    }

    #[test]
    fn test_allowed_field_with_bad_direction_is_ascending() {
        let order = SortResolver::resolve::<ProductField>(&[SortRequest::new("price", "upward")]);
        assert_eq!(order.keys(), &[(ProductField::Price, OrderDirection::Ascending)]);

        let order = SortResolver::resolve::<ProductField>(&[SortRequest::field("name")]);
        assert_eq!(order.keys(), &[(ProductField::Name, OrderDirection::Ascending)]);
    }

    #[test]
    fn test_composite_sort_validates_each_entry() {
        let order = SortResolver::resolve::<ProductField>(&[
            SortRequest::new("price", "desc"),
            SortRequest::new("nope", "desc"),
            SortRequest::new("name", "asc"),
        ]);
        assert_eq!(
            order.keys(),
            &[
                (ProductField::Price, OrderDirection::Descending),
                (ProductField::Id, OrderDirection::Ascending),
                (ProductField::Name, OrderDirection::Ascending),
            ]
        );
    }

    #[test]
    fn test_compare_applies_keys_left_to_right() {
        let order = SortResolver::resolve::<ProductField>(&[
            SortRequest::new("price", "desc"),
            SortRequest::new("name", "asc"),
        ]);
        let a = Product::new("a", 100).with_id(ProductId::new(1));
        let b = Product::new("b", 100).with_id(ProductId::new(2));
        let c = Product::new("c", 200).with_id(ProductId::new(3));

        let mut rows = vec![b.clone(), a.clone(), c.clone()];
        rows.sort_by(|x, y| order.compare(x, y));
        let names: Vec<_> = rows.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }
}

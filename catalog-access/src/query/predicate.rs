//! Composable filter expressions over entity fields

use std::fmt;

use chrono::{DateTime, Utc};

use super::FilterValue;
use crate::model::{Entity, EntityField};

/// A boolean filter expression over the fields `F` of one entity
///
/// Leaves compare a single column; `And` / `Or` combine sub-expressions.
/// A column holding [`FilterValue::Null`] never satisfies `Eq`, `Range` or
/// `Contains`, matching SQL three-valued logic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate<F> {
    /// Matches every row
    All,
    /// `field = value`
    Eq(F, FilterValue),
    /// `min <= field <= max`, either bound optional
    Range {
        field: F,
        min: Option<FilterValue>,
        max: Option<FilterValue>,
    },
    /// Case-insensitive substring match; `needle` is stored lowercased
    Contains { field: F, needle: String },
    /// `field IS NULL`
    IsNull(F),
    /// Every clause matches
    And(Vec<Predicate<F>>),
    /// At least one clause matches
    Or(Vec<Predicate<F>>),
}

impl<F: EntityField> Predicate<F> {
    /// Case-insensitive substring clause
    pub fn contains(field: F, needle: &str) -> Self {
        Self::Contains {
            field,
            needle: needle.to_lowercase(),
        }
    }

    /// Whether this predicate places no constraint at all
    #[must_use]
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Evaluate the predicate against an entity
    pub fn matches<E>(&self, entity: &E) -> bool
    where
        E: Entity<Field = F>,
    {
        match self {
            Self::All => true,
            Self::Eq(field, expected) => {
                let actual = entity.field_value(*field);
                !actual.is_null() && actual == *expected
            }
            Self::Range { field, min, max } => {
                let actual = entity.field_value(*field);
                if actual.is_null() {
                    return min.is_none() && max.is_none();
                }
                let above_min = min.as_ref().map_or(true, |min| actual >= *min);
                let below_max = max.as_ref().map_or(true, |max| actual <= *max);
                above_min && below_max
            }
            Self::Contains { field, needle } => entity
                .field_value(*field)
                .as_str()
                .is_some_and(|haystack| haystack.to_lowercase().contains(needle.as_str())),
            Self::IsNull(field) => entity.field_value(*field).is_null(),
            Self::And(clauses) => clauses.iter().all(|clause| clause.matches(entity)),
            Self::Or(clauses) => clauses.iter().any(|clause| clause.matches(entity)),
        }
    }
}

impl<F: fmt::Display> fmt::Display for Predicate<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "TRUE"),
            Self::Eq(field, value) => write!(f, "{field} = {value}"),
            Self::Range { field, min, max } => match (min, max) {
                (Some(min), Some(max)) => write!(f, "{field} BETWEEN {min} AND {max}"),
                (Some(min), None) => write!(f, "{field} >= {min}"),
                (None, Some(max)) => write!(f, "{field} <= {max}"),
                (None, None) => write!(f, "TRUE"),
            },
            Self::Contains { field, needle } => {
                write!(f, "lower({field}) LIKE '%{}%'", needle.replace('\'', "''"))
            }
            Self::IsNull(field) => write!(f, "{field} IS NULL"),
            Self::And(clauses) => write_joined(f, clauses, " AND ", "TRUE"),
            Self::Or(clauses) => write_joined(f, clauses, " OR ", "FALSE"),
        }
    }
}

fn write_joined<F: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    clauses: &[Predicate<F>],
    separator: &str,
    empty: &str,
) -> fmt::Result {
    if clauses.is_empty() {
        return write!(f, "{empty}");
    }
    write!(f, "(")?;
    for (i, clause) in clauses.iter().enumerate() {
        if i > 0 {
            write!(f, "{separator}")?;
        }
        write!(f, "{clause}")?;
    }
    write!(f, ")")
}

/// Accumulates optional clauses into a conjunction
///
/// Every method takes the criterion as an `Option`; an absent (or blank)
/// criterion adds nothing, so the built predicate only constrains what the
/// caller actually supplied.
///
/// # Example
///
/// ```rust
/// use catalog_access::model::ProductField;
/// use catalog_access::query::{Predicate, PredicateBuilder};
///
/// let predicate = PredicateBuilder::new()
///     .contains(ProductField::Name, Some("  "))
///     .range(ProductField::Price, None, Some(5_000))
///     .build();
///
/// assert_eq!(predicate.to_string(), "price <= 5000");
/// assert!(PredicateBuilder::<ProductField>::new().build().is_all());
/// ```
#[derive(Debug, Clone)]
pub struct PredicateBuilder<F> {
    clauses: Vec<Predicate<F>>,
}

impl<F> Default for PredicateBuilder<F> {
    fn default() -> Self {
        Self {
            clauses: Vec::new(),
        }
    }
}

impl<F: EntityField> PredicateBuilder<F> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an arbitrary clause; `Predicate::All` is dropped
    #[must_use]
    pub fn and(mut self, clause: Predicate<F>) -> Self {
        if !clause.is_all() {
            self.clauses.push(clause);
        }
        self
    }

    /// Case-insensitive substring match, skipped when the text is blank
    #[must_use]
    pub fn contains(self, field: F, text: Option<&str>) -> Self {
        match non_blank(text) {
            Some(text) => self.and(Predicate::contains(field, text)),
            None => self,
        }
    }

    /// Substring match on any of `fields`, skipped when the text is blank
    #[must_use]
    pub fn any_contains(self, fields: &[F], text: Option<&str>) -> Self {
        match non_blank(text) {
            Some(text) => {
                let mut alternatives: Vec<_> = fields
                    .iter()
                    .map(|field| Predicate::contains(*field, text))
                    .collect();
                let clause = if alternatives.len() == 1 {
                    alternatives.remove(0)
                } else {
                    Predicate::Or(alternatives)
                };
                self.and(clause)
            }
            None => self,
        }
    }

    /// Exact equality, skipped when the value is absent
    #[must_use]
    pub fn eq<V: Into<FilterValue>>(self, field: F, value: Option<V>) -> Self {
        match value {
            Some(value) => self.and(Predicate::Eq(field, value.into())),
            None => self,
        }
    }

    /// Inclusive numeric range; either bound may be absent
    #[must_use]
    pub fn range(self, field: F, min: Option<i64>, max: Option<i64>) -> Self {
        self.bounded(field, min.map(FilterValue::Integer), max.map(FilterValue::Integer))
    }

    /// Inclusive timestamp window; either end may be open
    #[must_use]
    pub fn time_range(
        self,
        field: F,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        self.bounded(field, start.map(FilterValue::Timestamp), end.map(FilterValue::Timestamp))
    }

    fn bounded(self, field: F, min: Option<FilterValue>, max: Option<FilterValue>) -> Self {
        if min.is_none() && max.is_none() {
            return self;
        }
        self.and(Predicate::Range { field, min, max })
    }

    /// `field IS NULL` when `condition` holds
    #[must_use]
    pub fn is_null_if(self, field: F, condition: bool) -> Self {
        if condition {
            self.and(Predicate::IsNull(field))
        } else {
            self
        }
    }

    /// The conjunction of every clause added so far
    #[must_use]
    pub fn build(mut self) -> Predicate<F> {
        match self.clauses.len() {
            0 => Predicate::All,
            1 => self.clauses.remove(0),
            _ => Predicate::And(self.clauses),
        }
    }
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|text| !text.is_empty())
}

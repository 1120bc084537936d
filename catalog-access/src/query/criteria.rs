//! Caller-facing search criteria and their validation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SortRequest;
use crate::config::QueryConfig;
use crate::error::{Error, Result};
use crate::model::{BrandId, CategoryId, OrderStatus, UserId};
use crate::repository::Pagination;

/// What a caller is searching for
///
/// Every filter is optional; an absent filter places no constraint. Which
/// filters apply depends on the entity searched (see
/// [`Searchable`](super::Searchable)). Values are built once per request and
/// never modified by the core.
///
/// # Example
///
/// ```rust
/// use catalog_access::config::QueryConfig;
/// use catalog_access::query::{SearchCriteria, SortRequest};
///
/// let criteria: SearchCriteria = serde_json::from_str(
///     r#"{"keyword": "shoe", "minPrice": 1000, "page": 2, "size": 500,
///         "sort": [{"field": "price", "direction": "desc"}]}"#,
/// ).unwrap();
///
/// let page = criteria.validate(&QueryConfig::default()).unwrap();
/// assert_eq!(page.page_index, 2);
/// assert_eq!(page.page_size, 100);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchCriteria {
    /// Free-text keyword
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,

    /// Inclusive lower price bound; a lower bound above the upper one
    /// matches nothing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<i64>,

    /// Inclusive upper price bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_id: Option<BrandId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,

    /// Username substring (users)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Email substring (users)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Order state (orders)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,

    /// Inclusive lower bound on the order timestamp (orders)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,

    /// Inclusive upper bound on the order timestamp (orders)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,

    /// Only top-level nodes (categories)
    pub roots_only: bool,

    /// Zero-based page index
    pub page: i64,

    /// Requested page size; the configured default when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,

    /// Sort requests, applied left to right
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortRequest>,
}

impl SearchCriteria {
    /// Criteria with every filter absent: first page, default size, id order
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    #[must_use]
    pub fn with_price_range(mut self, min: Option<i64>, max: Option<i64>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    #[must_use]
    pub fn with_brand(mut self, brand_id: BrandId) -> Self {
        self.brand_id = Some(brand_id);
        self
    }

    #[must_use]
    pub fn with_category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    #[must_use]
    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Order timestamp window; either bound may be left open
    #[must_use]
    pub fn with_order_dates(
        mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    #[must_use]
    pub fn with_roots_only(mut self) -> Self {
        self.roots_only = true;
        self
    }

    #[must_use]
    pub fn with_page(mut self, page: i64) -> Self {
        self.page = page;
        self
    }

    #[must_use]
    pub fn with_size(mut self, size: i64) -> Self {
        self.size = Some(size);
        self
    }

    /// Append a sort request
    #[must_use]
    pub fn with_sort(mut self, sort: SortRequest) -> Self {
        self.sort.push(sort);
        self
    }

    /// Keyword, or `None` when absent or blank
    pub fn keyword(&self) -> Option<&str> {
        non_blank(self.keyword.as_deref())
    }

    pub fn username(&self) -> Option<&str> {
        non_blank(self.username.as_deref())
    }

    pub fn email(&self) -> Option<&str> {
        non_blank(self.email.as_deref())
    }

    pub fn sort(&self) -> &[SortRequest] {
        &self.sort
    }

    /// Check the criteria and resolve the page to fetch
    ///
    /// Fails with [`Error::Validation`] for a negative page or a non-positive
    /// size. The size is defaulted and clamped through `config`. Inverted
    /// bounds are not an error; they select nothing.
    pub fn validate(&self, config: &QueryConfig) -> Result<PageRequest> {
        let page_index = u64::try_from(self.page)
            .map_err(|_| Error::Validation(format!("page must not be negative, got {}", self.page)))?;

        let size = match self.size {
            Some(size) if size <= 0 => {
                return Err(Error::Validation(format!(
                    "size must be greater than zero, got {size}"
                )));
            }
            Some(size) => u64::try_from(size).ok(),
            None => None,
        };

        Ok(PageRequest {
            page_index,
            page_size: config.effective_page_size(size),
        })
    }
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|text| !text.is_empty())
}

/// A validated page position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Zero-based page index
    pub page_index: u64,
    /// Page size, already clamped
    pub page_size: u64,
}

impl PageRequest {
    /// Offset/limit window for this page
    #[must_use]
    pub fn pagination(&self) -> Pagination {
        Pagination::page(self.page_index, self.page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_criteria_is_valid() {
        let page = SearchCriteria::new().validate(&QueryConfig::default()).unwrap();
        assert_eq!(page, PageRequest { page_index: 0, page_size: 20 });
    }

    #[test]
    fn test_negative_page_rejected() {
        let err = SearchCriteria::new()
            .with_page(-1)
            .validate(&QueryConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_non_positive_size_rejected() {
        for size in [0, -5] {
            let err = SearchCriteria::new()
                .with_size(size)
                .validate(&QueryConfig::default())
                .unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "size {size}");
        }
    }

    #[test]
    fn test_inverted_price_range_is_valid() {
        let page = SearchCriteria::new()
            .with_price_range(Some(500), Some(100))
            .validate(&QueryConfig::default())
            .unwrap();
        assert_eq!(page, PageRequest { page_index: 0, page_size: 20 });
    }

    #[test]
    fn test_size_clamped_to_configured_max() {
        let config = QueryConfig {
            default_page_size: 5,
            max_page_size: 30,
        };
        let page = SearchCriteria::new().with_size(31).validate(&config).unwrap();
        assert_eq!(page.page_size, 30);
        let page = SearchCriteria::new().validate(&config).unwrap();
        assert_eq!(page.page_size, 5);
    }

    #[test]
    fn test_huge_page_offset_does_not_overflow() {
        let page = SearchCriteria::new()
            .with_page(i64::MAX)
            .with_size(100)
            .validate(&QueryConfig::default())
            .unwrap();
        assert_eq!(page.pagination().offset, u64::MAX);
    }

    #[test]
    fn test_blank_text_filters_are_absent() {
        let criteria = SearchCriteria::new().with_keyword("   ").with_username("\t");
        assert_eq!(criteria.keyword(), None);
        assert_eq!(criteria.username(), None);
        assert_eq!(SearchCriteria::new().with_email(" a@b ").email(), Some("a@b"));
    }

    #[test]
    fn test_deserialize_camel_case() {
        let criteria: SearchCriteria =
            serde_json::from_str(r#"{"brandId": 7, "rootsOnly": true, "maxPrice": 50000}"#).unwrap();
        assert_eq!(criteria.brand_id, Some(BrandId::new(7)));
        assert!(criteria.roots_only);
        assert_eq!(criteria.max_price, Some(50_000));
        assert_eq!(criteria.page, 0);
    }

    #[test]
    fn test_deserialize_order_filters() {
        let criteria: SearchCriteria = serde_json::from_str(
            r#"{"userId": 3, "status": "SHIPPED", "startDate": "2024-03-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(criteria.user_id, Some(UserId::new(3)));
        assert_eq!(criteria.status, Some(OrderStatus::Shipped));
        assert_eq!(
            criteria.start_date.map(|d| d.to_rfc3339()),
            Some("2024-03-01T00:00:00+00:00".to_string())
        );
        assert_eq!(criteria.end_date, None);
    }
}

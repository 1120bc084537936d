use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::de::DeserializeOwned;

use catalog_access::model::{BrandId, CategoryId, OrderStatus, UserId};
use catalog_access::query::{SearchCriteria, SortRequest};

pub mod categories;
pub mod orders;
pub mod products;
pub mod users;

/// Filters, paging and ordering shared by every `search` subcommand
///
/// Filters that do not apply to the entity searched are ignored.
#[derive(Args, Debug, Default)]
pub struct SearchArgs {
    /// Free-text keyword
    #[arg(short, long)]
    keyword: Option<String>,

    /// Inclusive lower price bound
    #[arg(long, value_name = "AMOUNT", allow_negative_numbers = true)]
    min_price: Option<i64>,

    /// Inclusive upper price bound
    #[arg(long, value_name = "AMOUNT", allow_negative_numbers = true)]
    max_price: Option<i64>,

    #[arg(long, value_name = "ID")]
    brand: Option<i64>,

    /// Category id (parent id when searching categories)
    #[arg(long, value_name = "ID")]
    category: Option<i64>,

    #[arg(long, value_name = "ID")]
    user: Option<i64>,

    #[arg(long)]
    username: Option<String>,

    #[arg(long)]
    email: Option<String>,

    /// Order status, e.g. shipped
    #[arg(long, value_parser = parse_status)]
    status: Option<OrderStatus>,

    /// Orders placed at or after this RFC 3339 timestamp
    #[arg(long, value_name = "TIMESTAMP")]
    from: Option<DateTime<Utc>>,

    /// Orders placed at or before this RFC 3339 timestamp
    #[arg(long, value_name = "TIMESTAMP")]
    until: Option<DateTime<Utc>>,

    /// Top-level categories only
    #[arg(long)]
    roots_only: bool,

    /// Zero-based page index
    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    page: i64,

    /// Page size (configured default when omitted)
    #[arg(short, long, allow_negative_numbers = true)]
    size: Option<i64>,

    /// Sort key as `field` or `field:direction`, repeatable
    #[arg(long = "sort", value_name = "FIELD[:DIR]")]
    sort: Vec<String>,
}

impl SearchArgs {
    pub fn to_criteria(&self) -> SearchCriteria {
        SearchCriteria {
            keyword: self.keyword.clone(),
            min_price: self.min_price,
            max_price: self.max_price,
            brand_id: self.brand.map(BrandId::new),
            category_id: self.category.map(CategoryId::new),
            user_id: self.user.map(UserId::new),
            username: self.username.clone(),
            email: self.email.clone(),
            status: self.status,
            start_date: self.from,
            end_date: self.until,
            roots_only: self.roots_only,
            page: self.page,
            size: self.size,
            sort: self.sort.iter().map(|key| parse_sort(key)).collect(),
        }
    }
}

fn parse_sort(key: &str) -> SortRequest {
    match key.split_once(':') {
        Some((field, direction)) => SortRequest::new(field, direction),
        None => SortRequest::field(key),
    }
}

fn parse_status(name: &str) -> Result<OrderStatus> {
    serde_json::from_value(serde_json::Value::String(name.trim().to_uppercase()))
        .map_err(|_| anyhow!("Unknown order status '{name}'"))
}

/// Parse a view name such as `with_brand` into the entity's view enum
pub fn parse_view<V: DeserializeOwned>(name: &str) -> Result<V> {
    serde_json::from_value(serde_json::Value::String(name.replace('-', "_")))
        .map_err(|_| anyhow!("Unknown view '{name}'"))
}

//! # catalog-access
//!
//! Filtering, sorting, paging and eager-loading core for catalog, user and
//! order collections, plus a category hierarchy that can never contain a
//! cycle.
//!
//! ## Features
//!
//! - **Typed criteria**: every filter and sort column is a closed enum per
//!   entity; unknown sort keys fall back to id order instead of reaching storage
//! - **Consistent paging**: content and total count come from the same predicate
//! - **Fan-out safe eager loading**: at most one to-many relation is joined,
//!   the rest are loaded by id in secondary queries
//! - **Category tree guard**: attach, reparent and detach are validated before
//!   any link changes
//! - **Pluggable storage**: [`repository::StorageBackend`] with an in-memory
//!   implementation for fixtures and tests
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use catalog_access::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Load configuration
//!     let config = Config::load()?;
//!
//!     // Initialize tracing
//!     init_tracing(&config)?;
//!
//!     let store = Arc::new(MemoryStore::seeded([
//!         Product::new("Trail Shoe", 12_900).with_brand_id(BrandId::new(7)),
//!     ]));
//!     let products = ProductService::new(store, config.query);
//!
//!     let criteria = SearchCriteria::new()
//!         .with_brand(BrandId::new(7))
//!         .with_sort(SortRequest::new("price", "desc"));
//!     let page = products.search(&criteria, ProductView::WithBrand).await?;
//!     println!("{} of {}", page.len(), page.total_elements);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod observability;
pub mod pagination;
pub mod query;
pub mod repository;
pub mod service;
pub mod tree;

pub use error::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, QueryConfig, ServiceConfig};
    pub use crate::error::{Error, Result};
    pub use crate::model::{
        Address, Brand, BrandId, Category, CategoryId, CategoryView, Entity, Order, OrderId,
        OrderItem, OrderStatus, OrderSummary, OrderView, Product, ProductId, ProductImage,
        ProductView, User, UserId, UserProfile, UserView,
    };
    pub use crate::observability::init_tracing;
    pub use crate::pagination::PageResult;
    pub use crate::query::{SearchCriteria, SortRequest};
    pub use crate::repository::{MemoryStore, RepositoryError, StorageBackend};
    pub use crate::service::{
        CategorySearchService, CategoryService, OrderService, ProductService, SearchService,
        UserService,
    };
    pub use crate::tree::CategoryTree;
}

//! Entry points called by outer layers
//!
//! - [`SearchService`]: criteria search and lookup per entity; create and
//!   delete for entities whose rows stand alone
//! - [`CategoryService`]: cycle-checked hierarchy changes persisted to storage,
//!   the only way to create or delete a category

pub mod category;
pub mod search;

pub use category::CategoryService;
pub use search::{CategorySearchService, OrderService, ProductService, SearchService, UserService};

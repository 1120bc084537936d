//! JSON fixture loading

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;

use catalog_access::model::{Category, Order, Product, User};
use catalog_access::repository::MemoryStore;

/// Rows to seed the in-memory stores with
///
/// Every collection is optional, so a fixture may hold only the entities a
/// command needs.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub products: Vec<Product>,
    pub users: Vec<User>,
    pub orders: Vec<Order>,
    pub categories: Vec<Category>,
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid fixture: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn product_store(self) -> Arc<MemoryStore<Product>> {
        Arc::new(MemoryStore::seeded(self.products))
    }

    pub fn user_store(self) -> Arc<MemoryStore<User>> {
        Arc::new(MemoryStore::seeded(self.users))
    }

    pub fn order_store(self) -> Arc<MemoryStore<Order>> {
        Arc::new(MemoryStore::seeded(self.orders))
    }

    pub fn category_store(self) -> Arc<MemoryStore<Category>> {
        Arc::new(MemoryStore::seeded(self.categories))
    }
}

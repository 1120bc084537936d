//! Products, brands and product images

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    BrandId, Cardinality, Category, CategoryId, Entity, EntityField, EntityRelation, FetchView,
    ImageId, ProductId, StandaloneRows,
};
use crate::query::FilterValue;

/// A brand a product is sold under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
}

impl Brand {
    pub fn new(id: BrandId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// An image attached to a product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: Option<ImageId>,
    pub url: String,
    #[serde(default)]
    pub thumbnail: bool,
}

impl ProductImage {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            id: None,
            url: url.into(),
            thumbnail: false,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: ImageId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn as_thumbnail(mut self) -> Self {
        self.thumbnail = true;
        self
    }
}

/// A catalog product
///
/// `brand_id` and `category_id` are the foreign-key columns used for
/// filtering; `brand`, `category` and `images` are only populated when a fetch
/// plan asks for them.
///
/// # Example
///
/// ```rust
/// use catalog_access::model::{Brand, BrandId, Product, ProductId};
///
/// let product = Product::new("Trail Shoe", 12_900)
///     .with_id(ProductId::new(10))
///     .with_brand(Brand::new(BrandId::new(7), "Summit"));
///
/// assert_eq!(product.brand_id, Some(BrandId::new(7)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Option<ProductId>,
    pub name: String,
    pub price: i64,
    #[serde(default)]
    pub brand_id: Option<BrandId>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<Brand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ProductImage>,
}

impl Product {
    /// Create an unsaved product
    pub fn new(name: impl Into<String>, price: i64) -> Self {
        Self {
            id: None,
            name: name.into(),
            price,
            brand_id: None,
            category_id: None,
            created_at: Utc::now(),
            brand: None,
            category: None,
            images: Vec::new(),
        }
    }

    /// Use a pre-assigned identifier (import or update-by-id)
    #[must_use]
    pub fn with_id(mut self, id: ProductId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the brand column and its row
    #[must_use]
    pub fn with_brand(mut self, brand: Brand) -> Self {
        self.brand_id = Some(brand.id);
        self.brand = Some(brand);
        self
    }

    /// Set only the brand column
    #[must_use]
    pub fn with_brand_id(mut self, brand_id: BrandId) -> Self {
        self.brand_id = Some(brand_id);
        self
    }

    /// Set the category column and its row
    ///
    /// A category without an identifier only fills the relation.
    #[must_use]
    pub fn with_category(mut self, category: Category) -> Self {
        self.category_id = category.id;
        self.category = Some(category);
        self
    }

    /// Set only the category column
    #[must_use]
    pub fn with_category_id(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    #[must_use]
    pub fn with_image(mut self, image: ProductImage) -> Self {
        self.images.push(image);
        self
    }

    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// The image flagged as thumbnail, if loaded
    pub fn thumbnail(&self) -> Option<&ProductImage> {
        self.images.iter().find(|image| image.thumbnail)
    }
}

/// Filterable and sortable product columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductField {
    Id,
    Name,
    Price,
    BrandId,
    CategoryId,
    CreatedAt,
}

impl EntityField for ProductField {
    const ID: Self = Self::Id;

    fn sort_key(name: &str) -> Option<Self> {
        match name {
            "id" => Some(Self::Id),
            "name" => Some(Self::Name),
            "price" => Some(Self::Price),
            "createdAt" | "created_at" => Some(Self::CreatedAt),
            _ => None,
        }
    }
}

impl fmt::Display for ProductField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id => write!(f, "id"),
            Self::Name => write!(f, "name"),
            Self::Price => write!(f, "price"),
            Self::BrandId => write!(f, "brand_id"),
            Self::CategoryId => write!(f, "category_id"),
            Self::CreatedAt => write!(f, "created_at"),
        }
    }
}

/// Eager-loadable product associations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductRelation {
    Brand,
    Category,
    Images,
}

impl EntityRelation for ProductRelation {
    const ALL: &'static [Self] = &[Self::Brand, Self::Category, Self::Images];

    fn cardinality(self) -> Cardinality {
        match self {
            Self::Brand | Self::Category => Cardinality::ToOne,
            Self::Images => Cardinality::ToMany,
        }
    }
}

impl fmt::Display for ProductRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Brand => write!(f, "brand"),
            Self::Category => write!(f, "category"),
            Self::Images => write!(f, "images"),
        }
    }
}

/// Row carried by a product relation
#[derive(Debug, Clone, PartialEq)]
pub enum ProductChild {
    Brand(Brand),
    Category(Category),
    Image(ProductImage),
}

/// Product request shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductView {
    #[default]
    Root,
    WithBrand,
    WithCategory,
    WithImages,
    Full,
}

impl FetchView<ProductRelation> for ProductView {
    fn relations(&self) -> Vec<ProductRelation> {
        match self {
            Self::Root => Vec::new(),
            Self::WithBrand => vec![ProductRelation::Brand],
            Self::WithCategory => vec![ProductRelation::Category],
            Self::WithImages => vec![ProductRelation::Images],
            Self::Full => vec![
                ProductRelation::Brand,
                ProductRelation::Category,
                ProductRelation::Images,
            ],
        }
    }
}

impl StandaloneRows for Product {}

impl Entity for Product {
    type Id = ProductId;
    type Field = ProductField;
    type Relation = ProductRelation;
    type Child = ProductChild;

    const ENTITY_TYPE: &'static str = "Product";

    fn id(&self) -> Option<ProductId> {
        self.id
    }

    fn assign_id(self, id: ProductId) -> Self {
        self.with_id(id)
    }

    fn field_value(&self, field: ProductField) -> FilterValue {
        match field {
            ProductField::Id => self.id.map_or(FilterValue::Null, Into::into),
            ProductField::Name => FilterValue::from(self.name.as_str()),
            ProductField::Price => FilterValue::Integer(self.price),
            ProductField::BrandId => self.brand_id.map_or(FilterValue::Null, Into::into),
            ProductField::CategoryId => self.category_id.map_or(FilterValue::Null, Into::into),
            ProductField::CreatedAt => FilterValue::Timestamp(self.created_at),
        }
    }

    fn detached(&self) -> Self {
        Self {
            brand: None,
            category: None,
            images: Vec::new(),
            ..self.clone()
        }
    }

    fn related(&self, relation: ProductRelation) -> Vec<ProductChild> {
        match relation {
            ProductRelation::Brand => self.brand.iter().cloned().map(ProductChild::Brand).collect(),
            ProductRelation::Category => self
                .category
                .iter()
                .map(|category| ProductChild::Category(category.detached()))
                .collect(),
            ProductRelation::Images => self.images.iter().cloned().map(ProductChild::Image).collect(),
        }
    }

    fn attach(&mut self, relation: ProductRelation, rows: Vec<ProductChild>) {
        for row in rows {
            match (relation, row) {
                (ProductRelation::Brand, ProductChild::Brand(brand)) => {
                    self.brand.get_or_insert(brand);
                }
                (ProductRelation::Category, ProductChild::Category(category)) => {
                    self.category.get_or_insert(category);
                }
                (ProductRelation::Images, ProductChild::Image(image)) => self.images.push(image),
                (relation, row) => {
                    tracing::warn!(%relation, ?row, "ignoring row of the wrong kind for relation");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Product {
        Product::new("Trail Shoe", 12_900)
            .with_id(ProductId::new(1))
            .with_brand(Brand::new(BrandId::new(7), "Summit"))
            .with_image(ProductImage::new("a.png").as_thumbnail())
            .with_image(ProductImage::new("b.png"))
    }

    #[test]
    fn test_sort_key_allow_list() {
        assert_eq!(ProductField::sort_key("price"), Some(ProductField::Price));
        assert_eq!(ProductField::sort_key("createdAt"), Some(ProductField::CreatedAt));
        assert_eq!(ProductField::sort_key("brand_id"), None);
        assert_eq!(ProductField::sort_key("price; DROP TABLE product"), None);
    }

    #[test]
    fn test_detached_clears_relations_only() {
        let product = sample();
        let bare = product.detached();
        assert!(bare.brand.is_none());
        assert!(bare.images.is_empty());
        assert_eq!(bare.brand_id, Some(BrandId::new(7)));
        assert_eq!(bare.name, product.name);
    }

    #[test]
    fn test_related_then_attach_restores_relation() {
        let product = sample();
        let mut bare = product.detached();
        bare.attach(ProductRelation::Images, product.related(ProductRelation::Images));
        bare.attach(ProductRelation::Brand, product.related(ProductRelation::Brand));
        assert_eq!(bare, product);
        assert_eq!(bare.thumbnail().map(|i| i.url.as_str()), Some("a.png"));
    }

    #[test]
    fn test_field_values() {
        let product = sample();
        assert_eq!(product.field_value(ProductField::Price), FilterValue::Integer(12_900));
        assert_eq!(product.field_value(ProductField::CategoryId), FilterValue::Null);
    }

    #[test]
    fn test_full_view_lists_every_relation() {
        assert_eq!(ProductView::Full.relations(), ProductRelation::ALL.to_vec());
        assert!(ProductView::Root.relations().is_empty());
    }
}

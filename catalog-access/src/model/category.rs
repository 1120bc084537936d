//! Self-referencing product categories

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Cardinality, CategoryId, Entity, EntityField, EntityRelation, FetchView};
use crate::query::FilterValue;

/// A node of the category hierarchy
///
/// Only `parent_id` is persisted. `parent` and `children` are filled by a
/// fetch plan; structural changes go through [`CategoryTree`](crate::tree::CategoryTree),
/// which enforces the no-cycle invariant before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Option<CategoryId>,
    pub name: String,
    #[serde(default)]
    pub(crate) parent_id: Option<CategoryId>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<Category>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Category>,
}

impl Category {
    /// Create an unsaved root category
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            parent_id: None,
            created_at: Utc::now(),
            parent: None,
            children: Vec::new(),
        }
    }

    /// Use a pre-assigned identifier (import or update-by-id)
    #[must_use]
    pub fn with_id(mut self, id: CategoryId) -> Self {
        self.id = Some(id);
        self
    }

    /// Place the category under `parent` when first created
    ///
    /// Moving an existing category must go through the tree so the move is
    /// checked for cycles.
    #[must_use]
    pub fn under(mut self, parent: CategoryId) -> Self {
        self.parent_id = Some(parent);
        self
    }

    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Stored parent link
    pub fn parent_id(&self) -> Option<CategoryId> {
        self.parent_id
    }

    /// Whether the category sits at the top of the hierarchy
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Rewrite the parent column after the tree accepted the move
    pub(crate) fn with_parent(mut self, parent: Option<CategoryId>) -> Self {
        self.parent_id = parent;
        self
    }
}

/// Filterable and sortable category columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryField {
    Id,
    Name,
    ParentId,
    CreatedAt,
}

impl EntityField for CategoryField {
    const ID: Self = Self::Id;

    fn sort_key(name: &str) -> Option<Self> {
        match name {
            "id" => Some(Self::Id),
            "name" => Some(Self::Name),
            "createdAt" | "created_at" => Some(Self::CreatedAt),
            _ => None,
        }
    }
}

impl fmt::Display for CategoryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id => write!(f, "id"),
            Self::Name => write!(f, "name"),
            Self::ParentId => write!(f, "parent_id"),
            Self::CreatedAt => write!(f, "created_at"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryRelation {
    Parent,
    Children,
}

impl EntityRelation for CategoryRelation {
    const ALL: &'static [Self] = &[Self::Parent, Self::Children];

    fn cardinality(self) -> Cardinality {
        match self {
            Self::Parent => Cardinality::ToOne,
            Self::Children => Cardinality::ToMany,
        }
    }
}

impl fmt::Display for CategoryRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parent => write!(f, "parent"),
            Self::Children => write!(f, "children"),
        }
    }
}

/// Category request shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryView {
    #[default]
    Root,
    WithParent,
    WithChildren,
    Full,
}

impl FetchView<CategoryRelation> for CategoryView {
    fn relations(&self) -> Vec<CategoryRelation> {
        match self {
            Self::Root => Vec::new(),
            Self::WithParent => vec![CategoryRelation::Parent],
            Self::WithChildren => vec![CategoryRelation::Children],
            Self::Full => vec![CategoryRelation::Parent, CategoryRelation::Children],
        }
    }
}

impl Entity for Category {
    type Id = CategoryId;
    type Field = CategoryField;
    type Relation = CategoryRelation;
    type Child = Category;

    const ENTITY_TYPE: &'static str = "Category";

    fn id(&self) -> Option<CategoryId> {
        self.id
    }

    fn assign_id(self, id: CategoryId) -> Self {
        self.with_id(id)
    }

    fn field_value(&self, field: CategoryField) -> FilterValue {
        match field {
            CategoryField::Id => self.id.map_or(FilterValue::Null, Into::into),
            CategoryField::Name => FilterValue::from(self.name.as_str()),
            CategoryField::ParentId => self.parent_id.map_or(FilterValue::Null, Into::into),
            CategoryField::CreatedAt => FilterValue::Timestamp(self.created_at),
        }
    }

    fn detached(&self) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            ..self.clone()
        }
    }

    fn related(&self, relation: CategoryRelation) -> Vec<Category> {
        match relation {
            CategoryRelation::Parent => self.parent.iter().map(|p| p.detached()).collect(),
            CategoryRelation::Children => self.children.iter().map(Category::detached).collect(),
        }
    }

    fn attach(&mut self, relation: CategoryRelation, rows: Vec<Category>) {
        match relation {
            CategoryRelation::Parent => {
                if self.parent.is_none() {
                    self.parent = rows.into_iter().next().map(Box::new);
                }
            }
            CategoryRelation::Children => self.children.extend(rows),
        }
    }

    fn self_join(
        &self,
        relation: CategoryRelation,
        table: &BTreeMap<CategoryId, Category>,
    ) -> Option<Vec<Category>> {
        let rows = match relation {
            CategoryRelation::Parent => self
                .parent_id
                .and_then(|parent| table.get(&parent))
                .map(Category::detached)
                .into_iter()
                .collect(),
            CategoryRelation::Children => match self.id {
                Some(id) => table
                    .values()
                    .filter(|row| row.parent_id == Some(id))
                    .map(Category::detached)
                    .collect(),
                None => Vec::new(),
            },
        };
        Some(rows)
    }
}

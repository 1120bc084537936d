//! Category hierarchy guard
//!
//! The category hierarchy is held as an explicit graph keyed by
//! [`CategoryId`]: every node records its parent id and the ordered set of
//! its children ids. Parent and child links are only ever changed together,
//! through the operations on [`CategoryTree`], and every operation validates
//! fully before it mutates anything, so a rejected call leaves the tree
//! exactly as it was.
//!
//! The tree holds no lock. Callers serialise structural changes, e.g. by
//! owning the tree behind a `tokio::sync::Mutex` as
//! [`CategoryService`](crate::service::CategoryService) does.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::error::{Error, Result};
use crate::model::{Category, CategoryId};

/// A node of the category forest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryNode {
    pub id: CategoryId,
    pub name: String,
    parent: Option<CategoryId>,
    children: BTreeSet<CategoryId>,
}

impl CategoryNode {
    fn new(id: CategoryId, name: String) -> Self {
        Self {
            id,
            name,
            parent: None,
            children: BTreeSet::new(),
        }
    }

    /// Parent lookup; `None` for a root
    pub fn parent(&self) -> Option<CategoryId> {
        self.parent
    }

    /// Children in id order
    pub fn children(&self) -> impl Iterator<Item = CategoryId> + '_ {
        self.children.iter().copied()
    }
}

/// A parent change not yet written to storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentChange {
    pub id: CategoryId,
    /// Parent as last persisted
    pub from: Option<CategoryId>,
    /// Parent now
    pub to: Option<CategoryId>,
}

/// Mutable category forest that never contains a cycle
///
/// # Example
///
/// ```rust
/// use catalog_access::model::CategoryId;
/// use catalog_access::tree::CategoryTree;
/// use catalog_access::Error;
///
/// let (a, b, c) = (CategoryId::new(1), CategoryId::new(2), CategoryId::new(3));
/// let mut tree = CategoryTree::new();
/// tree.insert(a, "A").unwrap();
/// tree.insert(b, "B").unwrap();
/// tree.insert(c, "C").unwrap();
///
/// tree.attach_child(a, b).unwrap();
/// tree.attach_child(b, c).unwrap();
///
/// let err = tree.reparent(a, Some(c)).unwrap_err();
/// assert!(matches!(err, Error::Cycle { .. }));
/// assert_eq!(tree.parent_of(a), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryTree {
    nodes: HashMap<CategoryId, CategoryNode>,
    pending: BTreeMap<CategoryId, Option<CategoryId>>,
}

impl CategoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the forest from stored rows
    ///
    /// Fails when a row has no id, names a parent that is not among the rows,
    /// or when the stored parent links already contain a cycle.
    pub fn from_categories<'a>(categories: impl IntoIterator<Item = &'a Category>) -> Result<Self> {
        let mut tree = Self::new();
        let mut links = Vec::new();

        for category in categories {
            let id = category
                .id
                .ok_or_else(|| Error::Validation(format!("category '{}' has no id", category.name)))?;
            tree.insert(id, category.name.clone())?;
            if let Some(parent) = category.parent_id {
                links.push((id, parent));
            }
        }

        for (child, parent) in links {
            if !tree.nodes.contains_key(&parent) {
                return Err(Error::not_found("Category", parent));
            }
            tree.link(parent, child);
        }

        for &id in tree.nodes.keys() {
            if let Some(parent) = tree.parent_of(id) {
                if tree.is_ancestor_or_self(id, parent) {
                    return Err(Error::Cycle { child: id, parent });
                }
            }
        }

        tree.pending.clear();
        Ok(tree)
    }

    /// Add a standalone root node
    pub fn insert(&mut self, id: CategoryId, name: impl Into<String>) -> Result<()> {
        if self.nodes.contains_key(&id) {
            return Err(Error::Conflict(format!("Category {id} already in tree")));
        }
        self.nodes.insert(id, CategoryNode::new(id, name.into()));
        Ok(())
    }

    /// Remove a node, detaching it from its parent and from every child
    ///
    /// Former children become roots.
    pub fn remove(&mut self, id: CategoryId) -> Result<CategoryNode> {
        let node = self.node(id)?;
        let parent = node.parent;
        let children: Vec<_> = node.children().collect();

        if let Some(parent) = parent {
            self.unlink(parent, id);
        }
        for child in children {
            self.unlink(id, child);
        }

        self.pending.remove(&id);
        self.nodes
            .remove(&id)
            .ok_or_else(|| Error::Internal(format!("category {id} vanished during removal")))
    }

    /// Make `child` a child of `parent`
    ///
    /// Rejected with [`Error::Cycle`] when `child` is `parent` or one of its
    /// ancestors. Attaching an existing child again is a no-op. A child that
    /// currently has another parent is moved.
    pub fn attach_child(&mut self, parent: CategoryId, child: CategoryId) -> Result<()> {
        self.node(parent)?;
        let current = self.node(child)?.parent;

        if self.is_ancestor_or_self(child, parent) {
            tracing::debug!(%parent, %child, "rejecting attach that would create a cycle");
            return Err(Error::Cycle { child, parent });
        }
        if current == Some(parent) {
            return Ok(());
        }

        if let Some(previous) = current {
            self.unlink(previous, child);
        }
        self.link(parent, child);
        Ok(())
    }

    /// Move `node` under `new_parent`, or make it a root when `None`
    pub fn reparent(&mut self, node: CategoryId, new_parent: Option<CategoryId>) -> Result<()> {
        match new_parent {
            Some(parent) => self.attach_child(parent, node),
            None => {
                if let Some(previous) = self.node(node)?.parent {
                    self.unlink(previous, node);
                }
                Ok(())
            }
        }
    }

    /// Remove `child` from `parent`; a no-op when it is not a child of `parent`
    pub fn detach_child(&mut self, parent: CategoryId, child: CategoryId) -> Result<()> {
        self.node(parent)?;
        if self.node(child)?.parent == Some(parent) {
            self.unlink(parent, child);
        }
        Ok(())
    }

    pub fn get(&self, id: CategoryId) -> Option<&CategoryNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: CategoryId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn parent_of(&self, id: CategoryId) -> Option<CategoryId> {
        self.nodes.get(&id).and_then(|node| node.parent)
    }

    /// Children of `id` in id order; empty for unknown ids
    pub fn children_of(&self, id: CategoryId) -> Vec<CategoryId> {
        self.nodes
            .get(&id)
            .map(|node| node.children().collect())
            .unwrap_or_default()
    }

    /// Ancestors of `id`, nearest first
    pub fn ancestors(&self, id: CategoryId) -> Vec<CategoryId> {
        let mut ancestors = Vec::new();
        let mut current = self.parent_of(id);
        while let Some(parent) = current {
            if ancestors.len() > self.nodes.len() {
                break;
            }
            ancestors.push(parent);
            current = self.parent_of(parent);
        }
        ancestors
    }

    /// Every node below `id`, depth-first
    pub fn descendants(&self, id: CategoryId) -> Vec<CategoryId> {
        let mut found = Vec::new();
        let mut stack: Vec<CategoryId> = self.children_of(id).into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            found.push(next);
            stack.extend(self.children_of(next).into_iter().rev());
        }
        found
    }

    /// Top-level nodes in id order
    pub fn roots(&self) -> Vec<CategoryId> {
        let mut roots: Vec<_> = self
            .nodes
            .values()
            .filter(|node| node.parent.is_none())
            .map(|node| node.id)
            .collect();
        roots.sort_unstable();
        roots
    }

    /// Parent changes made since the tree was loaded or last drained
    ///
    /// Nodes moved and then moved back are left out.
    pub fn pending_changes(&self) -> Vec<ParentChange> {
        self.pending
            .iter()
            .filter_map(|(&id, &from)| {
                let to = self.parent_of(id);
                (from != to).then_some(ParentChange { id, from, to })
            })
            .collect()
    }

    /// Forget pending changes once they are persisted
    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    fn node(&self, id: CategoryId) -> Result<&CategoryNode> {
        self.nodes
            .get(&id)
            .ok_or_else(|| Error::not_found("Category", id))
    }

    /// Whether `candidate` is `node` or one of its ancestors
    fn is_ancestor_or_self(&self, candidate: CategoryId, node: CategoryId) -> bool {
        let mut current = Some(node);
        let mut steps = 0;
        while let Some(id) = current {
            if id == candidate {
                return true;
            }
            steps += 1;
            if steps > self.nodes.len() {
                // Only reachable with a corrupt parent chain; treat as a cycle.
                return true;
            }
            current = self.parent_of(id);
        }
        false
    }

    fn record(&mut self, id: CategoryId) {
        let parent = self.parent_of(id);
        self.pending.entry(id).or_insert(parent);
    }

    fn link(&mut self, parent: CategoryId, child: CategoryId) {
        self.record(child);
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.insert(child);
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
    }

    fn unlink(&mut self, parent: CategoryId, child: CategoryId) {
        self.record(child);
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.remove(&child);
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = None;
        }
    }

    fn render_node(&self, f: &mut fmt::Formatter<'_>, id: CategoryId, depth: usize) -> fmt::Result {
        if let Some(node) = self.nodes.get(&id) {
            writeln!(f, "{:indent$}{} (#{})", "", node.name, node.id, indent = depth * 2)?;
            for child in node.children() {
                self.render_node(f, child, depth + 1)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for CategoryTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for root in self.roots() {
            self.render_node(f, root, 0)?;
        }
        Ok(())
    }
}

//! Eager-loading plans that avoid join fan-out
//!
//! Joining a one-to-many relation into a paginated root query repeats each
//! root once per child row. One such join is harmless because the storage
//! layer folds the rows back into their root. Two or more multiply against
//! each other, so every to-many relation after the first is loaded with a
//! separate keyed query instead.

use crate::model::{EntityRelation, FetchView};

/// Which relations to join into the root query and which to load afterwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan<R> {
    joined: Vec<R>,
    secondary: Vec<R>,
}

impl<R: EntityRelation> FetchPlan<R> {
    /// Load the root entities only
    #[must_use]
    pub fn root_only() -> Self {
        Self {
            joined: Vec::new(),
            secondary: Vec::new(),
        }
    }

    /// Build a plan without the fan-out rule
    ///
    /// Exists so the duplication it prevents can be demonstrated.
    #[cfg(test)]
    pub(crate) fn unchecked(joined: Vec<R>, secondary: Vec<R>) -> Self {
        Self { joined, secondary }
    }

    /// Relations fetched in the root query
    pub fn joined(&self) -> &[R] {
        &self.joined
    }

    /// To-many relations fetched by a secondary query keyed by root id
    pub fn secondary(&self) -> &[R] {
        &self.secondary
    }

    /// Whether `relation` is populated by this plan in any way
    pub fn includes(&self, relation: R) -> bool {
        self.joined.contains(&relation) || self.secondary.contains(&relation)
    }

    /// Whether nothing beyond the root is loaded
    pub fn is_root_only(&self) -> bool {
        self.joined.is_empty() && self.secondary.is_empty()
    }
}

impl<R: EntityRelation> Default for FetchPlan<R> {
    fn default() -> Self {
        Self::root_only()
    }
}

/// Turns a request shape into a [`FetchPlan`]
pub struct FetchPlanSelector;

impl FetchPlanSelector {
    /// Plan the relations named by `view`
    pub fn for_view<R, V>(view: &V) -> FetchPlan<R>
    where
        R: EntityRelation,
        V: FetchView<R>,
    {
        Self::select(&view.relations())
    }

    /// Plan an explicit list of relations
    ///
    /// Duplicates are ignored. To-one relations are always joined; the first
    /// to-many relation is joined and every later one goes to a secondary
    /// query.
    ///
    /// # Example
    ///
    /// ```rust
    /// use catalog_access::model::UserRelation;
    /// use catalog_access::query::FetchPlanSelector;
    ///
    /// let plan = FetchPlanSelector::select(&[
    ///     UserRelation::Addresses,
    ///     UserRelation::Profile,
    ///     UserRelation::Orders,
    /// ]);
    /// assert_eq!(plan.joined(), &[UserRelation::Addresses, UserRelation::Profile]);
    /// assert_eq!(plan.secondary(), &[UserRelation::Orders]);
    /// ```
    pub fn select<R: EntityRelation>(requested: &[R]) -> FetchPlan<R> {
        let mut plan = FetchPlan::root_only();
        let mut collection_joined = false;

        for &relation in requested {
            if plan.includes(relation) {
                continue;
            }
            if !relation.is_to_many() {
                plan.joined.push(relation);
            } else if !collection_joined {
                collection_joined = true;
                plan.joined.push(relation);
            } else {
                tracing::debug!(%relation, "to-many relation deferred to secondary query");
                plan.secondary.push(relation);
            }
        }

        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        CategoryRelation, CategoryView, ProductRelation, ProductView, UserRelation, UserView,
    };

    #[test]
    fn test_root_view_plans_nothing() {
        let plan: FetchPlan<UserRelation> = FetchPlanSelector::for_view(&UserView::Root);
        assert!(plan.is_root_only());
    }

    #[test]
    fn test_to_one_relations_are_always_joined() {
        let plan = FetchPlanSelector::select(&[ProductRelation::Brand, ProductRelation::Category]);
        assert_eq!(plan.joined(), &[ProductRelation::Brand, ProductRelation::Category]);
        assert!(plan.secondary().is_empty());
    }

    #[test]
    fn test_single_collection_is_joined() {
        let plan: FetchPlan<ProductRelation> = FetchPlanSelector::for_view(&ProductView::Full);
        assert_eq!(
            plan.joined(),
            &[ProductRelation::Brand, ProductRelation::Category, ProductRelation::Images]
        );
        assert!(plan.secondary().is_empty());
    }

    #[test]
    fn test_second_collection_goes_to_secondary_query() {
        let plan: FetchPlan<UserRelation> = FetchPlanSelector::for_view(&UserView::Full);
        assert_eq!(plan.joined(), &[UserRelation::Profile, UserRelation::Addresses]);
        assert_eq!(plan.secondary(), &[UserRelation::Orders]);
        assert!(plan.includes(UserRelation::Orders));
    }

    #[test]
    fn test_at_most_one_collection_joined() {
        let plan = FetchPlanSelector::select(&[
            UserRelation::Orders,
            UserRelation::Addresses,
            UserRelation::Orders,
            UserRelation::Profile,
        ]);
        let joined_collections = plan.joined().iter().filter(|r| r.is_to_many()).count();
        assert_eq!(joined_collections, 1);
        assert_eq!(plan.joined(), &[UserRelation::Orders, UserRelation::Profile]);
        assert_eq!(plan.secondary(), &[UserRelation::Addresses]);
    }

    #[test]
    fn test_category_full_view() {
        let plan: FetchPlan<CategoryRelation> = FetchPlanSelector::for_view(&CategoryView::Full);
        assert_eq!(plan.joined(), &[CategoryRelation::Parent, CategoryRelation::Children]);
    }
}

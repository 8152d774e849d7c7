//! Relation declarations collected from [`Model::relations`](crate::Model::relations).

use crate::model::ModelHandle;
use crate::relation::def::{Relation, RelationTarget, RelationType};
use std::sync::Arc;

/// Named relations of one model, in declaration order.
///
/// ```ignore
/// fn relations(&self, relations: &mut RelationSet) {
///     relations
///         .belongs_to("company", "Company", None)
///         .has_one("badge", "Badge", Some("holder_id"));
/// }
/// ```
pub struct RelationSet {
    origin: ModelHandle,
    relations: Vec<Arc<Relation>>,
}

impl RelationSet {
    pub(crate) fn new(origin: &ModelHandle) -> Self {
        Self {
            origin: origin.clone(),
            relations: Vec::new(),
        }
    }

    /// Declare a relation of any type under `name`.
    ///
    /// Redeclaring a name replaces the earlier declaration in place.
    pub fn add(
        &mut self,
        name: &str,
        target: impl Into<RelationTarget>,
        rel_type: RelationType,
        foreign_key: Option<&str>,
    ) -> &mut Self {
        let relation = Arc::new(Relation::new(&self.origin, target, rel_type, foreign_key).with_name(name));
        match self.relations.iter_mut().find(|r| r.name() == Some(name)) {
            Some(existing) => {
                log::warn!("{}: relation {name} declared twice", self.origin.name());
                *existing = relation;
            }
            None => self.relations.push(relation),
        }
        self
    }

    pub fn has_one(
        &mut self,
        name: &str,
        target: impl Into<RelationTarget>,
        foreign_key: Option<&str>,
    ) -> &mut Self {
        self.add(name, target, RelationType::OneToOne, foreign_key)
    }

    pub fn has_many(
        &mut self,
        name: &str,
        target: impl Into<RelationTarget>,
        foreign_key: Option<&str>,
    ) -> &mut Self {
        self.add(name, target, RelationType::OneToMany, foreign_key)
    }

    /// `foreign_key` is a column of this model.
    ///
    /// When several instances loaded together share the same foreign key
    /// value, the related row is attached to the first of them only; the
    /// others get no entry under `name`.
    pub fn belongs_to(
        &mut self,
        name: &str,
        target: impl Into<RelationTarget>,
        foreign_key: Option<&str>,
    ) -> &mut Self {
        self.add(name, target, RelationType::ManyToOne, foreign_key)
    }

    pub fn many_to_many(
        &mut self,
        name: &str,
        target: impl Into<RelationTarget>,
        foreign_key: Option<&str>,
    ) -> &mut Self {
        self.add(name, target, RelationType::ManyToMany, foreign_key)
    }

    /// The model the relations are declared on.
    pub fn origin(&self) -> &ModelHandle {
        &self.origin
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    pub(crate) fn into_relations(self) -> Vec<Arc<Relation>> {
        self.relations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;
    use crate::test_helpers::MockExecutor;
    use crate::Database;

    struct Category;

    impl Model for Category {
        fn name(&self) -> &str {
            "Category"
        }

        fn relations(&self, relations: &mut RelationSet) {
            relations
                .belongs_to("parent", "Category", Some("parent_id"))
                .has_many("children", "Category", Some("parent_id"))
                .has_one("banner", "Banner", None);
        }
    }

    #[test]
    fn test_declaration_order_and_types() {
        let db = Database::new(Arc::new(MockExecutor::new()));
        let categories = db.register(Category).unwrap();
        let names: Vec<_> = categories.relations().iter().filter_map(|r| r.name()).collect();
        assert_eq!(names, vec!["parent", "children", "banner"]);
        assert_eq!(
            categories.relation("parent").unwrap().rel_type(),
            RelationType::ManyToOne
        );
    }

    #[test]
    fn test_self_referencing_relation() {
        let db = Database::new(Arc::new(MockExecutor::new()));
        let categories = db.register(Category).unwrap();
        let parent = categories.relation("parent").unwrap();
        assert!(parent.target().unwrap().is_same(&categories));
        assert_eq!(parent.origin_attribute().unwrap(), "id");
        assert_eq!(parent.target_attribute().unwrap(), "parent_id");

        let children = categories.relation("children").unwrap();
        assert_eq!(children.origin_attribute().unwrap(), "parent_id");
        assert_eq!(children.target_attribute().unwrap(), "id");
    }

    #[test]
    fn test_redeclared_name_replaces() {
        let db = Database::new(Arc::new(MockExecutor::new()));
        let categories = db.register(Category).unwrap();
        let mut set = RelationSet::new(&categories);
        set.has_one("x", "Category", None).has_many("x", "Category", None);
        assert_eq!(set.len(), 1);
        let relations = set.into_relations();
        assert_eq!(relations[0].rel_type(), RelationType::OneToMany);
    }
}

//! Relation definitions.
//!
//! A [`Relation`] joins one origin model to one target model. It derives the
//! foreign key and the attributes used to match rows on each side, and builds
//! the sub-query that fetches the related rows of a batch of origin instances.

pub mod types;

#[doc(inline)]
pub use types::RelationType;

use crate::database::{Database, DatabaseInner};
use crate::error::TideError;
use crate::instance::Instance;
use crate::model::{ModelEntry, ModelHandle};
use crate::query::{QueryBuilder, QueryOperations};
use crate::utils;
use crate::value::{is_null, values_match};
use once_cell::sync::OnceCell;
use sea_query::Value;
use std::fmt;
use std::sync::{Arc, Weak};

/// Target of a relation: a registered model, or a model name resolved on first use.
pub enum RelationTarget {
    Resolved(Weak<ModelEntry>),
    Pending {
        name: String,
        resolved: OnceCell<Weak<ModelEntry>>,
    },
}

impl RelationTarget {
    pub fn pending(name: impl Into<String>) -> Self {
        Self::Pending {
            name: name.into(),
            resolved: OnceCell::new(),
        }
    }
}

impl From<&str> for RelationTarget {
    fn from(name: &str) -> Self {
        Self::pending(name)
    }
}

impl From<String> for RelationTarget {
    fn from(name: String) -> Self {
        Self::pending(name)
    }
}

impl From<&ModelHandle> for RelationTarget {
    fn from(handle: &ModelHandle) -> Self {
        Self::Resolved(Arc::downgrade(handle.entry()))
    }
}

impl fmt::Debug for RelationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved(weak) => match weak.upgrade() {
                Some(entry) => f.debug_tuple("Resolved").field(&entry.name()).finish(),
                None => f.write_str("Resolved(<dropped>)"),
            },
            Self::Pending { name, resolved } => f
                .debug_struct("Pending")
                .field("name", name)
                .field("resolved", &resolved.get().is_some())
                .finish(),
        }
    }
}

/// A relation between an origin model and a target model.
///
/// Models and relations reference each other, so a relation only keeps weak
/// references to both models and to the database; they are upgraded on use.
pub struct Relation {
    origin: Weak<ModelEntry>,
    target: RelationTarget,
    rel_type: RelationType,
    explicit_foreign_key: Option<String>,
    foreign_key: OnceCell<String>,
    name: OnceCell<String>,
    db: Weak<DatabaseInner>,
}

impl Relation {
    /// Create a relation. Every [`RelationType`] is accepted here; a string
    /// target is looked up in the registry the first time it is needed.
    pub fn new(
        origin: &ModelHandle,
        target: impl Into<RelationTarget>,
        rel_type: RelationType,
        foreign_key: Option<&str>,
    ) -> Self {
        Self {
            origin: Arc::downgrade(origin.entry()),
            target: target.into(),
            rel_type,
            explicit_foreign_key: foreign_key.map(str::to_string),
            foreign_key: OnceCell::new(),
            name: OnceCell::new(),
            db: origin.database().downgrade(),
        }
    }

    /// Builder-style name assignment.
    pub fn with_name(self, name: &str) -> Self {
        self.assign_name(name);
        self
    }

    /// Give the relation the name its paired rows are stored under.
    ///
    /// The first name sticks; later calls are ignored.
    pub fn assign_name(&self, name: &str) {
        if let Err(ignored) = self.name.set(name.to_string()) {
            if self.name.get().map(String::as_str) != Some(ignored.as_str()) {
                log::debug!("relation already named {:?}, ignoring {ignored:?}", self.name.get());
            }
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.get().map(String::as_str)
    }

    pub fn rel_type(&self) -> RelationType {
        self.rel_type
    }

    pub fn is_type_from_one(&self) -> bool {
        self.rel_type.is_type_from_one()
    }

    fn database(&self) -> Result<Database, TideError> {
        Database::upgrade(&self.db)
    }

    pub fn origin(&self) -> Result<ModelHandle, TideError> {
        let entry = self
            .origin
            .upgrade()
            .ok_or_else(|| TideError::Other("relation origin model was dropped".to_string()))?;
        Ok(ModelHandle::new(entry, self.database()?))
    }

    /// The target model, resolving a pending name against the registry once.
    pub fn target(&self) -> Result<ModelHandle, TideError> {
        let db = self.database()?;
        let entry = match &self.target {
            RelationTarget::Resolved(weak) => weak.upgrade().ok_or_else(|| {
                TideError::Other("relation target model was dropped".to_string())
            })?,
            RelationTarget::Pending { name, resolved } => {
                match resolved.get().and_then(Weak::upgrade) {
                    Some(entry) => entry,
                    None => {
                        let entry = db.registry().lookup(name)?;
                        let _ = resolved.set(Arc::downgrade(&entry));
                        entry
                    }
                }
            }
        };
        Ok(ModelHandle::new(entry, db))
    }

    /// Foreign key column, computed once.
    ///
    /// Unless given explicitly: `<target>_id` for many-to-one, `<origin>_id` otherwise.
    pub fn foreign_key(&self) -> Result<&str, TideError> {
        self.foreign_key
            .get_or_try_init(|| {
                if let Some(key) = &self.explicit_foreign_key {
                    return Ok(key.clone());
                }
                let owner = match self.rel_type {
                    RelationType::ManyToOne => self.target()?,
                    _ => self.origin()?,
                };
                Ok(utils::foreign_key(owner.model().name()))
            })
            .map(String::as_str)
    }

    /// Column of the related rows compared against the origin instances.
    pub fn origin_attribute(&self) -> Result<String, TideError> {
        match self.rel_type {
            RelationType::ManyToOne => single_key(&self.target()?),
            _ => Ok(self.foreign_key()?.to_string()),
        }
    }

    /// Column of the origin instances whose values select the related rows.
    pub fn target_attribute(&self) -> Result<String, TideError> {
        match self.rel_type {
            RelationType::ManyToOne => Ok(self.foreign_key()?.to_string()),
            _ => single_key(&self.origin()?),
        }
    }

    /// Distinct non-null values of `target_attribute` over the origin instances.
    pub(crate) fn collect_keys<'a>(
        &self,
        origins: impl IntoIterator<Item = &'a Instance>,
    ) -> Result<Vec<Value>, TideError> {
        let attribute = self.target_attribute()?;
        let mut keys: Vec<Value> = Vec::new();
        for instance in origins {
            if let Some(value) = instance.get(&attribute) {
                if !is_null(value) && !keys.iter().any(|k| values_match(k, value)) {
                    keys.push(value.clone());
                }
            }
        }
        Ok(keys)
    }

    /// Query fetching the related rows of `origins`.
    ///
    /// Without origin instances, the filter holds a placeholder value instead
    /// so the query can still be printed:
    /// `SELECT * FROM "addresses" WHERE "user_id" IN ('originInstance.id')`.
    pub fn create_query(&self, origins: &[Instance]) -> Result<QueryBuilder, TideError> {
        let keys = if origins.is_empty() {
            let prefix = self.database()?.config().relation_placeholder.clone();
            vec![Value::from(format!("{prefix}.{}", self.target_attribute()?))]
        } else {
            self.collect_keys(origins)?
        };
        self.query_for_keys(keys)
    }

    pub(crate) fn query_for_keys(&self, keys: Vec<Value>) -> Result<QueryBuilder, TideError> {
        if self.rel_type == RelationType::ManyToMany {
            return Err(TideError::QueryError(format!(
                "many-to-many relation {} cannot be queried without a pivot table",
                self.label()
            )));
        }
        let origin_attribute = self.origin_attribute()?;
        Ok(self.target()?.query().where_in(&origin_attribute, keys))
    }

    /// Name for log and error messages.
    pub(crate) fn label(&self) -> String {
        match self.name() {
            Some(name) => format!("'{name}'"),
            None => match self.origin() {
                Ok(origin) => format!("<unnamed relation of {}>", origin.name()),
                Err(_) => "<unnamed relation>".to_string(),
            },
        }
    }
}

fn single_key(model: &ModelHandle) -> Result<String, TideError> {
    model.primary_key().unary().map(str::to_string).ok_or_else(|| {
        TideError::QueryError(format!(
            "relations require a single-column primary key, but {} has {:?}",
            model.name(),
            model.primary_key()
        ))
    })
}

impl fmt::Debug for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation")
            .field("name", &self.name.get())
            .field("origin", &self.origin.upgrade().map(|e| e.name().to_string()))
            .field("target", &self.target)
            .field("rel_type", &self.rel_type)
            .field("foreign_key", &self.foreign_key.get().or(self.explicit_foreign_key.as_ref()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;
    use crate::relation::Identity;
    use crate::test_helpers::MockExecutor;
    use pretty_assertions::assert_eq;

    struct User;

    impl Model for User {
        fn name(&self) -> &str {
            "User"
        }
    }

    struct Address;

    impl Model for Address {
        fn name(&self) -> &str {
            "Address"
        }
    }

    struct Tenant;

    impl Model for Tenant {
        fn name(&self) -> &str {
            "Tenant"
        }

        fn primary_key(&self) -> Identity {
            Identity::from(vec!["region", "id"])
        }
    }

    fn setup() -> (Database, ModelHandle) {
        let db = Database::new(Arc::new(MockExecutor::new()));
        let users = db.register(User).unwrap();
        db.register(Address).unwrap();
        (db, users)
    }

    #[test]
    fn test_relation_origin_and_target() {
        let (_db, users) = setup();
        let r = users.has_many("Address", None);
        assert_eq!(r.origin().unwrap().name(), "User");
        assert_eq!(r.target().unwrap().name(), "Address");
        assert_eq!(r.rel_type(), RelationType::OneToMany);
    }

    #[test]
    fn test_relation_target_from_handle() {
        let (db, users) = setup();
        let addresses = db.model("Address").unwrap();
        let r = users.has_many(&addresses, None);
        assert!(r.target().unwrap().is_same(&addresses));
    }

    #[test]
    fn test_custom_foreign_key() {
        let (_db, users) = setup();
        for rel_type in [
            RelationType::OneToMany,
            RelationType::OneToOne,
            RelationType::ManyToOne,
            RelationType::ManyToMany,
        ] {
            let r = Relation::new(&users, "Address", rel_type, Some("my_id"));
            assert_eq!(r.foreign_key().unwrap(), "my_id");
        }
    }

    #[test]
    fn test_default_foreign_key() {
        let (_db, users) = setup();
        let cases = [
            (RelationType::OneToMany, "user_id"),
            (RelationType::OneToOne, "user_id"),
            (RelationType::ManyToOne, "address_id"),
            (RelationType::ManyToMany, "user_id"),
        ];
        for (rel_type, expected) in cases {
            let r = Relation::new(&users, "Address", rel_type, None);
            assert_eq!(r.foreign_key().unwrap(), expected, "{rel_type}");
        }
    }

    #[test]
    fn test_attributes_from_one() {
        let (_db, users) = setup();
        for rel_type in [RelationType::OneToMany, RelationType::OneToOne] {
            let r = Relation::new(&users, "Address", rel_type, None);
            assert_eq!(r.origin_attribute().unwrap(), "user_id");
            assert_eq!(r.target_attribute().unwrap(), "id");
        }
    }

    #[test]
    fn test_attributes_many_to_one() {
        let (_db, users) = setup();
        let r = users.belongs_to("Address", None);
        assert_eq!(r.origin_attribute().unwrap(), "id");
        assert_eq!(r.target_attribute().unwrap(), "address_id");
    }

    #[test]
    fn test_unregistered_target_fails_on_use() {
        let (_db, users) = setup();
        // construction never fails
        let r = users.has_many("Ghost", None);
        let err = r.target().unwrap_err();
        assert!(matches!(err, TideError::UnregisteredModel(ref name) if name == "Ghost"));
        // EDGE CASE: a one-to-many key only needs the origin
        assert_eq!(r.foreign_key().unwrap(), "user_id");
        assert!(r.origin_attribute().is_ok());
        assert!(r.create_query(&[]).is_err());
    }

    #[test]
    fn test_target_registered_after_declaration() {
        let db = Database::new(Arc::new(MockExecutor::new()));
        let users = db.register(User).unwrap();
        let r = users.has_many("Address", None);
        assert!(r.target().is_err());
        db.register(Address).unwrap();
        assert_eq!(r.target().unwrap().name(), "Address");
    }

    #[test]
    fn test_create_query_placeholder() {
        let (_db, users) = setup();
        let r = users.has_many("Address", None).with_name("employee");
        assert_eq!(
            r.create_query(&[]).unwrap().to_sql().unwrap(),
            r#"SELECT * FROM "addresses" WHERE "user_id" IN ('originInstance.id')"#
        );
    }

    #[test]
    fn test_create_query_placeholder_prefix_from_config() {
        let config = crate::TideConfig {
            relation_placeholder: "origin".to_string(),
            ..crate::TideConfig::default()
        };
        let db = Database::builder(Arc::new(MockExecutor::new()))
            .config(config)
            .build();
        let users = db.register(User).unwrap();
        db.register(Address).unwrap();
        let r = users.belongs_to("Address", None);
        assert_eq!(
            r.create_query(&[]).unwrap().to_sql().unwrap(),
            r#"SELECT * FROM "addresses" WHERE "id" IN ('origin.address_id')"#
        );
    }

    #[test]
    fn test_create_query_distinct_keys() {
        let (_db, users) = setup();
        let r = users.has_many("Address", None);
        let origins = vec![
            users.from_row(crate::row! { "id" => 1 }),
            users.from_row(crate::row! { "id" => 2 }),
            users.from_row(crate::row! { "id" => 1 }),
            users.from_row(crate::row! { "id" => Value::Int(None) }),
        ];
        assert_eq!(
            r.create_query(&origins).unwrap().to_sql().unwrap(),
            r#"SELECT * FROM "addresses" WHERE "user_id" IN (1, 2)"#
        );
    }

    #[test]
    fn test_many_to_many_query_is_unsupported() {
        let (_db, users) = setup();
        let r = users.many_to_many("Address", None);
        assert!(!r.is_type_from_one());
        assert!(matches!(r.create_query(&[]), Err(TideError::QueryError(_))));
    }

    #[test]
    fn test_composite_primary_key_rejected() {
        let db = Database::new(Arc::new(MockExecutor::new()));
        let tenants = db.register(Tenant).unwrap();
        db.register(Address).unwrap();
        let r = tenants.has_many("Address", None);
        assert_eq!(r.foreign_key().unwrap(), "tenant_id");
        assert!(matches!(r.target_attribute(), Err(TideError::QueryError(_))));
    }

    #[test]
    fn test_name_assigned_once() {
        let (_db, users) = setup();
        let r = users.has_many("Address", None);
        assert_eq!(r.name(), None);
        r.assign_name("addresses");
        r.assign_name("other");
        assert_eq!(r.name(), Some("addresses"));
    }

    #[test]
    fn test_foreign_key_is_stable() {
        let (_db, users) = setup();
        let r = users.belongs_to("Address", None);
        let first = r.foreign_key().unwrap().to_string();
        assert_eq!(r.foreign_key().unwrap(), first);
    }
}

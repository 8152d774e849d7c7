//! Models: table metadata, relation declarations and persistence hooks.
//!
//! Application code describes a table by implementing [`Model`] and
//! registering it with a [`Database`]. Registration returns a
//! [`ModelHandle`], the entry point for queries and instances.
//!
//! # Example
//!
//! ```ignore
//! use tidepool::{Model, RelationSet};
//!
//! struct Company;
//!
//! impl Model for Company {
//!     fn name(&self) -> &str {
//!         "Company"
//!     }
//!
//!     fn relations(&self, relations: &mut RelationSet) {
//!         relations.has_many("employees", "Employee", None);
//!     }
//! }
//!
//! let companies = db.register(Company)?;
//! let rows = companies.query().with_related(&["employees"])?.all()?;
//! ```

use crate::database::Database;
use crate::error::TideError;
use crate::instance::Instance;
use crate::query::QueryBuilder;
use crate::relation::{Identity, Relation, RelationSet, RelationTarget, RelationType};
use crate::utils::tableize;
use crate::value::Row;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;

/// Metadata and hooks of one database table.
///
/// Only [`name`](Model::name) is required; everything else has a default
/// derived from it.
pub trait Model: Send + Sync + 'static {
    /// Name of the model, e.g. `"Company"`. Used as the default registry name.
    fn name(&self) -> &str;

    /// Table backing the model. Defaults to the underscored, pluralized name.
    fn table_name(&self) -> String {
        tableize(self.name())
    }

    /// Primary key column(s). Defaults to `id`.
    fn primary_key(&self) -> Identity {
        Identity::from("id")
    }

    /// Declare the relations of this model.
    ///
    /// Called once, the first time the relations of a registered model are
    /// needed, so targets may name models registered later.
    fn relations(&self, _relations: &mut RelationSet) {}

    /// When non-empty, only these props are written on save.
    fn whitelisted_props(&self) -> &[&str] {
        &[]
    }

    /// Props never written on save. Takes precedence over the whitelist.
    fn blacklisted_props(&self) -> &[&str] {
        &[]
    }

    /// Check an instance before it is saved or deleted.
    fn validate(&self, _instance: &Instance) -> Result<(), TideError> {
        Ok(())
    }
}

/// A registered model, as stored in the [`Registry`](crate::Registry).
pub struct ModelEntry {
    name: String,
    model: Arc<dyn Model>,
    table_name: String,
    primary_key: Identity,
    relations: OnceCell<Vec<Arc<Relation>>>,
}

impl ModelEntry {
    pub(crate) fn new(name: String, model: Arc<dyn Model>) -> Self {
        let table_name = model.table_name();
        let primary_key = model.primary_key();
        Self {
            name,
            model,
            table_name,
            primary_key,
            relations: OnceCell::new(),
        }
    }

    /// Registry name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &dyn Model {
        self.model.as_ref()
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn primary_key(&self) -> &Identity {
        &self.primary_key
    }
}

impl fmt::Debug for ModelEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelEntry")
            .field("name", &self.name)
            .field("table_name", &self.table_name)
            .field("primary_key", &self.primary_key)
            .finish()
    }
}

/// A registered model bound to its [`Database`].
#[derive(Clone)]
pub struct ModelHandle {
    entry: Arc<ModelEntry>,
    db: Database,
}

impl ModelHandle {
    pub(crate) fn new(entry: Arc<ModelEntry>, db: Database) -> Self {
        Self { entry, db }
    }

    pub(crate) fn entry(&self) -> &Arc<ModelEntry> {
        &self.entry
    }

    /// Registry name of the model
    pub fn name(&self) -> &str {
        self.entry.name()
    }

    pub fn table_name(&self) -> &str {
        self.entry.table_name()
    }

    pub fn primary_key(&self) -> &Identity {
        self.entry.primary_key()
    }

    pub fn model(&self) -> &dyn Model {
        self.entry.model()
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Both handles refer to the same registered model.
    pub fn is_same(&self, other: &ModelHandle) -> bool {
        Arc::ptr_eq(&self.entry, &other.entry)
    }

    /// Start a query against the model's table.
    pub fn query(&self) -> QueryBuilder {
        QueryBuilder::new(self.clone())
    }

    /// A new, not yet persisted instance.
    pub fn instance(&self, props: Row) -> Instance {
        Instance::new(self.clone(), props)
    }

    /// An instance for a row that already exists in the database.
    pub fn from_row(&self, row: Row) -> Instance {
        Instance::persisted(self.clone(), row)
    }

    /// Relations declared by the model, in declaration order.
    pub fn relations(&self) -> &[Arc<Relation>] {
        self.entry.relations.get_or_init(|| {
            let mut set = RelationSet::new(self);
            self.entry.model.relations(&mut set);
            log::debug!("{}: {} relation(s) declared", self.name(), set.len());
            set.into_relations()
        })
    }

    /// Look up a declared relation by name.
    pub fn relation(&self, name: &str) -> Result<Arc<Relation>, TideError> {
        self.relations()
            .iter()
            .find(|rel| rel.name() == Some(name))
            .cloned()
            .ok_or_else(|| TideError::UnknownRelation {
                model: self.name().to_string(),
                relation: name.to_string(),
            })
    }

    /// An unnamed one-to-one relation from this model.
    pub fn has_one(&self, target: impl Into<RelationTarget>, foreign_key: Option<&str>) -> Relation {
        Relation::new(self, target, RelationType::OneToOne, foreign_key)
    }

    /// An unnamed one-to-many relation from this model.
    pub fn has_many(&self, target: impl Into<RelationTarget>, foreign_key: Option<&str>) -> Relation {
        Relation::new(self, target, RelationType::OneToMany, foreign_key)
    }

    /// An unnamed many-to-one relation; `foreign_key` lives on this model.
    pub fn belongs_to(
        &self,
        target: impl Into<RelationTarget>,
        foreign_key: Option<&str>,
    ) -> Relation {
        Relation::new(self, target, RelationType::ManyToOne, foreign_key)
    }

    pub fn many_to_many(
        &self,
        target: impl Into<RelationTarget>,
        foreign_key: Option<&str>,
    ) -> Relation {
        Relation::new(self, target, RelationType::ManyToMany, foreign_key)
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModelHandle").field(&self.name()).finish()
    }
}

impl PartialEq for ModelHandle {
    fn eq(&self, other: &Self) -> bool {
        self.is_same(other)
    }
}

//! # Tidepool
//!
//! Relation-aware ORM layer over `sea-query` for PostgreSQL on the `may`
//! coroutine runtime.
//!
//! Models are registered on a [`Database`]. Queries against a model can load
//! declared relations in batches: one extra query per relation for the whole
//! result set, run concurrently on coroutines, then paired back onto the rows.
//!
//! ```ignore
//! use tidepool::{Database, Model, QueryOperations, RelationSet};
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
//! let db = Database::from_env()?;
//! let companies = db.register(Company)?;
//! let rows = companies
//!     .query()
//!     .where_eq("city", "Oslo")
//!     .with_related(&["employees"])?
//!     .all()?;
//! ```

pub mod config;
pub mod connection;
pub mod database;
pub mod error;
pub mod executor;
pub mod instance;
#[macro_use]
mod macros;
pub mod metrics;
pub mod model;
pub mod plugin;
pub mod query;
pub mod registry;
pub mod relation;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
pub mod utils;
pub mod value;

pub use sea_query;

pub use config::TideConfig;
pub use connection::connect;
pub use database::{Database, DatabaseBuilder};
pub use error::TideError;
pub use executor::{MayPostgresExecutor, TideExecutor};
pub use instance::{Instance, SaveOutcome};
pub use model::{Model, ModelEntry, ModelHandle};
pub use plugin::{CaseConverterPlugin, Plugin};
pub use query::{QueryBuilder, QueryOperations, QueryOutput, QueryState};
pub use registry::Registry;
pub use relation::{Identity, Related, Relation, RelationSet, RelationTarget, RelationType};
pub use value::Row;

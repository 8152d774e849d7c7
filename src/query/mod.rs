//! Query building and execution.
//!
//! A [`QueryBuilder`] wraps one deferred statement against the table of a
//! registered model, plus the relations to load with it.
//!
//! # Architecture
//!
//! - **Select**: [`QueryState`] and the [`QueryOperations`] shaping methods
//! - **Builder**: [`QueryBuilder`], write operations, `with_related`, SQL rendering
//! - **Execution**: `execute`, `all`, `one`
//! - **Output**: [`QueryOutput`]
//!
//! # Examples
//!
//! ```ignore
//! use tidepool::QueryOperations;
//!
//! let companies = db.model("Company")?;
//!
//! // All companies with their employees
//! let rows = companies.query().with_related(&["employees"])?.all()?;
//!
//! // One company by name
//! let acme = companies.query().where_eq("name", "Acme").one()?;
//! ```

// Query shaping
pub mod select;
#[doc(inline)]
pub use select::{QueryOperations, QueryState};

// Builder bound to a model
pub mod builder;
#[doc(inline)]
pub use builder::QueryBuilder;

// Execution methods
pub mod execution;

pub mod output;
#[doc(inline)]
pub use output::QueryOutput;

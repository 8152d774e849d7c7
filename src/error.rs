//! Error taxonomy for tidepool.
//!
//! Every failure raised by the relation engine, the query builder, the model
//! registry and the executor is a [`TideError`]. All of them are local and
//! synchronous; nothing is retried internally.

use may_postgres::Error as PostgresError;
use std::fmt;

/// tidepool error type
#[derive(Debug)]
pub enum TideError {
    /// `PostgreSQL` error from `may_postgres`
    PostgresError(PostgresError),
    /// Query construction or execution error
    QueryError(String),
    /// Row parsing/conversion error
    ParseError(String),
    /// Connection could not be established
    Connection(String),
    /// Configuration could not be loaded
    Config(String),
    /// A model was registered twice under the same name
    AlreadyRegistered(String),
    /// A relation target names a model that is not in the registry
    UnregisteredModel(String),
    /// `with_related` asked for a relation the model does not declare
    UnknownRelation {
        /// Model the relation was requested on
        model: String,
        /// Requested relation name
        relation: String,
    },
    /// A relation was paired before it was given a name
    UnnamedRelation,
    /// A one-to-one or many-to-one relation matched more than one row
    Relation {
        /// Name of the offending relation
        relation: String,
    },
    /// Attempt to store an instance without any property to write
    EmptyObject,
    /// Attempt to modify an instance that is not persisted or lacks key values
    InexistentObject,
    /// Model validation hook rejected the instance
    Validation(Vec<String>),
    /// Other execution errors
    Other(String),
}

impl fmt::Display for TideError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TideError::PostgresError(e) => write!(f, "PostgreSQL error: {e}"),
            TideError::QueryError(s) => write!(f, "Query error: {s}"),
            TideError::ParseError(s) => write!(f, "Parse error: {s}"),
            TideError::Connection(s) => write!(f, "Connection error: {s}"),
            TideError::Config(s) => write!(f, "Configuration error: {s}"),
            TideError::AlreadyRegistered(name) => write!(
                f,
                "Database object with name '{name}' cannot be registered multiple times"
            ),
            TideError::UnregisteredModel(name) => {
                write!(f, "Model '{name}' is not registered")
            }
            TideError::UnknownRelation { model, relation } => {
                write!(f, "Model '{model}' has no relation named '{relation}'")
            }
            TideError::UnnamedRelation => {
                write!(f, "Relation must be named before its results can be paired")
            }
            TideError::Relation { relation } => write!(
                f,
                "One-to-one and many-to-one Relations cannot be re-assigned (relation '{relation}')"
            ),
            TideError::EmptyObject => write!(f, "Empty database object cannot be stored"),
            TideError::InexistentObject => write!(f, "Database object does not exist"),
            TideError::Validation(errors) => write!(
                f,
                "Model could not be successfully validated: {}",
                errors.join("; ")
            ),
            TideError::Other(s) => write!(f, "Execution error: {s}"),
        }
    }
}

impl std::error::Error for TideError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TideError::PostgresError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PostgresError> for TideError {
    fn from(err: PostgresError) -> Self {
        TideError::PostgresError(err)
    }
}

impl From<config::ConfigError> for TideError {
    fn from(err: config::ConfigError) -> Self {
        TideError::Config(err.to_string())
    }
}

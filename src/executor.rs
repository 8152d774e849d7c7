//! Statement execution.
//!
//! [`TideExecutor`] is the seam between the query layer and the database.
//! Statements arrive as PostgreSQL SQL with `$n` placeholders plus their bound
//! [`Values`]; rows come back already decoded into [`Row`]s.

use crate::error::TideError;
use crate::value::{decode_row, with_converted_params, Row};
use may_postgres::Client;
use sea_query::Values;
use std::time::Instant;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// Trait for executing database statements
///
/// Implementations must be shareable across coroutines, relation sub-queries
/// of one `execute` may be issued from several of them at once.
pub trait TideExecutor: Send + Sync {
    /// Execute a statement and return the number of rows affected
    ///
    /// # Arguments
    ///
    /// * `sql` - SQL string with `$1`, `$2`, ... placeholders
    /// * `values` - Values bound to the placeholders, in order
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the statement fails.
    fn execute(&self, sql: &str, values: &Values) -> Result<u64, TideError>;

    /// Execute a query and return all rows
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the query fails or a column cannot be decoded.
    fn query_all(&self, sql: &str, values: &Values) -> Result<Vec<Row>, TideError>;

    /// Execute a query and return its first row, if any
    fn query_first(&self, sql: &str, values: &Values) -> Result<Option<Row>, TideError> {
        Ok(self.query_all(sql, values)?.into_iter().next())
    }
}

/// Implementation of `TideExecutor` for `may_postgres::Client`
pub struct MayPostgresExecutor {
    client: Client,
}

impl MayPostgresExecutor {
    /// Create a new executor from a `may_postgres::Client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Consume the executor and return the underlying client
    pub fn into_client(self) -> Client {
        self.client
    }

    /// Run `SELECT 1` to check the connection is still usable.
    pub fn check_health(&self) -> Result<bool, TideError> {
        match self.client.query("SELECT 1", &[]) {
            Ok(_) => Ok(true),
            Err(e) => {
                log::warn!("health check failed: {e}");
                Ok(false)
            }
        }
    }
}

impl TideExecutor for MayPostgresExecutor {
    fn execute(&self, sql: &str, values: &Values) -> Result<u64, TideError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::execute_query_span(sql).entered();

        let start = Instant::now();
        let result = with_converted_params(values, |params| {
            self.client.execute(sql, params).map_err(|e| {
                #[cfg(feature = "metrics")]
                METRICS.record_query_error();
                TideError::PostgresError(e)
            })
        });

        let duration = start.elapsed();
        #[cfg(feature = "metrics")]
        METRICS.record_query_duration(duration);
        log::trace!("executed in {duration:?}: {sql}");

        result
    }

    fn query_all(&self, sql: &str, values: &Values) -> Result<Vec<Row>, TideError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::execute_query_span(sql).entered();

        let start = Instant::now();
        let rows = with_converted_params(values, |params| {
            self.client.query(sql, params).map_err(|e| {
                #[cfg(feature = "metrics")]
                METRICS.record_query_error();
                TideError::PostgresError(e)
            })
        });

        let duration = start.elapsed();
        #[cfg(feature = "metrics")]
        METRICS.record_query_duration(duration);
        log::trace!("queried in {duration:?}: {sql}");

        rows?.iter().map(decode_row).collect()
    }
}

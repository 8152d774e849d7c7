//! Query execution.
//!
//! `execute` runs in three phases:
//!
//! 1. The main statement, after every plugin's `before_query` hook
//! 2. One sub-query per included relation over the whole main result,
//!    fanned out to coroutines when more than one relation is loaded
//! 3. Pairing of the related rows, then every plugin's `after_query` hook

use crate::error::TideError;
use crate::instance::Instance;
use crate::query::builder::{Operation, QueryBuilder};
use crate::query::output::QueryOutput;
use crate::query::select::QueryOperations;
use crate::relation::eager::load_relations;

impl QueryBuilder {
    /// Run the query, load the included relations and return the result.
    ///
    /// # Errors
    ///
    /// Any error of the main statement or of a relation sub-query. Relation
    /// pairing errors (`TideError::Relation`, `TideError::UnnamedRelation`)
    /// are returned as well; nothing is retried.
    pub fn execute(self) -> Result<QueryOutput, TideError> {
        let db = self.model().database().clone();

        let mut query = self;
        for plugin in db.plugins() {
            query = plugin.before_query(query);
        }

        let relations = query.take_relations();
        let mut output = query.run()?;

        if !relations.is_empty() {
            log::debug!(
                "loading {} relation(s) for {} row(s)",
                relations.len(),
                output.instances().len()
            );
            load_relations(
                &relations,
                &mut output.instances_mut(),
                db.config().concurrent_relations,
            )?;
        }

        for plugin in db.plugins() {
            output = plugin.after_query(output);
        }
        Ok(output)
    }

    /// Execute and return every instance.
    pub fn all(self) -> Result<Vec<Instance>, TideError> {
        Ok(self.execute()?.into_many())
    }

    /// Execute as a single-row query.
    pub fn one(self) -> Result<Option<Instance>, TideError> {
        Ok(self.first().execute()?.into_one())
    }

    /// Run the main statement only: no plugins, no relations.
    pub(crate) fn fetch_instances(self) -> Result<Vec<Instance>, TideError> {
        Ok(self.run()?.into_many())
    }

    fn run(self) -> Result<QueryOutput, TideError> {
        let (sql, values) = self.statement()?.build();
        log::debug!("{sql}");
        let executor = self.model().database().executor();

        let output = match self.operation() {
            Operation::Select => {
                let rows = executor.query_all(&sql, &values)?;
                let mut instances = rows.into_iter().map(|row| self.model().from_row(row));
                if self.state().is_single() {
                    QueryOutput::One(instances.next())
                } else {
                    QueryOutput::Many(instances.collect())
                }
            }
            Operation::Insert(_) => {
                let rows = executor.query_all(&sql, &values)?;
                QueryOutput::Many(rows.into_iter().map(|row| self.model().from_row(row)).collect())
            }
            Operation::Update(_) | Operation::Delete => {
                QueryOutput::Affected(executor.execute(&sql, &values)?)
            }
        };
        Ok(output)
    }
}

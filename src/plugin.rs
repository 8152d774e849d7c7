//! Query plugins.
//!
//! Plugins are registered on the [`DatabaseBuilder`](crate::DatabaseBuilder)
//! and wrap the main statement of every executed query. Relation sub-queries
//! are not passed through them; their rows reach plugins as part of the
//! paired main result.

use crate::query::{QueryBuilder, QueryOutput};
use crate::utils::KeyCase;

/// Hooks around query execution. Both default to passing their input through.
pub trait Plugin: Send + Sync {
    /// Called before the main statement is built.
    fn before_query(&self, query: QueryBuilder) -> QueryBuilder {
        query
    }

    /// Called after relations have been paired.
    fn after_query(&self, output: QueryOutput) -> QueryOutput {
        output
    }
}

/// Serializes returned instances with lowerCamelCase keys: `created_at`
/// becomes `createdAt`, in related instances too.
///
/// Props stay keyed by column name, so `get`, `set` and `save` keep working
/// with the database columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseConverterPlugin;

impl Plugin for CaseConverterPlugin {
    fn after_query(&self, mut output: QueryOutput) -> QueryOutput {
        for instance in output.instances_mut() {
            instance.set_key_case(KeyCase::Camel);
        }
        output
    }
}

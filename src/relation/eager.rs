//! Eager loading of related rows.
//!
//! Related rows of a whole batch of origin instances are fetched with one
//! `IN` query per relation, then paired back onto their origins:
//!
//! 1. Collect the distinct key values of the origin instances
//! 2. Fetch every related row in a single query
//! 3. Attach each row to the first origin whose key matches it
//!
//! Rows without a matching origin are dropped. When several relations are
//! loaded together their queries may run on separate coroutines; pairing
//! always happens afterwards, on the calling coroutine, one relation at a time.

use crate::error::TideError;
use crate::instance::Instance;
use crate::relation::def::Relation;
use crate::relation::related::Related;
use crate::value::values_match;
use sea_query::Value;
use std::sync::Arc;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

impl Relation {
    /// Fetch the related rows of `origins` and attach them.
    ///
    /// Accepts any iterator of mutable instances, so nested collections can
    /// be passed flattened: `relation.apply(groups.iter_mut().flatten())`.
    ///
    /// # Errors
    ///
    /// - `TideError::UnnamedRelation` if the relation has no name
    /// - `TideError::Relation` if a one-to-one or many-to-one relation matches
    ///   more than one row for the same origin
    pub fn apply<'a>(
        &self,
        origins: impl IntoIterator<Item = &'a mut Instance>,
    ) -> Result<(), TideError> {
        self.pairing_name()?;
        let mut origins: Vec<&mut Instance> = origins.into_iter().collect();
        let keys = self.collect_keys(origins.iter().map(|o| &**o))?;
        let related = self.fetch(keys)?;
        self.pair(&mut origins, related)
    }

    /// Run the related-rows query for a set of key values.
    pub(crate) fn fetch(&self, keys: Vec<Value>) -> Result<Vec<Instance>, TideError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::load_relation_span(&self.label(), keys.len()).entered();
        #[cfg(feature = "metrics")]
        METRICS.record_relation_load(self.name().unwrap_or("<unnamed>"));

        self.query_for_keys(keys)?.fetch_instances()
    }

    /// Attach `related` rows to `origins`.
    ///
    /// Each row goes to the first origin whose target attribute equals the
    /// row's origin attribute.
    pub fn pair(
        &self,
        origins: &mut [&mut Instance],
        related: Vec<Instance>,
    ) -> Result<(), TideError> {
        let name = self.pairing_name()?;
        let origin_attribute = self.origin_attribute()?;
        let target_attribute = self.target_attribute()?;
        let cardinality_one = self.rel_type().is_cardinality_one();
        let mut orphans: u64 = 0;

        for row in related {
            let Some(foreign) = row.get(&origin_attribute).cloned() else {
                log::debug!("{name}: related row has no {origin_attribute}, dropped");
                orphans += 1;
                continue;
            };
            let Some(owner) = origins.iter_mut().find(|origin| {
                origin
                    .get(&target_attribute)
                    .is_some_and(|value| values_match(value, &foreign))
            }) else {
                log::debug!("{name}: no origin with {target_attribute} = {foreign:?}, row dropped");
                orphans += 1;
                continue;
            };

            let attached = owner.related_map_mut();
            match attached.get_mut(name) {
                None => {
                    let value = if cardinality_one {
                        Related::One(Box::new(row))
                    } else {
                        Related::Many(vec![row])
                    };
                    attached.insert(name.to_string(), value);
                }
                Some(Related::Many(rows)) if !cardinality_one => rows.push(row),
                Some(_) => {
                    return Err(TideError::Relation {
                        relation: name.to_string(),
                    })
                }
            }
        }

        #[cfg(feature = "metrics")]
        METRICS.record_orphaned_rows(name, orphans);
        if orphans > 0 {
            log::debug!("{name}: {orphans} orphaned row(s) dropped");
        }
        Ok(())
    }

    fn pairing_name(&self) -> Result<&str, TideError> {
        self.name().ok_or(TideError::UnnamedRelation)
    }
}

/// Load several relations onto the same origin instances.
///
/// With `concurrent` set and more than one relation, each relation query runs
/// on its own coroutine; all of them are joined before any pairing starts.
pub(crate) fn load_relations(
    relations: &[Arc<Relation>],
    origins: &mut [&mut Instance],
    concurrent: bool,
) -> Result<(), TideError> {
    if relations.is_empty() || origins.is_empty() {
        return Ok(());
    }

    let mut keys = Vec::with_capacity(relations.len());
    for relation in relations {
        relation.pairing_name()?;
        keys.push(relation.collect_keys(origins.iter().map(|o| &**o))?);
    }

    let fetched = if concurrent && relations.len() > 1 {
        fetch_concurrently(relations, keys)?
    } else {
        relations
            .iter()
            .zip(keys)
            .map(|(relation, keys)| relation.fetch(keys))
            .collect::<Result<Vec<_>, _>>()?
    };

    for (relation, related) in relations.iter().zip(fetched) {
        relation.pair(origins, related)?;
    }
    Ok(())
}

fn fetch_concurrently(
    relations: &[Arc<Relation>],
    keys: Vec<Vec<Value>>,
) -> Result<Vec<Vec<Instance>>, TideError> {
    let handles: Vec<_> = relations
        .iter()
        .zip(keys)
        .map(|(relation, keys)| {
            let relation = Arc::clone(relation);
            may::go!(move || relation.fetch(keys))
        })
        .collect();

    // join every coroutine before surfacing the first error
    let joined: Vec<_> = handles.into_iter().map(|handle| handle.join()).collect();
    joined
        .into_iter()
        .map(|result| match result {
            Ok(fetched) => fetched,
            Err(panic) => Err(TideError::Other(format!(
                "relation query coroutine panicked: {panic:?}"
            ))),
        })
        .collect()
}

//! Results of an executed query.

use crate::instance::Instance;

/// What `QueryBuilder::execute` produced.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    /// Rows of a select, or rows returned by an insert
    Many(Vec<Instance>),
    /// Result of a `first()` query
    One(Option<Instance>),
    /// Rows affected by an update or delete
    Affected(u64),
}

impl QueryOutput {
    /// All instances; empty for `Affected`.
    pub fn into_many(self) -> Vec<Instance> {
        match self {
            Self::Many(instances) => instances,
            Self::One(instance) => instance.into_iter().collect(),
            Self::Affected(_) => Vec::new(),
        }
    }

    /// The first instance, if any.
    pub fn into_one(self) -> Option<Instance> {
        match self {
            Self::Many(instances) => instances.into_iter().next(),
            Self::One(instance) => instance,
            Self::Affected(_) => None,
        }
    }

    /// Affected rows for writes, number of instances otherwise.
    pub fn affected(&self) -> u64 {
        match self {
            Self::Affected(count) => *count,
            Self::Many(instances) => instances.len() as u64,
            Self::One(instance) => u64::from(instance.is_some()),
        }
    }

    pub fn instances(&self) -> &[Instance] {
        match self {
            Self::Many(instances) => instances,
            Self::One(Some(instance)) => std::slice::from_ref(instance),
            Self::One(None) | Self::Affected(_) => &[],
        }
    }

    pub fn instances_mut(&mut self) -> Vec<&mut Instance> {
        match self {
            Self::Many(instances) => instances.iter_mut().collect(),
            Self::One(Some(instance)) => vec![instance],
            Self::One(None) | Self::Affected(_) => Vec::new(),
        }
    }
}

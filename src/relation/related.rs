//! Related results attached to an instance.

use crate::instance::Instance;

/// Rows paired onto an origin instance under a relation name.
#[derive(Debug, Clone, PartialEq)]
pub enum Related {
    /// One-to-one and many-to-one relations
    One(Box<Instance>),
    /// One-to-many relations, in the order the rows were returned
    Many(Vec<Instance>),
}

impl Related {
    pub fn as_one(&self) -> Option<&Instance> {
        match self {
            Self::One(instance) => Some(instance),
            Self::Many(_) => None,
        }
    }

    /// All instances, whatever the cardinality.
    pub fn as_slice(&self) -> &[Instance] {
        match self {
            Self::One(instance) => std::slice::from_ref(instance.as_ref()),
            Self::Many(instances) => instances,
        }
    }

    pub(crate) fn instances_mut(&mut self) -> Vec<&mut Instance> {
        match self {
            Self::One(instance) => vec![instance.as_mut()],
            Self::Many(instances) => instances.iter_mut().collect(),
        }
    }
}

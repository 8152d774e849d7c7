//! Relation type definitions.
//!
//! This module provides the `RelationType` enum which represents the kind
//! of relationship between two models.

use std::fmt;

/// Type of relationship between models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationType {
    /// One origin row owns many target rows (`has_many`)
    OneToMany,
    /// One origin row owns at most one target row (`has_one`)
    OneToOne,
    /// The origin row points at one target row (`belongs_to`)
    ManyToOne,
    /// Rows on both sides are linked through a pivot table
    ManyToMany,
}

impl RelationType {
    /// At most one related row is valid per origin instance.
    pub fn is_cardinality_one(self) -> bool {
        matches!(self, Self::OneToOne | Self::ManyToOne)
    }

    /// The origin holds the referenced key and the target holds the foreign key.
    pub fn is_type_from_one(self) -> bool {
        matches!(self, Self::OneToOne | Self::OneToMany)
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::OneToMany => "ONE_TO_MANY",
            Self::OneToOne => "ONE_TO_ONE",
            Self::ManyToOne => "MANY_TO_ONE",
            Self::ManyToMany => "MANY_TO_MANY",
        };
        f.write_str(tag)
    }
}

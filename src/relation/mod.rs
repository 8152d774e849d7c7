//! Relations between models.
//!
//! - **Def**: the [`Relation`] itself, its [`RelationType`] and [`RelationTarget`]
//! - **Set**: [`RelationSet`], used by models to declare named relations
//! - **Eager**: batched fetching of related rows and pairing onto origins
//! - **Identity**: single and composite key columns
//! - **Related**: results attached to an instance

pub mod identity;
#[doc(inline)]
pub use identity::{BorrowedIdentityIter, Identity};

pub mod def;
#[doc(inline)]
pub use def::{Relation, RelationTarget, RelationType};

pub mod set;
#[doc(inline)]
pub use set::RelationSet;

pub mod related;
#[doc(inline)]
pub use related::Related;

pub(crate) mod eager;

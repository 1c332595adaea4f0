//! Entity snapshots and shared domain enumerations.

pub mod snapshot;
pub mod types;

pub use snapshot::{ItemSnapshot, TermAssignments, TermSnapshot};
pub use types::ItemStatus;

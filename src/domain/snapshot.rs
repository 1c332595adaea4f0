//! Immutable entity snapshots supplied by the content repository.
//!
//! A snapshot is the materialized state of an entity and its relationships
//! at one point in time. Snapshots are captured by the repository before and
//! after a mutation and never change once handed to the engine.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::EngineError;

use super::types::ItemStatus;

/// Taxonomy name → assigned term ids.
///
/// One entry per taxonomy attached to the item's content type; an empty set
/// means the taxonomy applies but no term was explicitly assigned.
pub type TermAssignments = BTreeMap<String, BTreeSet<Uuid>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSnapshot {
    pub id: Uuid,
    /// Content type name as registered (e.g. `post`, `page`).
    pub kind: String,
    pub status: ItemStatus,
    pub author: Option<Uuid>,
    /// `None` when relationship data was not materialized for this snapshot.
    pub terms: Option<TermAssignments>,
    pub published_at: Option<OffsetDateTime>,
}

impl ItemSnapshot {
    pub fn is_published(&self) -> bool {
        self.status.is_published()
    }

    /// Term assignments, or [`EngineError::IncompleteEntityState`] when the
    /// repository did not materialize them.
    pub fn assignments(&self) -> Result<&TermAssignments, EngineError> {
        self.terms
            .as_ref()
            .ok_or_else(|| EngineError::incomplete(self.id, "term assignments"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermSnapshot {
    pub id: Uuid,
    pub taxonomy: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(terms: Option<TermAssignments>) -> ItemSnapshot {
        ItemSnapshot {
            id: Uuid::nil(),
            kind: "post".to_string(),
            status: ItemStatus::Published,
            author: None,
            terms,
            published_at: None,
        }
    }

    #[test]
    fn assignments_present() {
        let mut terms = TermAssignments::new();
        terms.insert("category".to_string(), BTreeSet::new());
        let item = snapshot(Some(terms));
        assert!(item.assignments().is_ok());
    }

    #[test]
    fn missing_assignments_is_incomplete_state() {
        let item = snapshot(None);
        let err = item.assignments().unwrap_err();
        assert!(matches!(
            err,
            EngineError::IncompleteEntityState { entity, .. } if entity == Uuid::nil()
        ));
    }
}

//! Shared domain enumerations aligned with the content repository.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Draft,
    Published,
    Archived,
}

impl ItemStatus {
    /// Only published items appear in public listings (homepage, archives).
    pub fn is_published(self) -> bool {
        matches!(self, ItemStatus::Published)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Draft => "draft",
            ItemStatus::Published => "published",
            ItemStatus::Archived => "archived",
        }
    }
}

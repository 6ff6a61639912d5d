//! Soft-delete lifecycle state shared by every persisted record.

use serde::{Deserialize, Serialize};

/// Lifecycle tag persisted in the `eliminado` column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    /// Visible to every read, update and delete path.
    #[default]
    Active,
    /// Logically removed; still physically present.
    Deleted,
}

impl RecordState {
    /// Storage flag value for this state.
    pub fn as_flag(self) -> i64 {
        match self {
            Self::Active => 0,
            Self::Deleted => 1,
        }
    }

    /// Maps a storage flag back to a state. Unknown values yield `None`.
    pub fn from_flag(flag: i64) -> Option<Self> {
        match flag {
            0 => Some(Self::Active),
            1 => Some(Self::Deleted),
            _ => None,
        }
    }

    pub fn is_active(self) -> bool {
        self == Self::Active
    }

    /// SQL predicate matching rows in this state for the given flag column.
    ///
    /// Every store query filters through this predicate so that soft-deleted
    /// rows stay invisible uniformly.
    pub fn predicate(self, column: &str) -> String {
        format!("{column} = {}", self.as_flag())
    }
}

//! Storage status classification.
//!
//! The host classifies every storage write from three values of one slot:
//!
//! - `o`: original value, before the transaction started
//! - `c`: current value, before this write
//! - `v`: the value being written
//!
//! `0` is the zero value; `X`, `Y`, `Z` are distinct non-zero values.
//! The classification is a pure function of `(o, c, v)`.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Bytes32;

/// The effect of a storage write on the slot's transaction-scoped history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum StorageStatus {
    /// Unchanged (`c == v`) or an already dirty slot modified again.
    /// Catch-all for every pattern not listed below.
    Assigned = 0,
    /// `0 -> 0 -> Z`
    Added = 1,
    /// `X -> X -> 0`
    Deleted = 2,
    /// `X -> X -> Z`
    Modified = 3,
    /// `X -> 0 -> Z`
    DeletedAdded = 4,
    /// `X -> Y -> 0`
    ModifiedDeleted = 5,
    /// `X -> 0 -> X`
    DeletedRestored = 6,
    /// `0 -> Y -> 0`
    AddedDeleted = 7,
    /// `X -> Y -> X`
    ModifiedRestored = 8,
}

impl StorageStatus {
    /// Classify a write of `new` into a slot holding `current`, whose value
    /// at the start of the transaction was `original`.
    pub fn classify(original: &Bytes32, current: &Bytes32, new: &Bytes32) -> Self {
        if current == new {
            return Self::Assigned;
        }

        // Clean slot: first modification in this transaction.
        if original == current {
            return if original.is_zero() {
                Self::Added
            } else if new.is_zero() {
                Self::Deleted
            } else {
                Self::Modified
            };
        }

        // Dirty slot.
        if original.is_zero() {
            if new.is_zero() {
                Self::AddedDeleted
            } else {
                Self::Assigned
            }
        } else if current.is_zero() {
            if new == original {
                Self::DeletedRestored
            } else {
                Self::DeletedAdded
            }
        } else if new.is_zero() {
            Self::ModifiedDeleted
        } else if new == original {
            Self::ModifiedRestored
        } else {
            Self::Assigned
        }
    }

    pub fn from_i32(v: i32) -> Option<Self> {
        let status = match v {
            0 => Self::Assigned,
            1 => Self::Added,
            2 => Self::Deleted,
            3 => Self::Modified,
            4 => Self::DeletedAdded,
            5 => Self::ModifiedDeleted,
            6 => Self::DeletedRestored,
            7 => Self::AddedDeleted,
            8 => Self::ModifiedRestored,
            _ => return None,
        };
        Some(status)
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for StorageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Assigned => "assigned",
            Self::Added => "added",
            Self::Deleted => "deleted",
            Self::Modified => "modified",
            Self::DeletedAdded => "deleted-added",
            Self::ModifiedDeleted => "modified-deleted",
            Self::DeletedRestored => "deleted-restored",
            Self::AddedDeleted => "added-deleted",
            Self::ModifiedRestored => "modified-restored",
        };
        f.write_str(s)
    }
}

//! Update operations and the pending-update set
//!
//! Every detected state change becomes an [`UpdateOperation`] tagged
//! with the tree it originated from. Operations queued within one
//! flush window are coalesced per path in a [`PendingUpdateSet`]:
//! the newest operation for a path replaces the older one
//! (last-write-wins), while flush order follows intake order.

use crate::path::TreePath;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Which tree a change originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// The modern reactive store tree
    TreeA,
    /// The legacy imperative global tree
    TreeB,
}

impl Origin {
    /// The tree an operation from this origin is applied to
    pub fn opposite(self) -> Self {
        match self {
            Self::TreeA => Self::TreeB,
            Self::TreeB => Self::TreeA,
        }
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TreeA => write!(f, "tree_a"),
            Self::TreeB => write!(f, "tree_b"),
        }
    }
}

/// One detected state change awaiting propagation
///
/// An operation is never replayed back into its own origin tree; the
/// synchronizer applies it to `source.opposite()` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOperation {
    /// Location of the change
    pub path: TreePath,
    /// New value at that location
    pub value: Value,
    /// Wall-clock intake time (diagnostics only, not used for ordering)
    pub timestamp: DateTime<Utc>,
    /// Monotonic intake counter; preserves queue order inside a flush window
    pub seq: u64,
    /// Tree the change was observed on
    pub source: Origin,
}

impl UpdateOperation {
    /// Create an operation stamped with the current wall-clock time
    pub fn new(path: TreePath, value: Value, seq: u64, source: Origin) -> Self {
        Self {
            path,
            value,
            timestamp: Utc::now(),
            seq,
            source,
        }
    }
}

/// Pending operations keyed by canonical path string
///
/// Invariant: at most one pending operation per path. Inserting an
/// operation for an already-pending path replaces it.
#[derive(Debug, Default)]
pub struct PendingUpdateSet {
    operations: HashMap<String, UpdateOperation>,
}

impl PendingUpdateSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an operation, replacing any pending one for the same path
    ///
    /// Returns the replaced operation, if any.
    pub fn insert(&mut self, op: UpdateOperation) -> Option<UpdateOperation> {
        self.operations.insert(op.path.to_string(), op)
    }

    /// Whether an operation is pending for this path
    pub fn contains(&self, path: &TreePath) -> bool {
        self.operations.contains_key(&path.to_string())
    }

    /// Number of pending operations
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Remove and return all pending operations in intake (`seq`) order
    pub fn drain_ordered(&mut self) -> Vec<UpdateOperation> {
        let mut ops: Vec<UpdateOperation> = self.operations.drain().map(|(_, op)| op).collect();
        ops.sort_by_key(|op| op.seq);
        ops
    }

    /// Discard all pending operations
    pub fn clear(&mut self) {
        self.operations.clear();
    }
}

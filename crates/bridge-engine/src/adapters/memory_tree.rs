//! In-memory observable state tree
//!
//! An explicit "observable cell" tree: a JSON value root guarded by a
//! lock, plus a watcher registry. There is no implicit trapping; every
//! mutation goes through [`StateTree::set`], which is also what makes
//! change notification exact.
//!
//! Watch semantics: a shallow watcher fires only when the watched path
//! itself is assigned; a deep watcher also fires for assignments below
//! it. Observers receive the precise changed path and value.

use bridge_domain::error::{Error, Result};
use bridge_domain::path::{PathSegment, TreePath};
use bridge_domain::ports::tree::{ChangeObserver, StateTree, WatchId};
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::sync::RwLock;

struct WatcherEntry {
    path: TreePath,
    deep: bool,
    observer: ChangeObserver,
}

/// Observable in-memory JSON tree
pub struct MemoryTree {
    root: RwLock<Value>,
    watchers: DashMap<WatchId, WatcherEntry>,
}

impl MemoryTree {
    /// Create an empty tree (root is an empty object)
    pub fn new() -> Self {
        Self::with_value(Value::Object(Map::new()))
    }

    /// Create a tree with an initial root value
    pub fn with_value(root: Value) -> Self {
        Self {
            root: RwLock::new(root),
            watchers: DashMap::new(),
        }
    }

    /// Snapshot of the whole tree
    pub fn snapshot(&self) -> Value {
        self.root.read().expect("tree lock").clone()
    }

    /// Number of registered watchers
    pub fn watcher_count(&self) -> usize {
        self.watchers.len()
    }

    fn notify(&self, changed: &TreePath, value: &Value) {
        // Collect first so no registry lock is held during callbacks
        let observers: Vec<ChangeObserver> = self
            .watchers
            .iter()
            .filter(|entry| {
                let watcher = entry.value();
                if watcher.deep {
                    changed.starts_with(&watcher.path)
                } else {
                    *changed == watcher.path
                }
            })
            .map(|entry| entry.value().observer.clone())
            .collect();
        for observer in observers {
            observer(changed, value);
        }
    }
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTree")
            .field("watchers", &self.watchers.len())
            .finish()
    }
}

impl StateTree for MemoryTree {
    fn get(&self, path: &TreePath) -> Option<Value> {
        let root = self.root.read().expect("tree lock");
        get_at(&root, path.segments()).cloned()
    }

    fn set(&self, path: &TreePath, value: Value) -> Result<()> {
        {
            let mut root = self.root.write().expect("tree lock");
            set_at(&mut root, path.segments(), value.clone())?;
        }
        self.notify(path, &value);
        Ok(())
    }

    fn watch(&self, path: &TreePath, deep: bool, observer: ChangeObserver) -> WatchId {
        let id = WatchId::new();
        self.watchers.insert(
            id,
            WatcherEntry {
                path: path.clone(),
                deep,
                observer,
            },
        );
        id
    }

    fn unwatch(&self, id: WatchId) {
        self.watchers.remove(&id);
    }
}

/// Walk a path through a value
fn get_at<'a>(value: &'a Value, segments: &[PathSegment]) -> Option<&'a Value> {
    let Some((first, rest)) = segments.split_first() else {
        return Some(value);
    };
    match first {
        PathSegment::Key(key) => get_at(value.as_object()?.get(key)?, rest),
        PathSegment::Index(idx) => get_at(value.as_array()?.get(*idx)?, rest),
    }
}

/// Write a value at a path, auto-vivifying missing intermediates
///
/// Key segments materialize objects, index segments materialize arrays
/// grown with null padding to reach the index. An existing scalar in
/// the way is replaced by the vivified container.
fn set_at(target: &mut Value, segments: &[PathSegment], value: Value) -> Result<()> {
    let Some((first, rest)) = segments.split_first() else {
        *target = value;
        return Ok(());
    };
    match first {
        PathSegment::Key(key) => {
            if !matches!(target, Value::Object(_)) {
                *target = Value::Object(Map::new());
            }
            match target {
                Value::Object(map) => {
                    let slot = map.entry(key.clone()).or_insert(Value::Null);
                    set_at(slot, rest, value)
                }
                _ => Err(Error::sync(key, "failed to vivify object")),
            }
        }
        PathSegment::Index(idx) => {
            if !matches!(target, Value::Array(_)) {
                *target = Value::Array(Vec::new());
            }
            match target {
                Value::Array(items) => {
                    while items.len() <= *idx {
                        items.push(Value::Null);
                    }
                    set_at(&mut items[*idx], rest, value)
                }
                _ => Err(Error::sync(idx, "failed to vivify array")),
            }
        }
    }
}

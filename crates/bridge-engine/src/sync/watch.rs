//! Watch topology attachment
//!
//! Translates the depth/exclusion/collection policies into concrete
//! watcher registrations on a tree:
//!
//! | Node class                    | Watcher                               |
//! |-------------------------------|---------------------------------------|
//! | always-sync path              | one deep watcher                      |
//! | excluded path                 | shallow (reference changes only)      |
//! | at or beyond max depth        | one deep watcher                      |
//! | object / small array          | shallow here, recurse per child       |
//! | large array, `reference`      | shallow                               |
//! | large array, `id`             | deep with id-list structural diffing  |
//! | large array, `full`           | one deep watcher                      |
//!
//! Observers capture the synchronizer weakly so watcher registries
//! inside the trees never keep it alive.

use super::{StateSynchronizer, SyncInner};
use crate::config::ArrayStrategy;
use bridge_domain::path::TreePath;
use bridge_domain::ports::tree::ChangeObserver;
use bridge_domain::update::Origin;
use serde_json::Value;
use std::sync::{Arc, Weak};
use tracing::trace;

/// Paths to attach watchers at, per the configured roots
///
/// With no configured roots, every top-level key of the tree's current
/// root object becomes a watch root.
pub(super) fn root_paths(inner: &Arc<SyncInner>, origin: Origin) -> Vec<TreePath> {
    if !inner.config.watch_roots.is_empty() {
        return inner
            .config
            .watch_roots
            .iter()
            .map(|raw| TreePath::parse(raw))
            .collect();
    }
    match inner.tree(origin).get(&TreePath::root()) {
        Some(Value::Object(map)) => map
            .keys()
            .map(|key| TreePath::root().join_key(key.clone()))
            .collect(),
        _ => Vec::new(),
    }
}

pub(super) fn attach_tree(sync: &StateSynchronizer, origin: Origin) {
    for root in root_paths(sync.inner(), origin) {
        attach_path(sync, origin, &root, 1);
    }
}

fn attach_path(sync: &StateSynchronizer, origin: Origin, path: &TreePath, depth: usize) {
    let inner = sync.inner();
    let key = path.to_string();

    if inner.is_always_sync(&key) {
        watch_at(sync, origin, path, true, plain_observer(sync, origin));
        return;
    }
    if inner.is_excluded(&key) {
        // Reference watcher only; descendants stay unobserved
        watch_at(sync, origin, path, false, plain_observer(sync, origin));
        return;
    }
    if depth >= inner.config.max_watch_depth {
        trace!(path = %path, depth = depth, "Depth limit reached, deep watching subtree");
        watch_at(sync, origin, path, true, plain_observer(sync, origin));
        return;
    }

    match inner.tree(origin).get(path) {
        Some(Value::Object(map)) => {
            watch_at(sync, origin, path, false, rewatch_observer(sync, origin, depth));
            for child_key in map.keys() {
                attach_path(sync, origin, &path.join_key(child_key.clone()), depth + 1);
            }
        }
        Some(Value::Array(items))
            if items.len() >= inner.config.large_collection_threshold =>
        {
            match inner.config.array_strategy {
                ArrayStrategy::Reference => {
                    watch_at(sync, origin, path, false, plain_observer(sync, origin));
                }
                ArrayStrategy::Full => {
                    watch_at(sync, origin, path, true, plain_observer(sync, origin));
                }
                ArrayStrategy::Id => {
                    inner
                        .id_snapshots
                        .lock()
                        .expect("sync id snapshot lock")
                        .insert(key, extract_ids(&Value::Array(items)));
                    watch_at(sync, origin, path, true, id_diff_observer(sync, origin, path));
                }
            }
        }
        Some(Value::Array(items)) => {
            // Small arrays are walked like objects
            watch_at(sync, origin, path, false, rewatch_observer(sync, origin, depth));
            for index in 0..items.len() {
                attach_path(sync, origin, &path.join_index(index), depth + 1);
            }
        }
        _ => {
            watch_at(sync, origin, path, false, plain_observer(sync, origin));
        }
    }
}

fn watch_at(
    sync: &StateSynchronizer,
    origin: Origin,
    path: &TreePath,
    deep: bool,
    observer: ChangeObserver,
) {
    let id = sync.inner().tree(origin).watch(path, deep, observer);
    sync.inner().record_watch(origin, path, id);
}

fn upgrade(weak: &Weak<SyncInner>) -> Option<StateSynchronizer> {
    weak.upgrade().map(|inner| StateSynchronizer { inner })
}

/// Observer that forwards the change into the pending queue
fn plain_observer(sync: &StateSynchronizer, origin: Origin) -> ChangeObserver {
    let weak = Arc::downgrade(sync.inner());
    Arc::new(move |changed, value| {
        if let Some(sync) = upgrade(&weak) {
            sync.intake(origin, changed, value);
        }
    })
}

/// Observer for recursively walked nodes
///
/// When the node is reassigned to a fresh object or array, its old
/// per-child watchers address structure that no longer exists, so the
/// subtree below is re-attached against the new value.
fn rewatch_observer(sync: &StateSynchronizer, origin: Origin, depth: usize) -> ChangeObserver {
    let weak = Arc::downgrade(sync.inner());
    Arc::new(move |changed, value| {
        let Some(sync) = upgrade(&weak) else {
            return;
        };
        sync.intake(origin, changed, value);
        if value.is_object() || value.is_array() {
            sync.inner().unwatch_below(origin, changed);
            match value {
                Value::Object(map) => {
                    for child_key in map.keys() {
                        attach_path(&sync, origin, &changed.join_key(child_key.clone()), depth + 1);
                    }
                }
                Value::Array(items) => {
                    for index in 0..items.len() {
                        attach_path(&sync, origin, &changed.join_index(index), depth + 1);
                    }
                }
                _ => {}
            }
        }
    })
}

/// Observer for large arrays under the id strategy
///
/// Structural changes (insert, remove, reorder) are detected by
/// comparing the ordered id list against the last snapshot and
/// propagate the whole array. Content edits inside an element keep
/// their precise path.
fn id_diff_observer(
    sync: &StateSynchronizer,
    origin: Origin,
    array_path: &TreePath,
) -> ChangeObserver {
    let weak = Arc::downgrade(sync.inner());
    let array_path = array_path.clone();
    Arc::new(move |changed, value| {
        let Some(sync) = upgrade(&weak) else {
            return;
        };
        let key = array_path.to_string();
        if changed == &array_path {
            sync.inner()
                .id_snapshots
                .lock()
                .expect("sync id snapshot lock")
                .insert(key, extract_ids(value));
            sync.intake(origin, changed, value);
            return;
        }

        let current = sync
            .inner()
            .tree(origin)
            .get(&array_path)
            .unwrap_or(Value::Null);
        let ids = extract_ids(&current);
        let structural = {
            let mut snapshots = sync
                .inner()
                .id_snapshots
                .lock()
                .expect("sync id snapshot lock");
            let changed_structurally = snapshots.get(&key) != Some(&ids);
            if changed_structurally {
                snapshots.insert(key, ids);
            }
            changed_structurally
        };
        if structural {
            sync.intake(origin, &array_path, &current);
        } else {
            sync.intake(origin, changed, value);
        }
    })
}

/// Ordered identity list of an array
///
/// Elements expose identity through an `id` field (string or number);
/// elements without one fall back to their position.
pub(super) fn extract_ids(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| match item.get("id") {
                Some(Value::String(id)) => id.clone(),
                Some(Value::Number(id)) => id.to_string(),
                _ => format!("#{index}"),
            })
            .collect(),
        _ => Vec::new(),
    }
}

//! Dependency ordering of recovery strategies
//!
//! Kahn-style layering: each layer contains strategies whose declared
//! dependencies have all been placed in earlier layers. Dependencies
//! pointing outside the selected set are ignored. A dependency cycle
//! is broken by forcing the lexicographically smallest remaining id
//! into the next layer, so ordering is total and deterministic.

use std::collections::HashSet;
use tracing::warn;

/// Order `(id, dependencies)` pairs into executable layers
///
/// Returns indices into the input slice. Strategies inside one layer
/// are mutually independent and may run together.
pub(super) fn order_layers(strategies: &[(String, Vec<String>)]) -> Vec<Vec<usize>> {
    let selected: HashSet<&str> = strategies.iter().map(|(id, _)| id.as_str()).collect();
    let mut placed: HashSet<&str> = HashSet::new();
    let mut remaining: Vec<usize> = (0..strategies.len()).collect();
    let mut layers = Vec::new();

    while !remaining.is_empty() {
        let mut ready: Vec<usize> = remaining
            .iter()
            .copied()
            .filter(|&i| {
                strategies[i]
                    .1
                    .iter()
                    .all(|dep| !selected.contains(dep.as_str()) || placed.contains(dep.as_str()))
            })
            .collect();

        if ready.is_empty() {
            // Cycle: force the lexicographically smallest remaining id
            let forced = remaining
                .iter()
                .copied()
                .min_by(|&a, &b| strategies[a].0.cmp(&strategies[b].0))
                .unwrap_or(remaining[0]);
            warn!(
                strategy = strategies[forced].0.as_str(),
                "Dependency cycle among recovery strategies, forcing execution order"
            );
            ready.push(forced);
        }

        // Deterministic order inside a layer
        ready.sort_by(|&a, &b| strategies[a].0.cmp(&strategies[b].0));
        for &i in &ready {
            placed.insert(strategies[i].0.as_str());
        }
        remaining.retain(|i| !ready.contains(i));
        layers.push(ready);
    }
    layers
}

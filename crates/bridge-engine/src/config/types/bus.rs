//! Event bus configuration types

use bridge_domain::constants::{
    DEFAULT_BATCH_DELAY_MS, DEFAULT_BATCH_SIZE, DEFAULT_ORPHAN_AGE_SECS, DEFAULT_PRIORITY,
    DEFAULT_THROTTLE_MS,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-event dispatch tuning
///
/// Keyed in [`EventBusConfig::events`] by exact event name or wildcard
/// pattern (`*` per segment, `**` across segments, `:`-separated).
/// Unconfigured events default to immediate, non-batched dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventTuning {
    /// Accumulate payloads and dispatch them together
    pub batched: bool,

    /// Queue length that triggers an immediate flush
    pub batch_size: usize,

    /// Time a partially filled batch waits before flushing (milliseconds)
    pub batch_delay_ms: u64,

    /// Coalesce bursts, forwarding only the most recent payload per window
    pub throttled: bool,

    /// Throttle window (milliseconds)
    pub throttle_ms: u64,

    /// Priority bucket applied to listeners of this event at dispatch
    pub priority: i32,

    /// Diagnostic category for logs
    pub category: Option<String>,
}

/// Returns default tuning: immediate dispatch, no batching or
/// throttling, batch size 10 / delay 50ms / throttle 100ms when
/// enabled later.
impl Default for EventTuning {
    fn default() -> Self {
        Self {
            batched: false,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay_ms: DEFAULT_BATCH_DELAY_MS,
            throttled: false,
            throttle_ms: DEFAULT_THROTTLE_MS,
            priority: DEFAULT_PRIORITY,
            category: None,
        }
    }
}

impl EventTuning {
    /// Tuning that batches with the given size and delay
    pub fn batched(batch_size: usize, batch_delay_ms: u64) -> Self {
        Self {
            batched: true,
            batch_size,
            batch_delay_ms,
            ..Default::default()
        }
    }

    /// Tuning that throttles with the given window
    pub fn throttled(throttle_ms: u64) -> Self {
        Self {
            throttled: true,
            throttle_ms,
            ..Default::default()
        }
    }

    /// Set the diagnostic category
    pub fn with_category<S: Into<String>>(mut self, category: S) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Enable throttling on an existing tuning
    pub fn with_throttle(mut self, throttle_ms: u64) -> Self {
        self.throttled = true;
        self.throttle_ms = throttle_ms;
        self
    }
}

/// Event bus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventBusConfig {
    /// Per-event tuning, keyed by exact name or wildcard pattern
    pub events: HashMap<String, EventTuning>,

    /// Age after which an inactive, never-fired listener is purged (seconds)
    pub orphan_age_secs: u64,

    /// Interval between orphan sweeps (seconds)
    pub sweep_interval_secs: u64,
}

/// Returns default event bus configuration: no per-event tuning,
/// 5 minute orphan age, 1 minute sweep interval.
impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            events: HashMap::new(),
            orphan_age_secs: DEFAULT_ORPHAN_AGE_SECS,
            sweep_interval_secs: crate::constants::DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl EventBusConfig {
    /// Add tuning for an event name or pattern
    pub fn with_event<S: Into<String>>(mut self, key: S, tuning: EventTuning) -> Self {
        self.events.insert(key.into(), tuning);
        self
    }
}

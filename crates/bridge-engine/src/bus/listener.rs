//! Listener entries and subscription handles

use crate::matcher::PatternMatcher;
use bridge_domain::error::Result;
use bridge_domain::subscription::{SubscribeOptions, SubscriptionId};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;
use std::time::Instant;

/// Listener callback; an `Err` is contained and logged by the bus
pub type Callback = Arc<dyn Fn(Value) -> Result<()> + Send + Sync>;

/// Handle returned by `EventBus::on`
#[derive(Debug, Clone)]
pub struct Subscription {
    id: SubscriptionId,
    pattern: String,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, pattern: &str) -> Self {
        Self {
            id,
            pattern: pattern.to_string(),
        }
    }

    /// Subscription id
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Pattern the listener was registered on
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl std::fmt::Display for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.id, self.pattern)
    }
}

pub(crate) struct ListenerEntry {
    pub(crate) id: SubscriptionId,
    pub(crate) pattern: String,
    /// Present when the pattern carries wildcards
    pub(crate) matcher: Option<PatternMatcher>,
    pub(crate) priority: i32,
    pub(crate) once: bool,
    pub(crate) timeout_ms: Option<u64>,
    pub(crate) active: AtomicBool,
    /// Set when a once-listener claims its single invocation
    pub(crate) claimed: AtomicBool,
    pub(crate) fired: AtomicU64,
    pub(crate) created_at: Instant,
    pub(crate) callback: Callback,
}

impl ListenerEntry {
    pub(crate) fn new(
        id: SubscriptionId,
        pattern: &str,
        matcher: Option<PatternMatcher>,
        options: &SubscribeOptions,
        callback: Callback,
        created_at: Instant,
    ) -> Self {
        Self {
            id,
            pattern: pattern.to_string(),
            matcher,
            priority: options.priority,
            once: options.once,
            timeout_ms: options.timeout_ms,
            active: AtomicBool::new(true),
            claimed: AtomicBool::new(false),
            fired: AtomicU64::new(0),
            created_at,
            callback,
        }
    }
}

//! Event subscription identity and metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier of an event bus subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Generate a fresh id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Options accepted when registering a listener
#[derive(Debug, Clone, Default)]
pub struct SubscribeOptions {
    /// Dispatch priority; higher values run first
    pub priority: i32,
    /// Deactivate the listener after its first invocation
    pub once: bool,
    /// Cooperative timeout in milliseconds; expiry logs a warning only
    pub timeout_ms: Option<u64>,
    /// Owning component, for memory-guard lifecycle tracking
    pub owner: Option<String>,
}

impl SubscribeOptions {
    /// Options with a given priority
    pub fn priority(priority: i32) -> Self {
        Self {
            priority,
            ..Default::default()
        }
    }

    /// Options for a one-shot listener
    pub fn once() -> Self {
        Self {
            once: true,
            ..Default::default()
        }
    }

    /// Set the owning component
    pub fn with_owner<S: Into<String>>(mut self, owner: S) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Set the cooperative timeout
    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }
}

/// Observable metadata of one subscription
///
/// Lifecycle: created on `on()`, marked inactive on `off()` (kept
/// briefly for in-flight stats), purged by the memory guard once
/// stale or orphaned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionInfo {
    /// Subscription id
    pub id: SubscriptionId,
    /// Event name or wildcard pattern the listener is registered on
    pub pattern: String,
    /// Dispatch priority
    pub priority: i32,
    /// Whether the listener deactivates after one invocation
    pub once: bool,
    /// Registration time
    pub created_at: DateTime<Utc>,
    /// Last invocation time, if any
    pub last_used: Option<DateTime<Utc>>,
    /// Number of invocations so far
    pub call_count: u64,
    /// Whether the listener still receives events
    pub active: bool,
    /// Owning component, if declared
    pub owner: Option<String>,
}

//! Memory guard configuration types

use bridge_domain::constants::{
    DEFAULT_GUARD_POLL_INTERVAL_SECS, DEFAULT_MAX_EVENT_LISTENERS_PER_TYPE,
    DEFAULT_MAX_STALE_LISTENER_AGE_SECS,
};
use serde::{Deserialize, Serialize};

/// Memory guard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Interval between sweeps (seconds); checks run on this poll,
    /// never on every mutation
    pub poll_interval_secs: u64,

    /// Age after which an unused listener is flagged stale (seconds)
    ///
    /// A never-fired listener older than twice this value becomes a
    /// leak suspect.
    pub max_stale_listener_age_secs: u64,

    /// Live-listener count per event name that raises a warning
    ///
    /// A design signal, not a hard limit.
    pub max_event_listeners_per_type: usize,

    /// Force-unsubscribe leak suspects and dangling subscriptions
    pub auto_remediate: bool,
}

/// Returns default guard configuration with:
/// - 30s poll, 10 minute stale age, 25 listeners per event warning
/// - Auto-remediation disabled (observe, don't intervene)
impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_GUARD_POLL_INTERVAL_SECS,
            max_stale_listener_age_secs: DEFAULT_MAX_STALE_LISTENER_AGE_SECS,
            max_event_listeners_per_type: DEFAULT_MAX_EVENT_LISTENERS_PER_TYPE,
            auto_remediate: false,
        }
    }
}

impl GuardConfig {
    /// Config with auto-remediation enabled
    pub fn remediating() -> Self {
        Self {
            auto_remediate: true,
            ..Default::default()
        }
    }
}

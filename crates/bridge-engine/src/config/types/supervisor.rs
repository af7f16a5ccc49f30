//! Supervisor configuration types

use bridge_domain::constants::{
    DEFAULT_BACKOFF_BASE_MS, DEFAULT_BACKOFF_CAP_MS, DEFAULT_CHECK_INTERVAL_SECS,
    DEFAULT_MAX_ATTEMPTS_PER_STRATEGY, DEFAULT_MAX_RECOVERY_ATTEMPTS,
    DEFAULT_STRATEGY_TIMEOUT_MS, DEFAULT_VERIFY_DELAY_MS,
};
use serde::{Deserialize, Serialize};

/// Self-healing supervisor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Interval between scheduled health passes (seconds)
    pub check_interval_secs: u64,

    /// Automatic recovery cycles before escalating to critical failure
    pub max_recovery_attempts: u32,

    /// Attempts after which a single strategy is no longer selected
    pub max_attempts_per_strategy: u32,

    /// Default per-strategy execution timeout (milliseconds)
    pub strategy_timeout_ms: u64,

    /// Pause before the post-recovery verification pass (milliseconds)
    pub verify_delay_ms: u64,

    /// Backoff base delay (milliseconds)
    pub backoff_base_ms: u64,

    /// Backoff delay cap (milliseconds)
    pub backoff_cap_ms: u64,

    /// Exponential backoff (`min(cap, base * 2^(attempt-1))`) when
    /// true, fixed `backoff_base_ms` cooldown when false
    pub progressive_backoff: bool,

    /// Execute independent strategies of one dependency layer together
    pub parallel_recovery: bool,

    /// Skip remaining strategies in a cycle once a critical one fails
    pub abort_on_critical_failure: bool,
}

/// Returns default supervisor configuration with:
/// - 30s health pass interval, 5 recovery cycles, 3 attempts per strategy
/// - 10s strategy timeout, progressive backoff 1s..60s
/// - Sequential execution, aborting on critical strategy failure
impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: DEFAULT_CHECK_INTERVAL_SECS,
            max_recovery_attempts: DEFAULT_MAX_RECOVERY_ATTEMPTS,
            max_attempts_per_strategy: DEFAULT_MAX_ATTEMPTS_PER_STRATEGY,
            strategy_timeout_ms: DEFAULT_STRATEGY_TIMEOUT_MS,
            verify_delay_ms: DEFAULT_VERIFY_DELAY_MS,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
            backoff_cap_ms: DEFAULT_BACKOFF_CAP_MS,
            progressive_backoff: true,
            parallel_recovery: false,
            abort_on_critical_failure: true,
        }
    }
}

impl SupervisorConfig {
    /// Config with parallel dependency-layer execution
    pub fn parallel() -> Self {
        Self {
            parallel_recovery: true,
            ..Default::default()
        }
    }
}

//! Domain layer constants
//!
//! Default thresholds and intervals shared across the workspace.
//! Engine-specific constants (config file names, env prefixes) live in
//! `bridge_engine::constants`.

// ============================================================================
// SYNCHRONIZER CONSTANTS
// ============================================================================

/// Default maximum recursive watch depth before falling back to one deep watcher
pub const DEFAULT_MAX_WATCH_DEPTH: usize = 5;

/// Default element count at which an array is treated as a large collection
pub const DEFAULT_LARGE_COLLECTION_THRESHOLD: usize = 100;

// ============================================================================
// EVENT BUS CONSTANTS
// ============================================================================

/// Default batch size for batched events
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Default batch delay in milliseconds
pub const DEFAULT_BATCH_DELAY_MS: u64 = 50;

/// Default throttle interval in milliseconds
pub const DEFAULT_THROTTLE_MS: u64 = 100;

/// Default listener priority bucket
pub const DEFAULT_PRIORITY: i32 = 0;

/// Age after which an inactive, never-fired listener is purged (seconds)
pub const DEFAULT_ORPHAN_AGE_SECS: u64 = 300;

// ============================================================================
// MEMORY GUARD CONSTANTS
// ============================================================================

/// Default age after which an unused listener is flagged stale (seconds)
pub const DEFAULT_MAX_STALE_LISTENER_AGE_SECS: u64 = 600;

/// Default live-listener count per event name that raises a warning
pub const DEFAULT_MAX_EVENT_LISTENERS_PER_TYPE: usize = 25;

/// Default guard polling interval (seconds)
pub const DEFAULT_GUARD_POLL_INTERVAL_SECS: u64 = 30;

// ============================================================================
// SUPERVISOR CONSTANTS
// ============================================================================

/// Default health check interval (seconds)
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 30;

/// Default cap on automatic recovery cycles before escalation
pub const DEFAULT_MAX_RECOVERY_ATTEMPTS: u32 = 5;

/// Default cap on attempts of any single strategy
pub const DEFAULT_MAX_ATTEMPTS_PER_STRATEGY: u32 = 3;

/// Default per-strategy execution timeout (milliseconds)
pub const DEFAULT_STRATEGY_TIMEOUT_MS: u64 = 10_000;

/// Default pause before re-running health checks after recovery (milliseconds)
pub const DEFAULT_VERIFY_DELAY_MS: u64 = 250;

/// Default backoff base delay (milliseconds)
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 1_000;

/// Default backoff delay cap (milliseconds)
pub const DEFAULT_BACKOFF_CAP_MS: u64 = 60_000;

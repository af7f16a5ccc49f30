//! Engine layer constants
//!
//! Constants that are part of the engine implementation. Domain-level
//! defaults (thresholds, intervals) are defined in
//! `bridge_domain::constants`.

// ============================================================================
// CONFIGURATION CONSTANTS
// ============================================================================

/// Default configuration file name
pub const DEFAULT_CONFIG_FILENAME: &str = "bridge.toml";

/// Environment variable prefix for configuration
pub const CONFIG_ENV_PREFIX: &str = "BRIDGE";

/// Environment variable consulted for the log filter
pub const LOG_ENV_VAR: &str = "BRIDGE_LOG";

// ============================================================================
// SWEEP CONSTANTS
// ============================================================================

/// Default interval between bus orphan sweeps (seconds)
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

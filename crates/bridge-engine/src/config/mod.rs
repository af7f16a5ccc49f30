//! Configuration management
//!
//! Per-component configuration structs with named, defaulted fields,
//! loaded by layering defaults ← TOML file ← environment variables.

/// Configuration loading from files and environment
pub mod loader;
/// Configuration type definitions
pub mod types;

// Re-export commonly used types
pub use loader::ConfigLoader;
pub use types::{
    ArrayStrategy, BridgeConfig, EventBusConfig, EventTuning, GuardConfig, LoggingConfig,
    SupervisorConfig, SyncConfig,
};

//! Configuration type definitions
//!
//! One struct per component, each with serde defaults and builder
//! helpers.
//!
//! | Type | Component |
//! |------|-----------|
//! | [`BridgeConfig`] | Aggregate of everything below |
//! | [`SyncConfig`] | Selective state synchronizer |
//! | [`EventBusConfig`] / [`EventTuning`] | Event bus |
//! | [`GuardConfig`] | Memory guard |
//! | [`SupervisorConfig`] | Self-healing supervisor |
//! | [`LoggingConfig`] | Structured logging |

/// Aggregate configuration
pub mod app;
/// Event bus configuration
pub mod bus;
/// Memory guard configuration
pub mod guard;
/// Logging configuration
pub mod logging;
/// Supervisor configuration
pub mod supervisor;
/// Synchronizer configuration
pub mod sync;

// Re-export configuration types
pub use app::BridgeConfig;
pub use bus::{EventBusConfig, EventTuning};
pub use guard::GuardConfig;
pub use logging::LoggingConfig;
pub use supervisor::SupervisorConfig;
pub use sync::{ArrayStrategy, SyncConfig};

//! State bridge engine
//!
//! Keeps a modern reactive store and a legacy global object tree
//! observably consistent, with an application event bus, subscription
//! leak detection, and bounded self-healing on top.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Default implementations of the domain ports |
//! | [`bus`] | Priority- and pattern-aware event bus with batching |
//! | [`config`] | Layered configuration (defaults ← TOML ← env) |
//! | [`context`] | Component assembly and lifecycle |
//! | [`guard`] | Subscription leak detection sweeps |
//! | [`logging`] | Structured logging setup and helpers |
//! | [`matcher`] | Wildcard pattern compilation |
//! | [`sched`] | Timer handles, debounce and throttle primitives |
//! | [`supervisor`] | Health checks and dependency-ordered recovery |
//! | [`sync`] | Selective state synchronization between the trees |
//! | [`tracker`] | Subscription usage registry |
//!
//! ## Quick start
//!
//! ```no_run
//! use bridge_engine::adapters::MemoryTree;
//! use bridge_engine::config::BridgeConfig;
//! use bridge_engine::context::BridgeContext;
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let store = Arc::new(MemoryTree::with_value(serde_json::json!({ "chat": {} })));
//! let legacy = Arc::new(MemoryTree::with_value(serde_json::json!({ "chat": {} })));
//! let bridge = BridgeContext::builder(BridgeConfig::default(), store, legacy).build();
//! bridge.start();
//! # }
//! ```

/// Default port adapters
pub mod adapters;
/// Event bus
pub mod bus;
/// Configuration types and loading
pub mod config;
/// Engine-level constants
pub mod constants;
/// Component assembly
pub mod context;
/// Error context extension trait
pub mod error_ext;
/// Memory guard
pub mod guard;
/// Logging setup
pub mod logging;
/// Wildcard pattern matching
pub mod matcher;
/// Scheduling primitives
pub mod sched;
/// Self-healing supervisor
pub mod supervisor;
/// State synchronizer
pub mod sync;
/// Subscription tracking
pub mod tracker;

// Re-export the domain crate for downstream convenience
pub use bridge_domain as domain;

// Commonly used types at the crate root
pub use bus::{EventBus, Subscription};
pub use config::{BridgeConfig, ConfigLoader};
pub use context::{BridgeBuilder, BridgeContext};
pub use error_ext::ErrorContext;
pub use guard::{GuardReport, MemoryGuard};
pub use supervisor::Supervisor;
pub use sync::{StateSynchronizer, SyncStatsSnapshot};
pub use tracker::{ComponentRegistry, SubscriptionTracker};

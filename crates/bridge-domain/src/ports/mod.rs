//! Port traits implemented by external collaborators
//!
//! The engine is agnostic to how either state tree implements
//! reactivity, how time is sourced, and where status reports land.
//! Everything it needs from the outside world is expressed here.
//!
//! ## Ports
//!
//! | Port | Description |
//! |------|-------------|
//! | [`StateTree`] | Path-addressed get/set/watch over one tree |
//! | [`Scheduler`] | Injectable timer source (testable without real time) |
//! | [`StatusSink`] | Bridge status reporting collaborator |
//! | [`HealthProbe`] | One executable health check |
//! | [`RecoveryAction`] | One executable recovery strategy |

/// Injectable timer and clock source
pub mod scheduler;
/// Status reporting collaborator
pub mod status;
/// Health probe and recovery action contracts
pub mod supervisor;
/// Observable state tree contract
pub mod tree;

// Re-export commonly used port types
pub use scheduler::Scheduler;
pub use status::{StatusListener, StatusListenerGuard, StatusSink};
pub use supervisor::{FnProbe, FnRecovery, HealthProbe, RecoveryAction};
pub use tree::{ChangeObserver, StateTree, WatchId};

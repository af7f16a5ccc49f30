//! Default port adapters
//!
//! Concrete implementations of the domain ports used when the host
//! application does not supply its own.
//!
//! | Adapter | Port | Description |
//! |---------|------|-------------|
//! | [`TokioScheduler`] | `Scheduler` | tokio timers; deterministic under paused time |
//! | [`StatusChannel`] | `StatusSink` | arc-swap snapshot + listener registry |
//! | [`MemoryTree`] | `StateTree` | observable in-memory JSON value tree |

/// In-memory observable state tree
pub mod memory_tree;
/// Tokio-backed scheduler
pub mod scheduler;
/// Default status collaborator
pub mod status;

// Re-export adapters
pub use memory_tree::MemoryTree;
pub use scheduler::TokioScheduler;
pub use status::StatusChannel;

//! # Domain Layer
//!
//! Core types and port traits for the state bridge. This crate has no
//! runtime of its own: it defines the vocabulary the synchronization
//! engine speaks and the contracts its collaborators implement.
//!
//! ## Module Categories
//!
//! ### Core Types
//! | Module | Description |
//! |--------|-------------|
//! | [`path`] | Dot/bracket tree paths (`chat.sessions.[2].title`) |
//! | [`update`] | Update operations and the pending-update set |
//! | [`subscription`] | Event subscription identity and metadata |
//! | [`status`] | Bridge-wide status states and reports |
//! | [`health`] | Health check and recovery strategy descriptors |
//! | [`events`] | Event naming conventions (`<namespace>:<action>`) |
//!
//! ### Contracts
//! | Module | Description |
//! |--------|-------------|
//! | [`ports`] | Traits implemented by trees, schedulers, and status sinks |
//!
//! ### Support
//! | Module | Description |
//! |--------|-------------|
//! | [`error`] | Error taxonomy shared across the workspace |
//! | [`constants`] | Default thresholds and intervals |

pub mod constants;
pub mod error;
pub mod events;
pub mod health;
pub mod path;
pub mod ports;
pub mod status;
pub mod subscription;
pub mod update;

// Re-export commonly used types
pub use error::{Error, Result};
pub use path::{PathSegment, TreePath};
pub use status::{BridgeState, BridgeStatus};
pub use update::{Origin, PendingUpdateSet, UpdateOperation};

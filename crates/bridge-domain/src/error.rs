//! Error handling types

use thiserror::Error;

/// Result type alias for operations that can fail
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the state bridge
///
/// Component-internal failures are caught at the smallest possible
/// boundary (per operation, per listener, per strategy) and converted
/// into status/log signals; none of these variants is expected to
/// cross a component boundary unhandled.
#[derive(Error, Debug)]
pub enum Error {
    /// Applying one update operation to the opposite tree failed
    #[error("Sync error at '{path}': {message}")]
    Sync {
        /// Canonical path of the failed operation
        path: String,
        /// Description of the failure
        message: String,
    },

    /// An event listener returned an error during dispatch
    #[error("Dispatch error for '{event}': {message}")]
    Dispatch {
        /// Name of the event being dispatched
        event: String,
        /// Description of the failure
        message: String,
    },

    /// A recovery strategy failed to execute
    #[error("Recovery strategy '{strategy}' failed: {message}")]
    Recovery {
        /// Identifier of the failing strategy
        strategy: String,
        /// Description of the failure
        message: String,
    },

    /// An operation exceeded its allotted time
    #[error("Timeout after {ms}ms in {operation}")]
    Timeout {
        /// Description of the timed-out operation
        operation: String,
        /// Configured timeout in milliseconds
        ms: u64,
    },

    /// Configuration-related error
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Resource not found error
    #[error("Not found: {resource}")]
    NotFound {
        /// The resource that was not found
        resource: String,
    },

    /// Invalid argument provided to a function
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument
        message: String,
    },

    /// JSON parsing or serialization error
    #[error("JSON parsing error: {source}")]
    Json {
        /// The underlying JSON error
        #[from]
        source: serde_json::Error,
    },

    /// I/O operation error
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error
        #[from]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a sync error for a path
    pub fn sync<P: std::fmt::Display, M: Into<String>>(path: P, message: M) -> Self {
        Self::Sync {
            path: path.to_string(),
            message: message.into(),
        }
    }

    /// Create a dispatch error for an event
    pub fn dispatch<E: Into<String>, M: Into<String>>(event: E, message: M) -> Self {
        Self::Dispatch {
            event: event.into(),
            message: message.into(),
        }
    }

    /// Create a recovery error for a strategy
    pub fn recovery<S: Into<String>, M: Into<String>>(strategy: S, message: M) -> Self {
        Self::Recovery {
            strategy: strategy.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error without a source
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument<M: Into<String>>(message: M) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

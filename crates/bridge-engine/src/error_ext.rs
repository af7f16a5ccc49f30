//! Error extension utilities
//!
//! Context extension methods for domain errors.
//!
//! # Example
//!
//! ```ignore
//! use bridge_engine::error_ext::ErrorContext;
//!
//! let config = figment.extract().config_context("Failed to extract configuration")?;
//!
//! let value = tree.set(&path, value)
//!     .with_context(|| format!("Applying update at {path}"))?;
//! ```

use bridge_domain::error::{Error, Result};
use std::fmt;

/// Extension trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to a Result, converting the error to our domain Error type
    fn context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static;

    /// Add context with lazy evaluation for expensive context creation
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;

    /// Add context for configuration operations
    fn config_context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static,
        Self: Sized;

    /// Add context for sync-apply operations, tagged with the path
    fn sync_context<P>(self, path: P) -> Result<T>
    where
        P: fmt::Display,
        Self: Sized;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|err| Error::InvalidArgument {
            message: format!("{context}: {err}"),
        })
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|err| Error::InvalidArgument {
            message: format!("{}: {}", f(), err),
        })
    }

    fn config_context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|err| Error::Config {
            message: format!("{context}: {err}"),
            source: Some(Box::new(err)),
        })
    }

    fn sync_context<P>(self, path: P) -> Result<T>
    where
        P: fmt::Display,
    {
        self.map_err(|err| Error::Sync {
            path: path.to_string(),
            message: err.to_string(),
        })
    }
}

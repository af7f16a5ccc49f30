//! Logging configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Structured logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,

    /// Emit JSON-formatted log lines
    pub json_format: bool,

    /// Optional file to also log into (daily rotation)
    pub file_output: Option<PathBuf>,
}

/// Returns default logging configuration: info level, human-readable
/// output, no file appender.
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            file_output: None,
        }
    }
}

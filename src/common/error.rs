//! Error types for wecar_nav

use thiserror::Error;

/// Main error type for the estimator and planner
///
/// Only configuration-level failures are reported here. Numerical degeneracy
/// during a filter correction or a circle fit is reported as a tagged outcome
/// by the algorithm itself, never as an error.
#[derive(Debug, Error)]
pub enum NavError {
    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// Configuration rejected during validation
    #[error("Configuration error: {0}")]
    Config(String),
    /// Path file could not be parsed
    #[error("Path load error at line {line}: {reason}")]
    PathLoad { line: usize, reason: String },
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Configuration file could not be deserialised
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),
    /// Logger could not be installed
    #[error("Logger error: {0}")]
    Logger(#[from] log::SetLoggerError),
    /// Visualization error
    #[error("Visualization error: {0}")]
    Visualization(String),
}

/// Result type alias for fallible setup operations
pub type NavResult<T> = Result<T, NavError>;

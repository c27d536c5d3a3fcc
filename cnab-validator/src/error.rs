//! Error types for the CNAB validation engine

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Engine errors
///
/// Defects found in the validated file are never reported through this type;
/// they end up as [`crate::ValidationError`] entries. These variants cover the
/// engine itself failing: unreadable input, bad configuration, an
/// inconsistent custom layout, or a record rule that could not run.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Layout registration error
    #[error("Invalid layout: {0}")]
    Layout(String),

    /// Record-level rule could not be evaluated
    #[error("Rule error: {0}")]
    Rule(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

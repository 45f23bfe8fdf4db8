//! Domain error types
//!
//! This module defines the error hierarchy for Quarry. Errors are
//! domain-specific and don't expose third-party types to callers.

use thiserror::Error;

/// Main Quarry error type
///
/// This is the primary error type used throughout the application.
#[derive(Debug, Error)]
pub enum QuarryError {
    /// Bad or unsupported export configuration (unknown format, export
    /// disabled for the collection, invalid options)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Record source errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O errors while writing the output artifact
    #[error("I/O error: {0}")]
    Io(String),

    /// Archive creation errors
    #[error("Archive error: {0}")]
    Archive(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A record disappeared between counting and materialization
    #[error("Data inconsistency: {0}")]
    DataInconsistency(String),

    /// Checkpoint persistence errors
    #[error("State management error: {0}")]
    State(String),

    /// Download token errors
    #[error("Download error: {0}")]
    Download(String),
}

impl QuarryError {
    /// Whether the error was raised before any output was created
    pub fn is_configuration(&self) -> bool {
        matches!(self, QuarryError::Configuration(_))
    }
}

/// Record source errors
///
/// Errors raised by query and materializer implementations.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Collection not found
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// Query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Loading records failed
    #[error("Failed to load submissions: {0}")]
    LoadFailed(String),

    /// Source data could not be parsed
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// Source directory or file is missing
    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for QuarryError {
    fn from(err: std::io::Error) -> Self {
        QuarryError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for QuarryError {
    fn from(err: serde_json::Error) -> Self {
        QuarryError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for QuarryError {
    fn from(err: toml::de::Error) -> Self {
        QuarryError::Configuration(format!("TOML parse error: {err}"))
    }
}

impl From<csv::Error> for QuarryError {
    fn from(err: csv::Error) -> Self {
        QuarryError::Serialization(format!("CSV error: {err}"))
    }
}

impl From<zip::result::ZipError> for QuarryError {
    fn from(err: zip::result::ZipError) -> Self {
        QuarryError::Archive(err.to_string())
    }
}

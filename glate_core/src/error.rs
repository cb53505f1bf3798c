//! Error types for the glate_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for glate_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Definition lookup miss
    #[error("Substance '{0}' not found")]
    NotFound(String),

    /// A safety check referenced a substance with no definition
    #[error("Unknown substance: {0}")]
    UnknownSubstance(String),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog validation error
    #[error("Catalog validation error: {0}")]
    CatalogValidation(String),

    /// Background monitor failure
    #[error("Monitor error: {0}")]
    Monitor(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

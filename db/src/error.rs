//! Error types for schema database operations.
//!
//! Provides a unified error type covering I/O, serialization, model
//! resolution and bundle verification failures.

use entity_schema_core::ModelError;
use thiserror::Error;

/// Errors that can occur while loading definitions or handling bundles.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// The loaded definitions do not form a consistent model.
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// Two definition files declare the same schema name.
    #[error("schema {name} defined in both {first} and {second}")]
    DuplicateSchema {
        name: String,
        first: String,
        second: String,
    },

    /// A definition file has an extension other than `.json`, `.yml` or `.yaml`.
    #[error("unsupported definition format: {0}")]
    UnsupportedFormat(String),

    /// A bundle hash does not match its model.
    #[error("invalid checksum: {0}")]
    InvalidChecksum(String),

    /// All configured loader sources failed.
    #[error("no schema sources available")]
    NoSourcesAvailable,
}

/// Convenience alias for results with [`DatabaseError`].
pub type Result<T> = std::result::Result<T, DatabaseError>;

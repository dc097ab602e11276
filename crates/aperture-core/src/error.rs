//! Error types for the Aperture processing pipeline.
//!
//! Errors are organized by concern so each layer reports actionable context:
//! pipeline stages carry the file path and stage detail, the store carries
//! record identity, and the service layer maps cleanly onto HTTP semantics.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Aperture operations.
#[derive(Error, Debug)]
pub enum ApertureError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Record store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pipeline processing errors, organized by stage.
///
/// The `Display` text of these variants is what ends up in a failed record's
/// `error` field, so messages are written for the API consumer.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Upload failed format validation (bad extension, undecodable or
    /// mismatched content)
    #[error("Invalid image format: {reason}")]
    InvalidFormat { reason: String },

    /// Image decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Thumbnail generation failed for one preset
    #[error("Thumbnail generation failed for preset '{preset}': {message}")]
    Thumbnail { preset: String, message: String },

    /// Caption generation failed (always swallowed by the orchestrator)
    #[error("Caption generation failed: {message}")]
    Caption { message: String },

    /// Operation timed out
    #[error("Timeout in {stage} stage after {timeout_ms}ms")]
    Timeout { stage: String, timeout_ms: u64 },

    /// File exceeds size limit
    #[error("File too large: {size_mb}MB > {max_mb}MB")]
    FileTooLarge { size_mb: u64, max_mb: u64 },

    /// Image dimensions exceed limit
    #[error("Image too large: {width}x{height} > {max_dim}")]
    ImageTooLarge {
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
}

/// Record store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying SQLite failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to (de)serialize a stored field
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No record with the given id
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A stored value could not be interpreted
    #[error("Malformed value in record {id}: {message}")]
    Malformed { id: String, message: String },
}

/// Errors surfaced by the service facade, shaped for the HTTP layer.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Maps to HTTP 400
    #[error("{0}")]
    BadRequest(String),

    /// Maps to HTTP 404
    #[error("{0}")]
    NotFound(String),

    /// Record store failure (HTTP 500)
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// File storage failure (HTTP 500)
    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected internal failure (HTTP 500)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for Aperture results.
pub type Result<T> = std::result::Result<T, ApertureError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Convenience type alias for store results.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

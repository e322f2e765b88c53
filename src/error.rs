//! Error types for BeingKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using BeingError
pub type Result<T> = std::result::Result<T, BeingError>;

/// Unified error type for BeingKV operations
#[derive(Debug, Error)]
pub enum BeingError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Record Errors
    // -------------------------------------------------------------------------
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Wrong arity or shape of command arguments; the message is the usage hint
    #[error("{0}")]
    Usage(String),

    // -------------------------------------------------------------------------
    // Snapshot Errors
    // -------------------------------------------------------------------------
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Concurrency Errors
    // -------------------------------------------------------------------------
    #[error("Timed out after {0} ms")]
    Timeout(u64),

    #[error("Worker pool error: {0}")]
    Pool(String),
}

impl From<bincode::Error> for BeingError {
    fn from(e: bincode::Error) -> Self {
        BeingError::Serialization(e.to_string())
    }
}

impl From<roxmltree::Error> for BeingError {
    fn from(e: roxmltree::Error) -> Self {
        BeingError::Snapshot(format!("malformed XML: {}", e))
    }
}

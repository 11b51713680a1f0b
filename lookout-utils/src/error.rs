//! Error types for lookout
//!
//! Provides a unified error type used across all lookout crates.

use std::path::PathBuf;

/// Main error type for lookout operations
#[derive(Debug, thiserror::Error)]
pub enum LookoutError {
    // === IO Errors ===

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // === Transport Errors ===

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Command `{command}` was not accepted: {response}")]
    CommandRejected { command: String, response: String },

    #[error("Could not open a view for {filepath}: {reason}")]
    ViewOpenFailed { filepath: String, reason: String },

    // === Protocol Errors ===

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    // === Configuration Errors ===

    #[error("Configuration error: {0}")]
    Config(String),

    // === Internal Errors ===

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LookoutError {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an invalid message error
    pub fn invalid_message(msg: impl Into<String>) -> Self {
        Self::InvalidMessage(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using LookoutError
pub type Result<T> = std::result::Result<T, LookoutError>;

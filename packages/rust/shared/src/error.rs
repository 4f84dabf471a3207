//! Error types for ListingForge.
//!
//! Library crates use [`ListingForgeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

use crate::types::ValidationIssue;

/// Top-level error type for all ListingForge operations.
#[derive(Debug, thiserror::Error)]
pub enum ListingForgeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error talking to an upstream service.
    #[error("network error: {0}")]
    Network(String),

    /// HTML parsing or content extraction error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Generative-AI request or response error.
    #[error("Failed to optimize listing with AI: {0}")]
    Optimization(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input validation error, carrying every failed check.
    #[error("validation error: {message}")]
    Validation {
        message: String,
        issues: Vec<ValidationIssue>,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ListingForgeError>;

impl ListingForgeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error with its individual issues.
    pub fn validation(msg: impl Into<String>, issues: Vec<ValidationIssue>) -> Self {
        Self::Validation {
            message: msg.into(),
            issues,
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

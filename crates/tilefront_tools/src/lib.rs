//! # Tilefront Tools
//!
//! Command-line tooling around the match core:
//! - Config loading and validation
//! - Headless match runs with a JSON summary

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod headless;
pub mod validate;

use thiserror::Error;
use tilefront_core::error::GameError;

/// Errors surfaced by the tools.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Reading a file failed.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that could not be read.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The match core rejected something.
    #[error(transparent)]
    Game(#[from] GameError),

    /// Output could not be encoded.
    #[error("Failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result type alias using [`ToolError`].
pub type Result<T> = std::result::Result<T, ToolError>;

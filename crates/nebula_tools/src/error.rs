//! Tool errors.

use thiserror::Error;

use nebula_core::error::GameError;

/// Result type alias using [`ToolError`].
pub type Result<T> = std::result::Result<T, ToolError>;

/// Errors raised by the tools.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The scenario file could not be read.
    #[error("Failed to read '{path}': {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The core rejected the data.
    #[error(transparent)]
    Game(#[from] GameError),

    /// The scenario parsed but is inconsistent.
    #[error("Scenario '{path}' has {count} problem(s)")]
    Invalid {
        /// File path.
        path: String,
        /// Number of problems found.
        count: usize,
    },

    /// A referenced entity is missing.
    #[error("{0}")]
    NotFound(String),

    /// JSON encoding failed.
    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

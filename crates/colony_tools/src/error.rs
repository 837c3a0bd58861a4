//! Error types for the development tools.

use colony_core::error::CombatError;
use thiserror::Error;

/// Result type alias using [`ToolError`].
pub type Result<T> = std::result::Result<T, ToolError>;

/// Errors reported by the tools.
#[derive(Debug, Error)]
pub enum ToolError {
    /// A file or directory could not be read.
    #[error("Failed to read '{path}': {message}")]
    Io {
        /// Path that failed.
        path: String,
        /// Error message.
        message: String,
    },

    /// Battle or config error from the combat core.
    #[error(transparent)]
    Combat(#[from] CombatError),

    /// Output could not be serialized.
    #[error("Failed to serialize output: {0}")]
    Output(#[from] serde_json::Error),

    /// One or more config files failed validation.
    #[error("{failed} of {checked} config files failed validation")]
    Invalid {
        /// Files checked.
        checked: usize,
        /// Files that failed.
        failed: usize,
    },
}

impl ToolError {
    pub(crate) fn io(path: &std::path::Path, error: &std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            message: error.to_string(),
        }
    }
}

//! Error types for combat resolution and configuration.

use thiserror::Error;

/// Result type alias using [`CombatError`].
pub type Result<T> = std::result::Result<T, CombatError>;

/// Top-level error type for the combat core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CombatError {
    /// Request rejected before any state was touched.
    #[error("Invalid {field}: {message}")]
    Validation {
        /// Name of the offending input field.
        field: String,
        /// Human-readable reason.
        message: String,
    },

    /// Config data file parsing error.
    #[error("Failed to parse config '{path}': {message}")]
    ConfigParse {
        /// Path (or source label) of the config that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Config parsed but its tables are inconsistent.
    #[error("Invalid combat config: {}", .0.join("; "))]
    ConfigInvalid(Vec<String>),
}

impl CombatError {
    /// Build a validation error for a named field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// The offending field, if this is a validation error.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

//! Error types for the attack scheduler and its service facade.

use colony_core::error::CombatError;
use thiserror::Error;

use crate::registry::{AttackId, AttackStatus};

/// Result type alias using [`WarfareError`].
pub type Result<T> = std::result::Result<T, WarfareError>;

/// Top-level error type for the scheduling side.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WarfareError {
    /// Request rejected before any state was touched.
    #[error("Invalid {field}: {message}")]
    Validation {
        /// Name of the offending input field.
        field: String,
        /// Human-readable reason.
        message: String,
    },

    /// A colony, target, or attack does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// What was looked up ("colony", "target", "attack").
        kind: &'static str,
        /// Identifier that was looked up.
        id: u64,
    },

    /// Colony store read or write failed, or timed out.
    #[error("Colony store unavailable: {0}")]
    TransientStore(String),

    /// Could not enumerate AI colonies at startup.
    #[error("Failed to initialize attack scheduling: {0}")]
    SchedulingInit(String),

    /// Attack status may only move from incoming to resolved.
    #[error("Attack {id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Attack whose status was changed.
        id: AttackId,
        /// Current status.
        from: AttackStatus,
        /// Requested status.
        to: AttackStatus,
    },

    /// Config file could not be read, parsed, or validated.
    #[error("Config error: {0}")]
    Config(String),
}

impl WarfareError {
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

impl From<CombatError> for WarfareError {
    fn from(error: CombatError) -> Self {
        match error {
            CombatError::Validation { field, message } => Self::Validation { field, message },
            other @ (CombatError::ConfigParse { .. } | CombatError::ConfigInvalid(_)) => {
                Self::Config(other.to_string())
            }
        }
    }
}

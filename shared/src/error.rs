//! Domain errors for season-plan operations

use thiserror::Error;

/// Errors raised by the scheduling engine and the plan mutations.
///
/// Every operation validates its input completely before touching the plan,
/// so an `Err` always means the plan was left unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The stored document no longer has the shape the engine relies on.
    #[error("Plan integrity violated: {0}")]
    Integrity(String),
}

impl PlanError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        PlanError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for plan operations
pub type PlanResult<T> = Result<T, PlanError>;

//! Error types for alert engine operations.

use database::{AlertStatus, DatabaseError};
use thiserror::Error;

/// Errors that can occur in the alert engine.
///
/// Cooldown suppression and an already-running countdown are not errors; they
/// are reported through [`crate::TriggerReason`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// Unknown alert, device or user.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Dispatch or closure attempted on an alert that no longer allows it.
    #[error("alert {id} is already {status}")]
    AlreadyTerminal { id: String, status: AlertStatus },

    /// Malformed input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Storage failure.
    #[error("database error: {0}")]
    Database(DatabaseError),
}

impl From<DatabaseError> for EngineError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            DatabaseError::Validation(err) => EngineError::Validation(err.to_string()),
            other => EngineError::Database(other),
        }
    }
}

/// Errors raised while loading a danger model.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("failed to read model file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse model: {0}")]
    Json(#[from] serde_json::Error),

    #[error("model expects {expected} weights, found {found}")]
    Shape { expected: usize, found: usize },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

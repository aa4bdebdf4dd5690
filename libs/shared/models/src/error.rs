use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error surface shared by the persistence and directory collaborators.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum AppError {
    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

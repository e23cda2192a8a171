//! Error types for schedule-engine operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    /// Malformed or out-of-range input. Nothing was written.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A write would overlap an existing rule or block.
    #[error("Conflict with {entity} {id}: {message}")]
    Conflict {
        entity: &'static str,
        id: u64,
        message: String,
    },

    /// The id does not exist, or belongs to another tenant.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },

    /// The caller's scope does not cover the requested teacher or resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Expansion error: {0}")]
    Expansion(String),

    /// The backing store failed.
    #[error("Store error: {0}")]
    Store(String),
}

impl ScheduleError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        ScheduleError::InvalidInput(message.into())
    }

    pub(crate) fn not_found(entity: &'static str, id: u64) -> Self {
        ScheduleError::NotFound { entity, id }
    }
}

pub type Result<T> = std::result::Result<T, ScheduleError>;

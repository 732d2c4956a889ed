//! The module contains the errors the engine can return.
//!
//! Every ledger operation resolves to one of five kinds:
//!
//! - [`Validation`] malformed, missing or contradictory input.
//! - [`NotFound`] the referenced entity does not exist or is not visible.
//! - [`Forbidden`] the entity exists but belongs to somebody else.
//! - [`Conflict`] a concurrent update could not be resolved, or the entity is
//!   still referenced and cannot be removed/changed.
//! - [`Integrity`] the storage layer failed mid-operation; nothing was applied.
//!
//!  [`Validation`]: EngineError::Validation
//!  [`NotFound`]: EngineError::NotFound
//!  [`Forbidden`]: EngineError::Forbidden
//!  [`Conflict`]: EngineError::Conflict
//!  [`Integrity`]: EngineError::Integrity
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Integrity error: {0}")]
    Integrity(String),
}

impl EngineError {
    /// Returns `true` if the operation may succeed when attempted again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<DbErr> for EngineError {
    fn from(err: DbErr) -> Self {
        let message = err.to_string();
        if is_contention(&message) {
            Self::Conflict(message)
        } else {
            Self::Integrity(message)
        }
    }
}

/// Lock and serialization failures reported by SQLite/Postgres drivers.
fn is_contention(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("database is locked")
        || lower.contains("database table is locked")
        || lower.contains("busy")
        || lower.contains("deadlock")
        || lower.contains("could not serialize")
}

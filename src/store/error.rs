//! Ledger store error types
//!
//! Every query either succeeds completely or fails with one of these
//! variants. Nothing here is logged and dropped; callers decide.

use thiserror::Error;

/// SQLSTATE codes treated as transient lock conflicts
pub mod sqlstate {
    pub const DEADLOCK_DETECTED: &str = "40P01";
    pub const SERIALIZATION_FAILURE: &str = "40001";
    pub const LOCK_NOT_AVAILABLE: &str = "55P03";
    pub const QUERY_CANCELED: &str = "57014";
    /// Class 23: integrity constraint violation
    pub const INTEGRITY_CLASS: &str = "23";
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Deadlock, serialization failure or lock wait timeout.
    /// The scope has been (or must be) rolled back; retrying is safe.
    #[error("Lock conflict: {0}")]
    Conflict(String),

    #[error("Storage unreachable: {0}")]
    Connectivity(String),

    #[error("Storage error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        StoreError::NotFound { entity, id }
    }

    /// Only lock conflicts are safe to retry from scratch
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }

    /// Map a PostgreSQL SQLSTATE to an error variant
    pub fn from_sqlstate(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            sqlstate::DEADLOCK_DETECTED
            | sqlstate::SERIALIZATION_FAILURE
            | sqlstate::LOCK_NOT_AVAILABLE
            | sqlstate::QUERY_CANCELED => StoreError::Conflict(message),
            c if c.starts_with(sqlstate::INTEGRITY_CLASS) => StoreError::ConstraintViolation(message),
            c => StoreError::Internal(format!("[{}] {}", c, message)),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(db) => match db.code() {
                Some(code) => StoreError::from_sqlstate(&code, db.message()),
                None => StoreError::Internal(db.message().to_string()),
            },
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => StoreError::Connectivity(e.to_string()),
            other => StoreError::Internal(other.to_string()),
        }
    }
}

//! Transfer Error Types
//!
//! Every failure of a transfer attempt, grouped into the four kinds callers
//! act on. Only [`ErrorKind::Transient`] errors may be retried.

use thiserror::Error;

use crate::core_types::{AccountId, Amount};
use crate::store::StoreError;

/// How a caller should react to a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A referenced account does not exist
    NotFound,
    /// The request itself cannot succeed as issued
    DomainInvalid,
    /// Rolled back with no effect; a fresh attempt may succeed
    Transient,
    /// Storage failure; retry policy is up to the caller
    Fatal,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    // === Domain Errors ===
    #[error("Invalid transfer amount: {0}")]
    InvalidAmount(Amount),

    #[error("Source and destination account cannot be the same")]
    SameAccount,

    #[error("Currency mismatch on account {account_id}: expected {expected}, got {actual}")]
    CurrencyMismatch {
        account_id: AccountId,
        expected: String,
        actual: String,
    },

    #[error("Insufficient funds in account {account_id}: balance {balance}, requested {amount}")]
    InsufficientFunds {
        account_id: AccountId,
        balance: Amount,
        amount: Amount,
    },

    // === Not Found ===
    #[error("Source account not found: {0}")]
    SourceAccountNotFound(AccountId),

    #[error("Destination account not found: {0}")]
    DestinationAccountNotFound(AccountId),

    // === Transient ===
    #[error("Lock conflict: {0}")]
    Conflict(String),

    #[error("Transfer attempt timed out after {0}ms")]
    Timeout(u64),

    // === Fatal ===
    #[error("Storage unreachable: {0}")]
    Connectivity(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl TransferError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransferError::SourceAccountNotFound(_) | TransferError::DestinationAccountNotFound(_) => {
                ErrorKind::NotFound
            }
            TransferError::InvalidAmount(_)
            | TransferError::SameAccount
            | TransferError::CurrencyMismatch { .. }
            | TransferError::InsufficientFunds { .. } => ErrorKind::DomainInvalid,
            TransferError::Conflict(_) | TransferError::Timeout(_) => ErrorKind::Transient,
            TransferError::Connectivity(_) | TransferError::Storage(_) => ErrorKind::Fatal,
        }
    }

    #[inline]
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::InvalidAmount(_) => "INVALID_AMOUNT",
            TransferError::SameAccount => "SAME_ACCOUNT",
            TransferError::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            TransferError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            TransferError::SourceAccountNotFound(_) => "SOURCE_ACCOUNT_NOT_FOUND",
            TransferError::DestinationAccountNotFound(_) => "DESTINATION_ACCOUNT_NOT_FOUND",
            TransferError::Conflict(_) => "LOCK_CONFLICT",
            TransferError::Timeout(_) => "TIMEOUT",
            TransferError::Connectivity(_) => "SERVICE_UNAVAILABLE",
            TransferError::Storage(_) => "DATABASE_ERROR",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            TransferError::InvalidAmount(_)
            | TransferError::SameAccount
            | TransferError::CurrencyMismatch { .. } => 400,
            TransferError::SourceAccountNotFound(_) | TransferError::DestinationAccountNotFound(_) => {
                404
            }
            TransferError::Conflict(_) => 409,
            TransferError::InsufficientFunds { .. } => 422,
            TransferError::Storage(_) => 500,
            TransferError::Connectivity(_) => 503,
            TransferError::Timeout(_) => 504,
        }
    }
}

impl From<StoreError> for TransferError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(msg) => TransferError::Conflict(msg),
            StoreError::Connectivity(msg) => TransferError::Connectivity(msg),
            other => TransferError::Storage(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(TransferError::SameAccount.code(), "SAME_ACCOUNT");
        assert_eq!(
            TransferError::InsufficientFunds {
                account_id: 1,
                balance: 0,
                amount: 10
            }
            .code(),
            "INSUFFICIENT_FUNDS"
        );
        assert_eq!(TransferError::Timeout(100).code(), "TIMEOUT");
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            TransferError::SourceAccountNotFound(1).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(TransferError::InvalidAmount(0).kind(), ErrorKind::DomainInvalid);
        assert_eq!(
            TransferError::Conflict("deadlock".into()).kind(),
            ErrorKind::Transient
        );
        assert_eq!(
            TransferError::Connectivity("down".into()).kind(),
            ErrorKind::Fatal
        );
    }

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(TransferError::Conflict("x".into()).is_retryable());
        assert!(TransferError::Timeout(10).is_retryable());

        assert!(!TransferError::SameAccount.is_retryable());
        assert!(!TransferError::DestinationAccountNotFound(2).is_retryable());
        assert!(
            !TransferError::CurrencyMismatch {
                account_id: 2,
                expected: "USD".into(),
                actual: "EUR".into()
            }
            .is_retryable()
        );
        assert!(!TransferError::Connectivity("x".into()).is_retryable());
        assert!(!TransferError::Storage("x".into()).is_retryable());
    }

    #[test]
    fn test_http_status() {
        assert_eq!(TransferError::InvalidAmount(-1).http_status(), 400);
        assert_eq!(TransferError::SourceAccountNotFound(9).http_status(), 404);
        assert_eq!(TransferError::Conflict("x".into()).http_status(), 409);
        assert_eq!(
            TransferError::InsufficientFunds {
                account_id: 1,
                balance: 5,
                amount: 10
            }
            .http_status(),
            422
        );
        assert_eq!(TransferError::Connectivity("x".into()).http_status(), 503);
        assert_eq!(TransferError::Timeout(1).http_status(), 504);
    }

    #[test]
    fn test_from_store_error() {
        assert_eq!(
            TransferError::from(StoreError::Conflict("40P01".into())),
            TransferError::Conflict("40P01".into())
        );
        assert!(matches!(
            TransferError::from(StoreError::Connectivity("io".into())),
            TransferError::Connectivity(_)
        ));
        assert!(matches!(
            TransferError::from(StoreError::ConstraintViolation("fk".into())),
            TransferError::Storage(_)
        ));
    }

    #[test]
    fn test_display() {
        let err = TransferError::InsufficientFunds {
            account_id: 3,
            balance: 100,
            amount: 1000,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds in account 3: balance 100, requested 1000"
        );
    }
}

//! Wallet error types.

use thiserror::Error;
use uuid::Uuid;

/// Wallet errors
#[derive(Debug, Error)]
pub enum WalletError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Amount is zero or negative
    #[error("Invalid amount: {0}. Amount must be a positive integer")]
    InvalidAmount(i64),

    /// Amount is not an integer
    #[error("Invalid amount format: {0:?}. Amount must be an integer")]
    InvalidAmountFormat(String),

    /// Amount does not fit the supported integer range
    #[error("Amount out of range: {0}. Maximum supported amount is {max}", max = i64::MAX)]
    AmountOutOfRange(String),

    /// Operation type other than DEPOSIT or WITHDRAW
    #[error("Unknown operation type: {0:?}. Expected DEPOSIT or WITHDRAW")]
    UnknownOperationType(String),

    /// Deposit would push the balance past the supported range
    #[error("Balance overflow: resulting balance exceeds {max}", max = i64::MAX)]
    BalanceOverflow,

    /// Insufficient balance
    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: i64, required: i64 },

    /// Wallet not found
    #[error("Wallet not found: {0}")]
    WalletNotFound(Uuid),

    /// Wallet still referenced by operations
    #[error("Wallet {0} has operations and cannot be deleted")]
    WalletHasOperations(Uuid),

    /// Transaction failed
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
}

/// Broad class of a [`WalletError`], used to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected input or a balance rule violation; nothing was written
    Validation,
    /// The referenced wallet does not exist
    NotFound,
    /// The request conflicts with stored state
    Conflict,
    /// Storage or transaction failure
    Internal,
}

impl WalletError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            WalletError::InvalidAmount(_)
            | WalletError::InvalidAmountFormat(_)
            | WalletError::AmountOutOfRange(_)
            | WalletError::UnknownOperationType(_)
            | WalletError::BalanceOverflow
            | WalletError::InsufficientBalance { .. } => ErrorKind::Validation,
            WalletError::WalletNotFound(_) => ErrorKind::NotFound,
            WalletError::WalletHasOperations(_) => ErrorKind::Conflict,
            WalletError::Database(_) | WalletError::TransactionFailed(_) => ErrorKind::Internal,
        }
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Database and transaction errors are sanitized to prevent information
    /// disclosure about the internal system structure.
    pub fn client_message(&self) -> String {
        match self {
            WalletError::Database(_) | WalletError::TransactionFailed(_) => {
                "Internal server error".to_string()
            }
            WalletError::InsufficientBalance { .. } => {
                "Insufficient funds on the balance to perform the operation".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Result type for wallet operations
pub type WalletResult<T> = Result<T, WalletError>;

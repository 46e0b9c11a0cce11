//! Wallet data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use super::errors::WalletError;

/// Wallet model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Internal sequential identifier
    pub id: i64,
    /// External identifier handed out to clients
    pub uuid: Uuid,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Kind of balance mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    Deposit,
    Withdraw,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Deposit => "DEPOSIT",
            OperationType::Withdraw => "WITHDRAW",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEPOSIT" => Ok(OperationType::Deposit),
            "WITHDRAW" => Ok(OperationType::Withdraw),
            other => Err(WalletError::UnknownOperationType(other.to_string())),
        }
    }
}

/// Immutable record of one committed balance mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub id: i64,
    pub operation_type: OperationType,
    pub amount: i64,
    /// External identifier of the owning wallet
    pub wallet: Uuid,
    #[serde(skip)]
    pub wallet_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Operation record about to be written inside a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOperation {
    pub wallet_id: i64,
    pub wallet_uuid: Uuid,
    pub operation_type: OperationType,
    pub amount: i64,
}

/// Raw operation request as received from a caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRequest {
    pub operation_type: String,
    pub amount: i64,
}

impl OperationRequest {
    pub fn new(operation_type: impl Into<String>, amount: i64) -> Self {
        Self {
            operation_type: operation_type.into(),
            amount,
        }
    }

    pub fn deposit(amount: i64) -> Self {
        Self::new(OperationType::Deposit.as_str(), amount)
    }

    pub fn withdraw(amount: i64) -> Self {
        Self::new(OperationType::Withdraw.as_str(), amount)
    }
}

/// Operation request that passed input validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedOperation {
    pub operation_type: OperationType,
    pub amount: i64,
}

//! Storage abstraction for wallet balances and the operation log.
//!
//! A [`WalletStore`] hands out explicit [`WalletTransaction`] scopes. All
//! balance mutations happen inside one: lock the wallet row, write the new
//! balance and the operation record, then commit or roll back. Dropping a
//! transaction without committing rolls it back and releases the row lock.

use async_trait::async_trait;
use uuid::Uuid;

use super::{
    errors::WalletResult,
    models::{NewOperation, Operation, Wallet},
};

/// Durable keyed storage for wallets
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Open a new transaction scope
    async fn begin(&self) -> WalletResult<Box<dyn WalletTransaction>>;

    /// Create a wallet with a fresh external identifier and a zero balance
    async fn create_wallet(&self) -> WalletResult<Wallet>;

    /// Get the committed state of a wallet
    async fn get_wallet(&self, wallet: Uuid) -> WalletResult<Wallet>;

    /// Get the committed operations of a wallet, oldest first
    async fn list_operations(&self, wallet: Uuid) -> WalletResult<Vec<Operation>>;

    /// Delete a wallet that has no operations
    ///
    /// # Errors
    ///
    /// * `WalletError::WalletNotFound` - no such wallet
    /// * `WalletError::WalletHasOperations` - operations still reference it
    async fn delete_wallet(&self, wallet: Uuid) -> WalletResult<()>;

    /// Check that the backing storage is reachable
    async fn health_check(&self) -> WalletResult<()>;
}

/// An open transaction holding at most one wallet row lock
#[async_trait]
pub trait WalletTransaction: Send {
    /// Acquire an exclusive lock on the wallet and return its balance snapshot
    ///
    /// Blocks while another transaction holds the lock on the same wallet.
    ///
    /// # Errors
    ///
    /// * `WalletError::WalletNotFound` - no such wallet
    async fn lock_for_update(&mut self, wallet: Uuid) -> WalletResult<Wallet>;

    /// Write the wallet's balance; the wallet must be locked by this transaction
    async fn persist(&mut self, wallet: &Wallet) -> WalletResult<()>;

    /// Append an operation record
    async fn record_operation(&mut self, operation: NewOperation) -> WalletResult<Operation>;

    /// Make all writes visible and release the lock
    async fn commit(self: Box<Self>) -> WalletResult<()>;

    /// Discard all writes and release the lock
    async fn rollback(self: Box<Self>) -> WalletResult<()>;
}

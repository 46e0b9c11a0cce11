//! Operation processor: applies one deposit or withdrawal end to end.

use std::{fmt, sync::Arc};

use uuid::Uuid;

use super::{
    errors::WalletResult,
    models::{NewOperation, Operation, OperationRequest, ValidatedOperation, Wallet},
    store::{WalletStore, WalletTransaction},
    validation,
};

/// Step a request has reached inside [`OperationProcessor::process`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStage {
    Received,
    Validating,
    Locking,
    Applying,
    Committed,
}

impl fmt::Display for ProcessStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessStage::Received => "received",
            ProcessStage::Validating => "validating",
            ProcessStage::Locking => "locking",
            ProcessStage::Applying => "applying",
            ProcessStage::Committed => "committed",
        };
        f.write_str(name)
    }
}

/// Applies balance operations through a [`WalletStore`]
#[derive(Clone)]
pub struct OperationProcessor {
    store: Arc<dyn WalletStore>,
}

impl OperationProcessor {
    /// Create a new processor
    ///
    /// # Arguments
    ///
    /// * `store` - Wallet storage backend
    pub fn new(store: Arc<dyn WalletStore>) -> Self {
        Self { store }
    }

    /// Get the underlying store
    pub fn store(&self) -> &Arc<dyn WalletStore> {
        &self.store
    }

    /// Apply one operation to a wallet
    ///
    /// The request is validated before any storage access. The wallet row is
    /// then locked, the new balance computed, and the operation record and the
    /// balance written in one transaction. Any failure after the transaction
    /// is opened rolls it back before returning, so either both writes become
    /// visible or neither does.
    ///
    /// # Arguments
    ///
    /// * `wallet` - External wallet identifier
    /// * `request` - Operation type and amount
    ///
    /// # Returns
    ///
    /// * `WalletResult<Operation>` - The committed operation record
    ///
    /// # Errors
    ///
    /// * `WalletError::InvalidAmount` / `WalletError::UnknownOperationType` - bad input
    /// * `WalletError::WalletNotFound` - no such wallet
    /// * `WalletError::InsufficientBalance` - withdrawal exceeds the balance
    /// * `WalletError::BalanceOverflow` - deposit exceeds the supported range
    /// * `WalletError::Database` / `WalletError::TransactionFailed` - storage failure
    pub async fn process(
        &self,
        wallet: Uuid,
        request: &OperationRequest,
    ) -> WalletResult<Operation> {
        let mut stage = ProcessStage::Received;
        log::debug!("Operation {request:?} on wallet {wallet}: {stage}");

        stage = ProcessStage::Validating;
        let operation = validation::validate(request).inspect_err(|e| {
            log::debug!("Operation on wallet {wallet} failed while {stage}: {e}");
        })?;

        let mut tx = self.store.begin().await?;
        match Self::apply(&mut tx, wallet, operation, &mut stage).await {
            Ok(record) => {
                tx.commit().await?;
                stage = ProcessStage::Committed;
                log::debug!("Operation {} on wallet {wallet}: {stage}", record.id);
                log::info!(
                    "Committed {} of {} on wallet {} (operation {})",
                    record.operation_type,
                    record.amount,
                    wallet,
                    record.id
                );
                Ok(record)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    log::error!("Rollback failed for wallet {wallet}: {rollback_err}");
                }
                log::debug!("Operation on wallet {wallet} failed while {stage}: {e}");
                Err(e)
            }
        }
    }

    async fn apply(
        tx: &mut Box<dyn WalletTransaction>,
        wallet: Uuid,
        operation: ValidatedOperation,
        stage: &mut ProcessStage,
    ) -> WalletResult<Operation> {
        *stage = ProcessStage::Locking;
        let mut locked = tx.lock_for_update(wallet).await?;

        *stage = ProcessStage::Applying;
        locked.balance = validation::apply_operation(locked.balance, &operation)?;

        let record = tx
            .record_operation(NewOperation {
                wallet_id: locked.id,
                wallet_uuid: locked.uuid,
                operation_type: operation.operation_type,
                amount: operation.amount,
            })
            .await?;
        tx.persist(&locked).await?;

        Ok(record)
    }

    /// Create a wallet with a zero balance
    pub async fn create_wallet(&self) -> WalletResult<Wallet> {
        let wallet = self.store.create_wallet().await?;
        log::info!("Created wallet {}", wallet.uuid);
        Ok(wallet)
    }

    /// Get a wallet by its external identifier
    pub async fn get_wallet(&self, wallet: Uuid) -> WalletResult<Wallet> {
        self.store.get_wallet(wallet).await
    }

    /// Get the committed operations of a wallet, oldest first
    pub async fn list_operations(&self, wallet: Uuid) -> WalletResult<Vec<Operation>> {
        self.store.list_operations(wallet).await
    }

    /// Delete a wallet that has no operations
    pub async fn delete_wallet(&self, wallet: Uuid) -> WalletResult<()> {
        self.store.delete_wallet(wallet).await?;
        log::info!("Deleted wallet {wallet}");
        Ok(())
    }
}

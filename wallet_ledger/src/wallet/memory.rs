//! In-memory wallet store.
//!
//! Each wallet sits behind its own `tokio::sync::Mutex` together with its
//! operation log; holding the owned guard is the row lock. Writes are staged
//! on the transaction and applied only on commit, while the guard is still
//! held. Wallets share only the wallet map and the id counters. Tokio
//! mutexes hand the lock out in FIFO order, so waiters on a busy wallet are
//! served in arrival order.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicI64, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use super::{
    errors::{WalletError, WalletResult},
    models::{NewOperation, Operation, Wallet},
    store::{WalletStore, WalletTransaction},
};

#[derive(Debug)]
struct WalletSlot {
    wallet: Wallet,
    operations: Vec<Operation>,
    deleted: bool,
}

#[derive(Debug, Default)]
struct Inner {
    wallets: RwLock<HashMap<Uuid, Arc<Mutex<WalletSlot>>>>,
    operation_count: AtomicUsize,
    next_wallet_id: AtomicI64,
    next_operation_id: AtomicI64,
}

impl Inner {
    async fn slot(&self, wallet: Uuid) -> WalletResult<Arc<Mutex<WalletSlot>>> {
        self.wallets
            .read()
            .await
            .get(&wallet)
            .cloned()
            .ok_or(WalletError::WalletNotFound(wallet))
    }
}

/// Wallet store kept entirely in process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryWalletStore {
    inner: Arc<Inner>,
}

impl InMemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed operations across all wallets
    pub fn operation_count(&self) -> usize {
        self.inner.operation_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletStore for InMemoryWalletStore {
    async fn begin(&self) -> WalletResult<Box<dyn WalletTransaction>> {
        Ok(Box::new(InMemoryTransaction {
            inner: self.inner.clone(),
            locked: None,
            staged_balance: None,
            staged_operations: Vec::new(),
        }))
    }

    async fn create_wallet(&self) -> WalletResult<Wallet> {
        let now = Utc::now();
        let wallet = Wallet {
            id: self.inner.next_wallet_id.fetch_add(1, Ordering::SeqCst) + 1,
            uuid: Uuid::new_v4(),
            balance: 0,
            created_at: now,
            updated_at: now,
        };

        let slot = WalletSlot {
            wallet: wallet.clone(),
            operations: Vec::new(),
            deleted: false,
        };
        self.inner
            .wallets
            .write()
            .await
            .insert(wallet.uuid, Arc::new(Mutex::new(slot)));

        log::debug!("Created wallet {} (id {})", wallet.uuid, wallet.id);
        Ok(wallet)
    }

    async fn get_wallet(&self, wallet: Uuid) -> WalletResult<Wallet> {
        let slot = self.inner.slot(wallet).await?;
        let slot = slot.lock().await;
        if slot.deleted {
            return Err(WalletError::WalletNotFound(wallet));
        }
        Ok(slot.wallet.clone())
    }

    async fn list_operations(&self, wallet: Uuid) -> WalletResult<Vec<Operation>> {
        let slot = self.inner.slot(wallet).await?;
        let slot = slot.lock().await;
        if slot.deleted {
            return Err(WalletError::WalletNotFound(wallet));
        }
        Ok(slot.operations.clone())
    }

    async fn delete_wallet(&self, wallet: Uuid) -> WalletResult<()> {
        let slot = self.inner.slot(wallet).await?;
        let mut slot = slot.lock().await;
        if slot.deleted {
            return Err(WalletError::WalletNotFound(wallet));
        }

        if !slot.operations.is_empty() {
            return Err(WalletError::WalletHasOperations(wallet));
        }

        // Waiters that already cloned the slot see the flag once they get the lock
        slot.deleted = true;
        self.inner.wallets.write().await.remove(&wallet);
        log::debug!("Deleted wallet {wallet}");
        Ok(())
    }

    async fn health_check(&self) -> WalletResult<()> {
        Ok(())
    }
}

/// Transaction over an [`InMemoryWalletStore`]
pub struct InMemoryTransaction {
    inner: Arc<Inner>,
    locked: Option<OwnedMutexGuard<WalletSlot>>,
    staged_balance: Option<i64>,
    staged_operations: Vec<Operation>,
}

impl InMemoryTransaction {
    fn locked_slot(&self, wallet: Uuid) -> WalletResult<&OwnedMutexGuard<WalletSlot>> {
        self.locked
            .as_ref()
            .filter(|slot| slot.wallet.uuid == wallet)
            .ok_or_else(|| {
                WalletError::TransactionFailed(format!(
                    "wallet {wallet} is not locked by this transaction"
                ))
            })
    }
}

#[async_trait]
impl WalletTransaction for InMemoryTransaction {
    async fn lock_for_update(&mut self, wallet: Uuid) -> WalletResult<Wallet> {
        if let Some(slot) = &self.locked {
            if slot.wallet.uuid != wallet {
                return Err(WalletError::TransactionFailed(format!(
                    "transaction already holds the lock on wallet {}",
                    slot.wallet.uuid
                )));
            }
            let mut snapshot = slot.wallet.clone();
            if let Some(balance) = self.staged_balance {
                snapshot.balance = balance;
            }
            return Ok(snapshot);
        }

        let slot = self.inner.slot(wallet).await?.lock_owned().await;
        if slot.deleted {
            return Err(WalletError::WalletNotFound(wallet));
        }

        let snapshot = slot.wallet.clone();
        self.locked = Some(slot);
        Ok(snapshot)
    }

    async fn persist(&mut self, wallet: &Wallet) -> WalletResult<()> {
        self.locked_slot(wallet.uuid)?;
        if wallet.balance < 0 {
            return Err(WalletError::TransactionFailed(format!(
                "balance of wallet {} must not be negative",
                wallet.uuid
            )));
        }
        self.staged_balance = Some(wallet.balance);
        Ok(())
    }

    async fn record_operation(&mut self, operation: NewOperation) -> WalletResult<Operation> {
        let slot = self.locked_slot(operation.wallet_uuid)?;
        if slot.wallet.id != operation.wallet_id {
            return Err(WalletError::TransactionFailed(format!(
                "operation references wallet id {} but {} is locked",
                operation.wallet_id, slot.wallet.id
            )));
        }
        if operation.amount < 1 {
            return Err(WalletError::InvalidAmount(operation.amount));
        }

        let record = Operation {
            id: self.inner.next_operation_id.fetch_add(1, Ordering::SeqCst) + 1,
            operation_type: operation.operation_type,
            amount: operation.amount,
            wallet: operation.wallet_uuid,
            wallet_id: operation.wallet_id,
            created_at: Utc::now(),
        };
        self.staged_operations.push(record.clone());
        Ok(record)
    }

    async fn commit(self: Box<Self>) -> WalletResult<()> {
        let mut this = *self;
        let Some(mut slot) = this.locked.take() else {
            return Ok(());
        };

        if let Some(balance) = this.staged_balance {
            slot.wallet.balance = balance;
            slot.wallet.updated_at = Utc::now();
        }
        if !this.staged_operations.is_empty() {
            this.inner
                .operation_count
                .fetch_add(this.staged_operations.len(), Ordering::SeqCst);
            slot.operations.append(&mut this.staged_operations);
        }

        drop(slot);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> WalletResult<()> {
        if let Some(slot) = &self.locked {
            log::debug!("Rolling back transaction on wallet {}", slot.wallet.uuid);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::models::OperationType;
    use std::time::Duration;

    fn deposit(wallet: &Wallet, amount: i64) -> NewOperation {
        NewOperation {
            wallet_id: wallet.id,
            wallet_uuid: wallet.uuid,
            operation_type: OperationType::Deposit,
            amount,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_wallet() {
        let store = InMemoryWalletStore::new();
        let first = store.create_wallet().await.unwrap();
        let second = store.create_wallet().await.unwrap();

        assert_eq!(first.balance, 0);
        assert_ne!(first.uuid, second.uuid);
        assert!(second.id > first.id);
        assert_eq!(store.get_wallet(first.uuid).await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_lock_unknown_wallet() {
        let store = InMemoryWalletStore::new();
        let mut tx = store.begin().await.unwrap();
        let missing = Uuid::new_v4();
        let err = tx.lock_for_update(missing).await.unwrap_err();
        assert!(matches!(err, WalletError::WalletNotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn test_commit_applies_staged_writes() {
        let store = InMemoryWalletStore::new();
        let wallet = store.create_wallet().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let mut locked = tx.lock_for_update(wallet.uuid).await.unwrap();
        locked.balance = 250;
        tx.record_operation(deposit(&locked, 250)).await.unwrap();
        tx.persist(&locked).await.unwrap();

        // Nothing is visible before commit
        assert_eq!(store.operation_count(), 0);

        tx.commit().await.unwrap();
        assert_eq!(store.get_wallet(wallet.uuid).await.unwrap().balance, 250);
        assert_eq!(store.list_operations(wallet.uuid).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let store = InMemoryWalletStore::new();
        let wallet = store.create_wallet().await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            let mut locked = tx.lock_for_update(wallet.uuid).await.unwrap();
            locked.balance = 99;
            tx.record_operation(deposit(&locked, 99)).await.unwrap();
            tx.persist(&locked).await.unwrap();
        }

        assert_eq!(store.get_wallet(wallet.uuid).await.unwrap().balance, 0);
        assert_eq!(store.operation_count(), 0);
    }

    #[tokio::test]
    async fn test_lock_blocks_second_transaction() {
        let store = InMemoryWalletStore::new();
        let wallet = store.create_wallet().await.unwrap();

        let mut first = store.begin().await.unwrap();
        first.lock_for_update(wallet.uuid).await.unwrap();

        let contender = store.clone();
        let uuid = wallet.uuid;
        let waiter = tokio::spawn(async move {
            let mut second = contender.begin().await.unwrap();
            second.lock_for_update(uuid).await.unwrap()
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished(), "second lock must wait for the first");

        let mut locked = first.lock_for_update(wallet.uuid).await.unwrap();
        locked.balance = 5;
        first.persist(&locked).await.unwrap();
        first.commit().await.unwrap();

        let seen = waiter.await.unwrap();
        assert_eq!(seen.balance, 5);
    }

    #[tokio::test]
    async fn test_single_wallet_lock_per_transaction() {
        let store = InMemoryWalletStore::new();
        let a = store.create_wallet().await.unwrap();
        let b = store.create_wallet().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.lock_for_update(a.uuid).await.unwrap();
        let err = tx.lock_for_update(b.uuid).await.unwrap_err();
        assert!(matches!(err, WalletError::TransactionFailed(_)));
    }

    #[tokio::test]
    async fn test_persist_requires_lock() {
        let store = InMemoryWalletStore::new();
        let wallet = store.create_wallet().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let err = tx.persist(&wallet).await.unwrap_err();
        assert!(matches!(err, WalletError::TransactionFailed(_)));
    }

    #[tokio::test]
    async fn test_delete_wallet_protected_by_operations() {
        let store = InMemoryWalletStore::new();
        let used = store.create_wallet().await.unwrap();
        let unused = store.create_wallet().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let mut locked = tx.lock_for_update(used.uuid).await.unwrap();
        locked.balance = 1;
        tx.record_operation(deposit(&locked, 1)).await.unwrap();
        tx.persist(&locked).await.unwrap();
        tx.commit().await.unwrap();

        let err = store.delete_wallet(used.uuid).await.unwrap_err();
        assert!(matches!(err, WalletError::WalletHasOperations(_)));
        assert!(store.get_wallet(used.uuid).await.is_ok());

        store.delete_wallet(unused.uuid).await.unwrap();
        assert!(matches!(
            store.get_wallet(unused.uuid).await,
            Err(WalletError::WalletNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_operation_logs_are_per_wallet() {
        let store = InMemoryWalletStore::new();
        let busy = store.create_wallet().await.unwrap();
        let other = store.create_wallet().await.unwrap();
        let spare = store.create_wallet().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let mut locked = tx.lock_for_update(other.uuid).await.unwrap();
        locked.balance = 3;
        tx.record_operation(deposit(&locked, 3)).await.unwrap();
        tx.persist(&locked).await.unwrap();
        tx.commit().await.unwrap();

        // Keep the busy wallet locked with a staged write
        let mut held = store.begin().await.unwrap();
        let mut busy_locked = held.lock_for_update(busy.uuid).await.unwrap();
        busy_locked.balance = 5;
        held.record_operation(deposit(&busy_locked, 5)).await.unwrap();

        let unrelated = async {
            let ops = store.list_operations(other.uuid).await.unwrap();
            store.delete_wallet(spare.uuid).await.unwrap();

            let mut tx = store.begin().await.unwrap();
            let mut locked = tx.lock_for_update(other.uuid).await.unwrap();
            locked.balance = 4;
            tx.record_operation(deposit(&locked, 1)).await.unwrap();
            tx.persist(&locked).await.unwrap();
            tx.commit().await.unwrap();
            ops
        };
        let ops = tokio::time::timeout(Duration::from_secs(1), unrelated)
            .await
            .expect("unrelated wallet was blocked");

        assert_eq!(ops.len(), 1);
        assert!(ops.iter().all(|op| op.wallet == other.uuid));
        assert_eq!(store.operation_count(), 2);

        held.rollback().await.unwrap();
        assert!(store.list_operations(busy.uuid).await.unwrap().is_empty());
        assert_eq!(store.list_operations(other.uuid).await.unwrap().len(), 2);
    }
}

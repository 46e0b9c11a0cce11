//! PostgreSQL wallet store.
//!
//! Row locks are taken with `SELECT ... FOR UPDATE`, so concurrent
//! transactions on the same wallet queue inside PostgreSQL while unrelated
//! wallets proceed in parallel. Dropping an uncommitted `sqlx::Transaction`
//! rolls it back.
#![allow(clippy::needless_raw_string_hashes)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use super::{
    errors::{WalletError, WalletResult},
    models::{NewOperation, Operation, Wallet},
    store::{WalletStore, WalletTransaction},
};

fn wallet_from_row(row: &PgRow) -> Wallet {
    Wallet {
        id: row.get("id"),
        uuid: row.get("uuid"),
        balance: row.get("balance"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
        updated_at: row.get::<DateTime<Utc>, _>("updated_at"),
    }
}

fn operation_from_row(row: &PgRow, wallet: Uuid) -> WalletResult<Operation> {
    Ok(Operation {
        id: row.get("id"),
        operation_type: row.get::<String, _>("operation_type").parse()?,
        amount: row.get("amount"),
        wallet,
        wallet_id: row.get("wallet_id"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    })
}

/// Wallet store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgWalletStore {
    pool: Arc<PgPool>,
}

impl PgWalletStore {
    /// Create a new store over an existing pool
    ///
    /// The schema from the crate's `migrations/` directory must be applied,
    /// see [`crate::db::Database::migrate`].
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WalletStore for PgWalletStore {
    async fn begin(&self) -> WalletResult<Box<dyn WalletTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgWalletTransaction { tx, locked: None }))
    }

    async fn create_wallet(&self) -> WalletResult<Wallet> {
        let row = sqlx::query(
            r#"
            INSERT INTO wallets (uuid)
            VALUES ($1)
            RETURNING id, uuid, balance, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .fetch_one(self.pool.as_ref())
        .await?;

        let wallet = wallet_from_row(&row);
        log::debug!("Created wallet {} (id {})", wallet.uuid, wallet.id);
        Ok(wallet)
    }

    async fn get_wallet(&self, wallet: Uuid) -> WalletResult<Wallet> {
        let row = sqlx::query(
            r#"
            SELECT id, uuid, balance, created_at, updated_at
            FROM wallets
            WHERE uuid = $1
            "#,
        )
        .bind(wallet)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(WalletError::WalletNotFound(wallet))?;

        Ok(wallet_from_row(&row))
    }

    async fn list_operations(&self, wallet: Uuid) -> WalletResult<Vec<Operation>> {
        let owner = self.get_wallet(wallet).await?;

        let rows = sqlx::query(
            r#"
            SELECT id, wallet_id, operation_type, amount, created_at
            FROM operations
            WHERE wallet_id = $1
            ORDER BY id
            "#,
        )
        .bind(owner.id)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.iter()
            .map(|row| operation_from_row(row, owner.uuid))
            .collect()
    }

    async fn delete_wallet(&self, wallet: Uuid) -> WalletResult<()> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT id FROM wallets WHERE uuid = $1 FOR UPDATE")
            .bind(wallet)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(WalletError::WalletNotFound(wallet))?;
        let wallet_id: i64 = row.get("id");

        let result = sqlx::query("DELETE FROM wallets WHERE id = $1")
            .bind(wallet_id)
            .execute(&mut *tx)
            .await;

        match result {
            Ok(_) => {}
            // ON DELETE RESTRICT on operations.wallet_id
            Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
                return Err(WalletError::WalletHasOperations(wallet));
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit().await?;
        log::debug!("Deleted wallet {wallet}");
        Ok(())
    }

    async fn health_check(&self) -> WalletResult<()> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }
}

/// Transaction over a [`PgWalletStore`]
pub struct PgWalletTransaction {
    tx: Transaction<'static, Postgres>,
    locked: Option<Uuid>,
}

impl PgWalletTransaction {
    fn ensure_locked(&self, wallet: Uuid) -> WalletResult<()> {
        if self.locked == Some(wallet) {
            Ok(())
        } else {
            Err(WalletError::TransactionFailed(format!(
                "wallet {wallet} is not locked by this transaction"
            )))
        }
    }
}

#[async_trait]
impl WalletTransaction for PgWalletTransaction {
    async fn lock_for_update(&mut self, wallet: Uuid) -> WalletResult<Wallet> {
        if let Some(held) = self.locked.filter(|held| *held != wallet) {
            return Err(WalletError::TransactionFailed(format!(
                "transaction already holds the lock on wallet {held}"
            )));
        }

        let row = sqlx::query(
            r#"
            SELECT id, uuid, balance, created_at, updated_at
            FROM wallets
            WHERE uuid = $1
            FOR UPDATE
            "#,
        )
        .bind(wallet)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or(WalletError::WalletNotFound(wallet))?;

        self.locked = Some(wallet);
        Ok(wallet_from_row(&row))
    }

    async fn persist(&mut self, wallet: &Wallet) -> WalletResult<()> {
        self.ensure_locked(wallet.uuid)?;

        let result = sqlx::query("UPDATE wallets SET balance = $1, updated_at = NOW() WHERE id = $2")
            .bind(wallet.balance)
            .bind(wallet.id)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() != 1 {
            return Err(WalletError::TransactionFailed(format!(
                "expected to update wallet {}, updated {} rows",
                wallet.uuid,
                result.rows_affected()
            )));
        }
        Ok(())
    }

    async fn record_operation(&mut self, operation: NewOperation) -> WalletResult<Operation> {
        self.ensure_locked(operation.wallet_uuid)?;

        let row = sqlx::query(
            r#"
            INSERT INTO operations (wallet_id, operation_type, amount)
            VALUES ($1, $2, $3)
            RETURNING id, wallet_id, operation_type, amount, created_at
            "#,
        )
        .bind(operation.wallet_id)
        .bind(operation.operation_type.as_str())
        .bind(operation.amount)
        .fetch_one(&mut *self.tx)
        .await?;

        operation_from_row(&row, operation.wallet_uuid)
    }

    async fn commit(self: Box<Self>) -> WalletResult<()> {
        let this = *self;
        this.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> WalletResult<()> {
        let this = *self;
        this.tx.rollback().await?;
        Ok(())
    }
}

//! # Wallet Ledger
//!
//! Per-wallet balances with an append-only log of deposit and withdrawal
//! operations.
//!
//! Every operation runs inside an explicit transaction that holds an
//! exclusive lock on exactly one wallet row: the balance is read under the
//! lock, the new balance is computed, and the operation record and the
//! balance are committed together. Operations on the same wallet therefore
//! apply one at a time, while different wallets proceed in parallel. A
//! balance never goes negative.
//!
//! ## Core Modules
//!
//! - [`wallet`]: models, validation, storage backends, and the operation processor
//! - [`db`]: PostgreSQL pool, configuration, and migrations

/// PostgreSQL connection pooling and schema migrations.
pub mod db;

/// Wallets, operations, and the balance-mutation protocol.
pub mod wallet;

pub use wallet::{
    InMemoryWalletStore, Operation, OperationProcessor, OperationRequest, OperationType,
    PgWalletStore, Wallet, WalletError, WalletResult, WalletStore,
};

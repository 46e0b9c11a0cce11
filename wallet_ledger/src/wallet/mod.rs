//! Wallet module: balances, the operation log, and the row-locked
//! deposit/withdrawal protocol.
//!
//! This module implements:
//! - Wallet and operation models with input validation
//! - The [`WalletStore`] / [`WalletTransaction`] storage seam
//! - PostgreSQL (`SELECT ... FOR UPDATE`) and in-memory (per-wallet mutex) stores
//! - [`OperationProcessor`], which applies one operation atomically
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use wallet_ledger::wallet::{InMemoryWalletStore, OperationProcessor, OperationRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let processor = OperationProcessor::new(Arc::new(InMemoryWalletStore::new()));
//!     let wallet = processor.create_wallet().await?;
//!
//!     processor
//!         .process(wallet.uuid, &OperationRequest::deposit(1000))
//!         .await?;
//!     let wallet = processor.get_wallet(wallet.uuid).await?;
//!     assert_eq!(wallet.balance, 1000);
//!
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod processor;
pub mod store;
pub mod validation;

pub use errors::{ErrorKind, WalletError, WalletResult};
pub use memory::InMemoryWalletStore;
pub use models::{
    NewOperation, Operation, OperationRequest, OperationType, ValidatedOperation, Wallet,
};
pub use postgres::PgWalletStore;
pub use processor::{OperationProcessor, ProcessStage};
pub use store::{WalletStore, WalletTransaction};

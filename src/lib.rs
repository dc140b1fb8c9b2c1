//! Bank Ledger - accounts, entries and atomic transfers
//!
//! # Modules
//!
//! - [`core_types`] - Id and amount aliases, supported currencies
//! - [`models`] - Account / Entry / Transfer rows and query parameters
//! - [`store`] - Query layer, atomic scopes, PostgreSQL and in-memory backends
//! - [`transfer`] - Deadlock-free transfer executor and caller-side retry
//! - [`gateway`] - axum HTTP API with OpenAPI docs
//! - [`config`] - YAML configuration
//! - [`logging`] - tracing subscriber setup

// Core types - must be first!
pub mod core_types;
pub mod models;

// Storage and money movement
pub mod store;
pub mod transfer;

// Service shell
pub mod config;
pub mod gateway;
pub mod logging;

// Convenient re-exports at crate root
pub use core_types::{AccountId, Amount, EntryId, TransferId};
pub use models::{Account, Entry, Transfer};
pub use store::{LedgerStore, LedgerTx, MemoryStore, PgStore, Queries, StoreError};
pub use transfer::{
    RetryPolicy, TransferError, TransferExecutor, TransferPolicy, TransferTxParams,
    TransferTxResult,
};

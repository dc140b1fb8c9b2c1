//! Ledger Store
//!
//! Durable storage for accounts, entries and transfers, plus the atomic
//! scope that groups several writes into one all-or-nothing unit.
//!
//! # Handles
//!
//! Every query lives on the [`Queries`] trait. It is implemented by two
//! kinds of handle:
//!
//! - [`LedgerStore::conn`] - autocommit, each call is its own unit
//! - [`LedgerStore::begin`] - an atomic scope ([`LedgerTx`]); writes stay
//!   invisible to other handles until [`LedgerTx::commit`]
//!
//! Dropping a [`LedgerTx`] without committing rolls it back.
//!
//! # Backends
//!
//! - [`postgres::PgStore`] - PostgreSQL via sqlx (`FOR NO KEY UPDATE` row locks)
//! - [`memory::MemoryStore`] - in-process store with the same locking and
//!   visibility rules, used for tests and local runs

pub mod error;
pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;

use crate::core_types::{AccountId, EntryId, TransferId};
use crate::models::{
    Account, AddAccountBalanceParams, CreateAccountParams, CreateEntryParams,
    CreateTransferParams, Entry, ListAccountsParams, ListEntriesParams, ListTransfersParams,
    Transfer, UpdateAccountParams,
};

pub use error::StoreError;
pub use memory::{FailPoint, MemoryStore};
pub use postgres::PgStore;

/// Parameterized operations over the three ledger relations
#[async_trait]
pub trait Queries: Send {
    // === Accounts ===
    async fn create_account(&mut self, params: CreateAccountParams)
    -> Result<Account, StoreError>;

    async fn get_account(&mut self, id: AccountId) -> Result<Account, StoreError>;

    /// Read an account and hold its row lock until the scope ends.
    ///
    /// Outside a scope the lock is released as soon as the call returns.
    async fn get_account_for_update(&mut self, id: AccountId) -> Result<Account, StoreError>;

    async fn list_accounts(
        &mut self,
        params: ListAccountsParams,
    ) -> Result<Vec<Account>, StoreError>;

    async fn update_account(&mut self, params: UpdateAccountParams)
    -> Result<Account, StoreError>;

    /// `balance = balance + amount`, evaluated by the store under the row lock
    async fn add_account_balance(
        &mut self,
        params: AddAccountBalanceParams,
    ) -> Result<Account, StoreError>;

    async fn delete_account(&mut self, id: AccountId) -> Result<(), StoreError>;

    // === Entries ===
    async fn create_entry(&mut self, params: CreateEntryParams) -> Result<Entry, StoreError>;

    async fn get_entry(&mut self, id: EntryId) -> Result<Entry, StoreError>;

    async fn list_entries(&mut self, params: ListEntriesParams)
    -> Result<Vec<Entry>, StoreError>;

    // === Transfers ===
    async fn create_transfer(
        &mut self,
        params: CreateTransferParams,
    ) -> Result<Transfer, StoreError>;

    async fn get_transfer(&mut self, id: TransferId) -> Result<Transfer, StoreError>;

    async fn list_transfers(
        &mut self,
        params: ListTransfersParams,
    ) -> Result<Vec<Transfer>, StoreError>;
}

/// An open atomic scope
#[async_trait]
pub trait LedgerTx: Queries {
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Entry point to a ledger backend
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Open an atomic scope
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError>;

    /// Open an atomic scope whose lock waits and statements give up within
    /// `budget`, failing with [`StoreError::Conflict`]
    async fn begin_within(&self, budget: Duration) -> Result<Box<dyn LedgerTx>, StoreError>;

    /// Autocommit handle
    async fn conn(&self) -> Result<Box<dyn Queries>, StoreError>;

    /// Check that the backend is reachable
    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Lock wait bound of one scope: the backend's configured timeout
/// (`ZERO` = forever) capped by the caller's remaining budget.
/// `None` waits forever; a bound is never below 1ms.
pub(crate) fn scope_lock_timeout(configured: Duration, budget: Option<Duration>) -> Option<Duration> {
    let configured = (!configured.is_zero()).then_some(configured);
    let bound = match (configured, budget) {
        (Some(configured), Some(budget)) => Some(configured.min(budget)),
        (configured, budget) => configured.or(budget),
    };
    bound.map(|d| d.max(Duration::from_millis(1)))
}

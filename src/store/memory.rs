//! In-memory ledger store
//!
//! Follows the same contract as the PostgreSQL store:
//!
//! - **Row locks**: one async mutex per account id. `get_account_for_update`,
//!   `update_account`, `add_account_balance` and `delete_account` take it and
//!   hold it until the scope ends. Waiting longer than `lock_timeout` fails
//!   with [`StoreError::Conflict`], the analogue of PostgreSQL `55P03`.
//! - **Visibility**: a scope stages its writes privately and reads its own
//!   writes over the committed tables (read committed). `commit` re-checks
//!   constraints and publishes everything under one table lock.
//! - **Rollback**: dropping a scope discards the staged rows and releases
//!   its row locks.
//!
//! Fault injection ([`MemoryStore::inject_fault`]) makes a chosen operation
//! fail, which is how atomicity and retry behaviour are tested.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::OwnedMutexGuard;

use super::{LedgerStore, LedgerTx, Queries, StoreError, scope_lock_timeout};
use crate::core_types::{AccountId, EntryId, TransferId};
use crate::models::{
    Account, AddAccountBalanceParams, CreateAccountParams, CreateEntryParams,
    CreateTransferParams, Entry, ListAccountsParams, ListEntriesParams, ListTransfersParams,
    Transfer, UpdateAccountParams,
};

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Operations that can be made to fail on demand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    CreateTransfer,
    CreateEntry,
    AddAccountBalance,
    Commit,
}

#[derive(Default)]
struct Tables {
    accounts: BTreeMap<AccountId, Account>,
    entries: BTreeMap<EntryId, Entry>,
    transfers: BTreeMap<TransferId, Transfer>,
}

struct Shared {
    tables: Mutex<Tables>,
    row_locks: DashMap<AccountId, Arc<tokio::sync::Mutex<()>>>,
    account_seq: AtomicI64,
    entry_seq: AtomicI64,
    transfer_seq: AtomicI64,
    lock_timeout: Duration,
    faults: Mutex<HashMap<FailPoint, (StoreError, u32)>>,
    offline: AtomicBool,
}

impl Shared {
    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Internal("ledger tables poisoned".to_string()))
    }

    /// Consume one armed fault for `point`, if any
    fn take_fault(&self, point: FailPoint) -> Result<(), StoreError> {
        let mut faults = self
            .faults
            .lock()
            .map_err(|_| StoreError::Internal("fault table poisoned".to_string()))?;

        let Some((error, remaining)) = faults.get_mut(&point) else {
            return Ok(());
        };
        let error = error.clone();
        *remaining -= 1;
        if *remaining == 0 {
            faults.remove(&point);
        }
        tracing::debug!(?point, %error, "Injected store fault");
        Err(error)
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Connectivity(
                "in-memory store is offline".to_string(),
            ));
        }
        Ok(())
    }
}

/// In-process ledger store
#[derive(Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    /// `Duration::ZERO` waits for row locks forever
    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                tables: Mutex::new(Tables::default()),
                row_locks: DashMap::new(),
                account_seq: AtomicI64::new(1),
                entry_seq: AtomicI64::new(1),
                transfer_seq: AtomicI64::new(1),
                lock_timeout,
                faults: Mutex::new(HashMap::new()),
                offline: AtomicBool::new(false),
            }),
        }
    }

    /// Make the next `times` calls at `point` fail with `error`
    pub fn inject_fault(&self, point: FailPoint, error: StoreError, times: u32) {
        if times == 0 {
            return;
        }
        if let Ok(mut faults) = self.shared.faults.lock() {
            faults.insert(point, (error, times));
        }
    }

    /// Simulate an unreachable backend
    pub fn set_offline(&self, offline: bool) {
        self.shared.offline.store(offline, Ordering::SeqCst);
    }

    /// Committed row counts: (accounts, entries, transfers)
    pub fn row_counts(&self) -> Result<(usize, usize, usize), StoreError> {
        let tables = self.shared.tables()?;
        Ok((
            tables.accounts.len(),
            tables.entries.len(),
            tables.transfers.len(),
        ))
    }

    fn handle(&self, autocommit: bool, budget: Option<Duration>) -> MemoryTx {
        MemoryTx {
            shared: self.shared.clone(),
            autocommit,
            lock_timeout: scope_lock_timeout(self.shared.lock_timeout, budget),
            locks: HashMap::new(),
            staged: Staged::default(),
        }
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError> {
        self.shared.check_online()?;
        Ok(Box::new(self.handle(false, None)))
    }

    async fn begin_within(&self, budget: Duration) -> Result<Box<dyn LedgerTx>, StoreError> {
        self.shared.check_online()?;
        Ok(Box::new(self.handle(false, Some(budget))))
    }

    async fn conn(&self) -> Result<Box<dyn Queries>, StoreError> {
        self.shared.check_online()?;
        Ok(Box::new(self.handle(true, None)))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.shared.check_online()
    }
}

/// Writes of one scope, invisible to everyone else until commit
#[derive(Default)]
struct Staged {
    /// Inserted or modified account rows
    accounts: BTreeMap<AccountId, Account>,
    deleted: BTreeSet<AccountId>,
    entries: Vec<Entry>,
    transfers: Vec<Transfer>,
}

impl Staged {
    fn account_exists(&self, tables: &Tables, id: AccountId) -> bool {
        !self.deleted.contains(&id)
            && (self.accounts.contains_key(&id) || tables.accounts.contains_key(&id))
    }

    fn is_referenced(&self, tables: &Tables, id: AccountId) -> bool {
        let refs_transfer = |t: &Transfer| t.from_account_id == id || t.to_account_id == id;
        tables.entries.values().any(|e| e.account_id == id)
            || tables.transfers.values().any(refs_transfer)
            || self.entries.iter().any(|e| e.account_id == id)
            || self.transfers.iter().any(refs_transfer)
    }

    /// Constraint checks against the committed tables at publish time
    fn validate(&self, tables: &Tables) -> Result<(), StoreError> {
        for account in self.accounts.values() {
            let duplicate = tables.accounts.values().any(|other| {
                other.id != account.id
                    && !self.deleted.contains(&other.id)
                    && other.owner == account.owner
                    && other.currency == account.currency
            });
            if duplicate {
                return Err(unique_violation(account));
            }
        }
        for id in &self.deleted {
            if self.is_referenced(tables, *id) {
                return Err(fk_violation("accounts", *id));
            }
        }
        for entry in &self.entries {
            if !self.account_exists(tables, entry.account_id) {
                return Err(fk_violation("entries", entry.account_id));
            }
        }
        for transfer in &self.transfers {
            for id in [transfer.from_account_id, transfer.to_account_id] {
                if !self.account_exists(tables, id) {
                    return Err(fk_violation("transfers", id));
                }
            }
        }
        Ok(())
    }
}

fn unique_violation(account: &Account) -> StoreError {
    StoreError::ConstraintViolation(format!(
        "duplicate key value violates unique constraint \"owner_currency_key\" ({}, {})",
        account.owner, account.currency
    ))
}

fn fk_violation(table: &str, account_id: AccountId) -> StoreError {
    StoreError::ConstraintViolation(format!(
        "foreign key violation on \"{}\": account {}",
        table, account_id
    ))
}

fn page<T>(rows: impl Iterator<Item = T>, limit: i64, offset: i64) -> Vec<T> {
    rows.skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

/// Query handle: an atomic scope, or an autocommit connection when
/// `autocommit` is set (each write is published immediately and row locks
/// are released after every call).
pub struct MemoryTx {
    shared: Arc<Shared>,
    autocommit: bool,
    /// `None` waits forever
    lock_timeout: Option<Duration>,
    locks: HashMap<AccountId, OwnedMutexGuard<()>>,
    staged: Staged,
}

impl MemoryTx {
    async fn lock_row(&mut self, id: AccountId) -> Result<(), StoreError> {
        if self.locks.contains_key(&id) {
            return Ok(());
        }
        // Like `FOR UPDATE`, a missing row locks nothing
        if self.visible_account(id)?.is_none() {
            return Ok(());
        }

        let row_lock = self.shared.row_locks.entry(id).or_default().clone();
        let guard = match self.lock_timeout {
            None => row_lock.lock_owned().await,
            Some(lock_timeout) => tokio::time::timeout(lock_timeout, row_lock.lock_owned())
                .await
                .map_err(|_| {
                    StoreError::Conflict(format!(
                        "canceling statement due to lock timeout on account {}",
                        id
                    ))
                })?,
        };

        self.locks.insert(id, guard);
        Ok(())
    }

    fn visible_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        if self.staged.deleted.contains(&id) {
            return Ok(None);
        }
        if let Some(account) = self.staged.accounts.get(&id) {
            return Ok(Some(account.clone()));
        }
        Ok(self.shared.tables()?.accounts.get(&id).cloned())
    }

    fn require_account(&self, id: AccountId) -> Result<Account, StoreError> {
        self.visible_account(id)?
            .ok_or_else(|| StoreError::not_found("account", id))
    }

    /// Publish staged rows and release row locks
    fn publish(&mut self) -> Result<(), StoreError> {
        let staged = std::mem::take(&mut self.staged);
        let result = self.shared.tables().and_then(|mut tables| {
            staged.validate(&tables)?;
            for id in &staged.deleted {
                tables.accounts.remove(id);
                self.shared.row_locks.remove(id);
            }
            tables.accounts.extend(staged.accounts);
            tables
                .entries
                .extend(staged.entries.into_iter().map(|e| (e.id, e)));
            tables
                .transfers
                .extend(staged.transfers.into_iter().map(|t| (t.id, t)));
            Ok(())
        });
        self.locks.clear();
        result
    }

    fn finish_write(&mut self) -> Result<(), StoreError> {
        if self.autocommit {
            self.publish()?;
        }
        Ok(())
    }

    fn finish_read(&mut self) {
        if self.autocommit {
            self.locks.clear();
        }
    }
}

#[async_trait]
impl Queries for MemoryTx {
    async fn create_account(
        &mut self,
        params: CreateAccountParams,
    ) -> Result<Account, StoreError> {
        let account = Account {
            id: self.shared.account_seq.fetch_add(1, Ordering::SeqCst),
            owner: params.owner,
            balance: params.balance,
            currency: params.currency,
            created_at: Utc::now(),
        };

        let duplicate = self.list_visible_accounts()?.into_iter().any(|other| {
            other.owner == account.owner && other.currency == account.currency
        });
        if duplicate {
            return Err(unique_violation(&account));
        }

        self.staged.accounts.insert(account.id, account.clone());
        self.finish_write()?;
        Ok(account)
    }

    async fn get_account(&mut self, id: AccountId) -> Result<Account, StoreError> {
        self.require_account(id)
    }

    async fn get_account_for_update(&mut self, id: AccountId) -> Result<Account, StoreError> {
        self.lock_row(id).await?;
        let result = self.require_account(id);
        self.finish_read();
        result
    }

    async fn list_accounts(
        &mut self,
        params: ListAccountsParams,
    ) -> Result<Vec<Account>, StoreError> {
        let rows = self
            .list_visible_accounts()?
            .into_iter()
            .filter(|a| params.owner.as_deref().is_none_or(|owner| a.owner == owner));
        Ok(page(rows, params.limit, params.offset))
    }

    async fn update_account(
        &mut self,
        params: UpdateAccountParams,
    ) -> Result<Account, StoreError> {
        self.lock_row(params.id).await?;
        let mut account = match self.require_account(params.id) {
            Ok(account) => account,
            Err(e) => {
                self.finish_read();
                return Err(e);
            }
        };
        account.balance = params.balance;
        self.staged.accounts.insert(account.id, account.clone());
        self.finish_write()?;
        Ok(account)
    }

    async fn add_account_balance(
        &mut self,
        params: AddAccountBalanceParams,
    ) -> Result<Account, StoreError> {
        self.shared.take_fault(FailPoint::AddAccountBalance)?;
        self.lock_row(params.id).await?;

        let updated = self.require_account(params.id).and_then(|mut account| {
            account.balance = account.balance.checked_add(params.amount).ok_or_else(|| {
                StoreError::Internal(format!("bigint out of range for account {}", account.id))
            })?;
            Ok(account)
        });
        let account = match updated {
            Ok(account) => account,
            Err(e) => {
                self.finish_read();
                return Err(e);
            }
        };

        self.staged.accounts.insert(account.id, account.clone());
        self.finish_write()?;
        Ok(account)
    }

    async fn delete_account(&mut self, id: AccountId) -> Result<(), StoreError> {
        self.lock_row(id).await?;
        let checked = self.require_account(id).and_then(|_| {
            let tables = self.shared.tables()?;
            if self.staged.is_referenced(&tables, id) {
                return Err(fk_violation("accounts", id));
            }
            Ok(())
        });
        if let Err(e) = checked {
            self.finish_read();
            return Err(e);
        }

        self.staged.accounts.remove(&id);
        self.staged.deleted.insert(id);
        self.finish_write()
    }

    async fn create_entry(&mut self, params: CreateEntryParams) -> Result<Entry, StoreError> {
        self.shared.take_fault(FailPoint::CreateEntry)?;
        if self.visible_account(params.account_id)?.is_none() {
            return Err(fk_violation("entries", params.account_id));
        }

        let entry = Entry {
            id: self.shared.entry_seq.fetch_add(1, Ordering::SeqCst),
            account_id: params.account_id,
            amount: params.amount,
            created_at: Utc::now(),
        };
        self.staged.entries.push(entry.clone());
        self.finish_write()?;
        Ok(entry)
    }

    async fn get_entry(&mut self, id: EntryId) -> Result<Entry, StoreError> {
        if let Some(entry) = self.staged.entries.iter().find(|e| e.id == id) {
            return Ok(entry.clone());
        }
        self.shared
            .tables()?
            .entries
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("entry", id))
    }

    async fn list_entries(
        &mut self,
        params: ListEntriesParams,
    ) -> Result<Vec<Entry>, StoreError> {
        let mut rows: Vec<Entry> = self
            .shared
            .tables()?
            .entries
            .values()
            .filter(|e| e.account_id == params.account_id)
            .cloned()
            .collect();
        rows.extend(
            self.staged
                .entries
                .iter()
                .filter(|e| e.account_id == params.account_id)
                .cloned(),
        );
        rows.sort_by_key(|e| e.id);
        Ok(page(rows.into_iter(), params.limit, params.offset))
    }

    async fn create_transfer(
        &mut self,
        params: CreateTransferParams,
    ) -> Result<Transfer, StoreError> {
        self.shared.take_fault(FailPoint::CreateTransfer)?;
        if params.amount < 0 {
            return Err(StoreError::ConstraintViolation(
                "new row for relation \"transfers\" violates check constraint \"transfers_amount_check\""
                    .to_string(),
            ));
        }
        for id in [params.from_account_id, params.to_account_id] {
            if self.visible_account(id)?.is_none() {
                return Err(fk_violation("transfers", id));
            }
        }

        let transfer = Transfer {
            id: self.shared.transfer_seq.fetch_add(1, Ordering::SeqCst),
            from_account_id: params.from_account_id,
            to_account_id: params.to_account_id,
            amount: params.amount,
            created_at: Utc::now(),
        };
        self.staged.transfers.push(transfer.clone());
        self.finish_write()?;
        Ok(transfer)
    }

    async fn get_transfer(&mut self, id: TransferId) -> Result<Transfer, StoreError> {
        if let Some(transfer) = self.staged.transfers.iter().find(|t| t.id == id) {
            return Ok(transfer.clone());
        }
        self.shared
            .tables()?
            .transfers
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("transfer", id))
    }

    async fn list_transfers(
        &mut self,
        params: ListTransfersParams,
    ) -> Result<Vec<Transfer>, StoreError> {
        let matches = |t: &&Transfer| {
            t.from_account_id == params.from_account_id || t.to_account_id == params.to_account_id
        };
        let mut rows: Vec<Transfer> = self
            .shared
            .tables()?
            .transfers
            .values()
            .filter(matches)
            .cloned()
            .collect();
        rows.extend(self.staged.transfers.iter().filter(matches).cloned());
        rows.sort_by_key(|t| t.id);
        Ok(page(rows.into_iter(), params.limit, params.offset))
    }
}

impl MemoryTx {
    /// Committed accounts overlaid with this scope's writes, ordered by id
    fn list_visible_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let mut rows = self.shared.tables()?.accounts.clone();
        rows.extend(
            self.staged
                .accounts
                .iter()
                .map(|(id, a)| (*id, a.clone())),
        );
        for id in &self.staged.deleted {
            rows.remove(id);
        }
        Ok(rows.into_values().collect())
    }
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        self.shared.take_fault(FailPoint::Commit)?;
        self.publish()
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        tracing::trace!(locks = self.locks.len(), "Memory scope rolled back");
        Ok(())
    }
}

//! PostgreSQL ledger store
//!
//! Connection pool management plus the [`Queries`] / [`LedgerTx`]
//! implementations. Isolation is PostgreSQL's default READ COMMITTED;
//! balance rows are serialized with explicit row locks.

pub mod queries;
pub mod schema;

use std::ops::DerefMut;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};

use super::{LedgerStore, LedgerTx, Queries, StoreError, scope_lock_timeout};
use crate::config::DatabaseConfig;
use crate::core_types::{AccountId, EntryId, TransferId};
use crate::models::{
    Account, AddAccountBalanceParams, CreateAccountParams, CreateEntryParams,
    CreateTransferParams, Entry, ListAccountsParams, ListEntriesParams, ListTransfersParams,
    Transfer, UpdateAccountParams,
};

/// PostgreSQL connection pool
pub struct PgStore {
    pool: PgPool,
    /// Per-scope `lock_timeout`; 0 waits forever
    lock_timeout: Duration,
}

impl PgStore {
    /// Create a new connection pool
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_millis(config.acquire_timeout_ms))
            .connect(&config.url)
            .await?;

        tracing::info!(
            max_connections = config.max_connections,
            "PostgreSQL connection pool established"
        );
        Ok(Self::from_pool(pool).with_lock_timeout(Duration::from_millis(
            config.lock_timeout_ms,
        )))
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout: Duration::ZERO,
        }
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create tables and indexes
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        schema::init_schema(&self.pool).await
    }
}

impl PgStore {
    /// `BEGIN`, then bound lock waits (and, under a budget, every
    /// statement) for this scope only. Expired waits fail with `55P03` /
    /// `57014`, both mapped to `Conflict`, so a cancelled attempt never
    /// leaves a statement blocked on the server.
    async fn open_scope(&self, budget: Option<Duration>) -> Result<Box<dyn LedgerTx>, StoreError> {
        let mut tx = self.pool.begin().await?;

        if let Some(lock_timeout) = scope_lock_timeout(self.lock_timeout, budget) {
            sqlx::query("SELECT set_config('lock_timeout', $1, true)")
                .bind(format!("{}ms", lock_timeout.as_millis()))
                .execute(&mut *tx)
                .await?;
        }
        if let Some(budget) = budget {
            let statement_timeout = budget.max(Duration::from_millis(1));
            sqlx::query("SELECT set_config('statement_timeout', $1, true)")
                .bind(format!("{}ms", statement_timeout.as_millis()))
                .execute(&mut *tx)
                .await?;
        }

        Ok(Box::new(PgQueries { conn: tx }))
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError> {
        self.open_scope(None).await
    }

    async fn begin_within(&self, budget: Duration) -> Result<Box<dyn LedgerTx>, StoreError> {
        self.open_scope(Some(budget)).await
    }

    async fn conn(&self) -> Result<Box<dyn Queries>, StoreError> {
        let conn = self.pool.acquire().await?;
        Ok(Box::new(PgQueries { conn }))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Query handle over anything that derefs to a [`PgConnection`]:
/// a pooled connection (autocommit) or an open transaction (scope).
pub struct PgQueries<C> {
    conn: C,
}

pub type PgTx = PgQueries<Transaction<'static, Postgres>>;

#[async_trait]
impl<C> Queries for PgQueries<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn create_account(
        &mut self,
        params: CreateAccountParams,
    ) -> Result<Account, StoreError> {
        queries::create_account(&mut *self.conn, &params).await
    }

    async fn get_account(&mut self, id: AccountId) -> Result<Account, StoreError> {
        queries::get_account(&mut *self.conn, id).await
    }

    async fn get_account_for_update(&mut self, id: AccountId) -> Result<Account, StoreError> {
        queries::get_account_for_update(&mut *self.conn, id).await
    }

    async fn list_accounts(
        &mut self,
        params: ListAccountsParams,
    ) -> Result<Vec<Account>, StoreError> {
        queries::list_accounts(&mut *self.conn, &params).await
    }

    async fn update_account(
        &mut self,
        params: UpdateAccountParams,
    ) -> Result<Account, StoreError> {
        queries::update_account(&mut *self.conn, &params).await
    }

    async fn add_account_balance(
        &mut self,
        params: AddAccountBalanceParams,
    ) -> Result<Account, StoreError> {
        queries::add_account_balance(&mut *self.conn, &params).await
    }

    async fn delete_account(&mut self, id: AccountId) -> Result<(), StoreError> {
        queries::delete_account(&mut *self.conn, id).await
    }

    async fn create_entry(&mut self, params: CreateEntryParams) -> Result<Entry, StoreError> {
        queries::create_entry(&mut *self.conn, &params).await
    }

    async fn get_entry(&mut self, id: EntryId) -> Result<Entry, StoreError> {
        queries::get_entry(&mut *self.conn, id).await
    }

    async fn list_entries(
        &mut self,
        params: ListEntriesParams,
    ) -> Result<Vec<Entry>, StoreError> {
        queries::list_entries(&mut *self.conn, &params).await
    }

    async fn create_transfer(
        &mut self,
        params: CreateTransferParams,
    ) -> Result<Transfer, StoreError> {
        queries::create_transfer(&mut *self.conn, &params).await
    }

    async fn get_transfer(&mut self, id: TransferId) -> Result<Transfer, StoreError> {
        queries::get_transfer(&mut *self.conn, id).await
    }

    async fn list_transfers(
        &mut self,
        params: ListTransfersParams,
    ) -> Result<Vec<Transfer>, StoreError> {
        queries::list_transfers(&mut *self.conn, &params).await
    }
}

#[async_trait]
impl LedgerTx for PgTx {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let PgQueries { conn } = *self;
        conn.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        let PgQueries { conn } = *self;
        conn.rollback().await?;
        Ok(())
    }
}

//! SQL for the ledger relations
//!
//! Every function is generic over [`PgExecutor`], so the same statement
//! runs on a pooled connection (autocommit) or inside a transaction.

use sqlx::PgExecutor;

use crate::core_types::{AccountId, EntryId, TransferId};
use crate::models::{
    Account, AddAccountBalanceParams, CreateAccountParams, CreateEntryParams,
    CreateTransferParams, Entry, ListAccountsParams, ListEntriesParams, ListTransfersParams,
    Transfer, UpdateAccountParams,
};
use crate::store::StoreError;

// ============================================================================
// Accounts
// ============================================================================

pub async fn create_account<'e, E>(
    executor: E,
    params: &CreateAccountParams,
) -> Result<Account, StoreError>
where
    E: PgExecutor<'e>,
{
    let account = sqlx::query_as::<_, Account>(
        r#"INSERT INTO accounts (owner, balance, currency)
           VALUES ($1, $2, $3)
           RETURNING id, owner, balance, currency, created_at"#,
    )
    .bind(&params.owner)
    .bind(params.balance)
    .bind(&params.currency)
    .fetch_one(executor)
    .await?;

    Ok(account)
}

pub async fn get_account<'e, E>(executor: E, id: AccountId) -> Result<Account, StoreError>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Account>(
        r#"SELECT id, owner, balance, currency, created_at
           FROM accounts WHERE id = $1 LIMIT 1"#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| StoreError::not_found("account", id))
}

/// `FOR NO KEY UPDATE` blocks other balance writers but not inserts of
/// entries/transfers referencing the row (those take `KEY SHARE`).
pub async fn get_account_for_update<'e, E>(
    executor: E,
    id: AccountId,
) -> Result<Account, StoreError>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Account>(
        r#"SELECT id, owner, balance, currency, created_at
           FROM accounts WHERE id = $1 LIMIT 1
           FOR NO KEY UPDATE"#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| StoreError::not_found("account", id))
}

pub async fn list_accounts<'e, E>(
    executor: E,
    params: &ListAccountsParams,
) -> Result<Vec<Account>, StoreError>
where
    E: PgExecutor<'e>,
{
    let accounts = sqlx::query_as::<_, Account>(
        r#"SELECT id, owner, balance, currency, created_at
           FROM accounts
           WHERE ($1::varchar IS NULL OR owner = $1)
           ORDER BY id
           LIMIT $2 OFFSET $3"#,
    )
    .bind(params.owner.as_deref())
    .bind(params.limit)
    .bind(params.offset)
    .fetch_all(executor)
    .await?;

    Ok(accounts)
}

pub async fn update_account<'e, E>(
    executor: E,
    params: &UpdateAccountParams,
) -> Result<Account, StoreError>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Account>(
        r#"UPDATE accounts SET balance = $2
           WHERE id = $1
           RETURNING id, owner, balance, currency, created_at"#,
    )
    .bind(params.id)
    .bind(params.balance)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| StoreError::not_found("account", params.id))
}

pub async fn add_account_balance<'e, E>(
    executor: E,
    params: &AddAccountBalanceParams,
) -> Result<Account, StoreError>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Account>(
        r#"UPDATE accounts SET balance = balance + $1
           WHERE id = $2
           RETURNING id, owner, balance, currency, created_at"#,
    )
    .bind(params.amount)
    .bind(params.id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| StoreError::not_found("account", params.id))
}

pub async fn delete_account<'e, E>(executor: E, id: AccountId) -> Result<(), StoreError>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::not_found("account", id));
    }
    Ok(())
}

// ============================================================================
// Entries
// ============================================================================

pub async fn create_entry<'e, E>(
    executor: E,
    params: &CreateEntryParams,
) -> Result<Entry, StoreError>
where
    E: PgExecutor<'e>,
{
    let entry = sqlx::query_as::<_, Entry>(
        r#"INSERT INTO entries (account_id, amount)
           VALUES ($1, $2)
           RETURNING id, account_id, amount, created_at"#,
    )
    .bind(params.account_id)
    .bind(params.amount)
    .fetch_one(executor)
    .await?;

    Ok(entry)
}

pub async fn get_entry<'e, E>(executor: E, id: EntryId) -> Result<Entry, StoreError>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Entry>(
        r#"SELECT id, account_id, amount, created_at
           FROM entries WHERE id = $1 LIMIT 1"#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| StoreError::not_found("entry", id))
}

pub async fn list_entries<'e, E>(
    executor: E,
    params: &ListEntriesParams,
) -> Result<Vec<Entry>, StoreError>
where
    E: PgExecutor<'e>,
{
    let entries = sqlx::query_as::<_, Entry>(
        r#"SELECT id, account_id, amount, created_at
           FROM entries
           WHERE account_id = $1
           ORDER BY id
           LIMIT $2 OFFSET $3"#,
    )
    .bind(params.account_id)
    .bind(params.limit)
    .bind(params.offset)
    .fetch_all(executor)
    .await?;

    Ok(entries)
}

// ============================================================================
// Transfers
// ============================================================================

pub async fn create_transfer<'e, E>(
    executor: E,
    params: &CreateTransferParams,
) -> Result<Transfer, StoreError>
where
    E: PgExecutor<'e>,
{
    let transfer = sqlx::query_as::<_, Transfer>(
        r#"INSERT INTO transfers (from_account_id, to_account_id, amount)
           VALUES ($1, $2, $3)
           RETURNING id, from_account_id, to_account_id, amount, created_at"#,
    )
    .bind(params.from_account_id)
    .bind(params.to_account_id)
    .bind(params.amount)
    .fetch_one(executor)
    .await?;

    Ok(transfer)
}

pub async fn get_transfer<'e, E>(executor: E, id: TransferId) -> Result<Transfer, StoreError>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Transfer>(
        r#"SELECT id, from_account_id, to_account_id, amount, created_at
           FROM transfers WHERE id = $1 LIMIT 1"#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| StoreError::not_found("transfer", id))
}

pub async fn list_transfers<'e, E>(
    executor: E,
    params: &ListTransfersParams,
) -> Result<Vec<Transfer>, StoreError>
where
    E: PgExecutor<'e>,
{
    let transfers = sqlx::query_as::<_, Transfer>(
        r#"SELECT id, from_account_id, to_account_id, amount, created_at
           FROM transfers
           WHERE from_account_id = $1 OR to_account_id = $2
           ORDER BY id
           LIMIT $3 OFFSET $4"#,
    )
    .bind(params.from_account_id)
    .bind(params.to_account_id)
    .bind(params.limit)
    .bind(params.offset)
    .fetch_all(executor)
    .await?;

    Ok(transfers)
}

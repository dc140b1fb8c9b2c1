//! Ledger entities and query parameters
//!
//! Row types map 1:1 onto the `accounts`, `entries` and `transfers`
//! tables. Parameter structs are the typed inputs of the query layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::core_types::{AccountId, Amount, EntryId, TransferId};

// ============================================================================
// Entities
// ============================================================================

/// Bank account holding a balance in a single currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Account {
    #[schema(example = 1)]
    pub id: AccountId,
    #[schema(example = "alice")]
    pub owner: String,
    /// Balance in minor units
    #[schema(example = 10000)]
    pub balance: Amount,
    #[schema(example = "USD")]
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

/// One side of a transfer recorded against one account.
///
/// Positive amounts are credits, negative amounts are debits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Entry {
    pub id: EntryId,
    pub account_id: AccountId,
    #[schema(example = -3000)]
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
}

/// Record of a completed fund movement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Transfer {
    pub id: TransferId,
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    /// Always non-negative; direction is given by from/to
    #[schema(example = 3000)]
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Query parameters
// ============================================================================

#[derive(Debug, Clone)]
pub struct CreateAccountParams {
    pub owner: String,
    pub balance: Amount,
    pub currency: String,
}

#[derive(Debug, Clone, Default)]
pub struct ListAccountsParams {
    /// Restrict to one owner; `None` lists every account
    pub owner: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

/// Overwrite a balance. Only for administrative corrections; transfers use
/// [`AddAccountBalanceParams`].
#[derive(Debug, Clone, Copy)]
pub struct UpdateAccountParams {
    pub id: AccountId,
    pub balance: Amount,
}

/// Atomic `balance = balance + amount`
#[derive(Debug, Clone, Copy)]
pub struct AddAccountBalanceParams {
    pub id: AccountId,
    pub amount: Amount,
}

#[derive(Debug, Clone, Copy)]
pub struct CreateEntryParams {
    pub account_id: AccountId,
    pub amount: Amount,
}

#[derive(Debug, Clone, Copy)]
pub struct ListEntriesParams {
    pub account_id: AccountId,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct CreateTransferParams {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: Amount,
}

/// Transfers leaving `from_account_id` or arriving at `to_account_id`
#[derive(Debug, Clone, Copy)]
pub struct ListTransfersParams {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub limit: i64,
    pub offset: i64,
}

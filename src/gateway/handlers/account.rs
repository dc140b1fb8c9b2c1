//! Account handlers

use std::sync::Arc;

use axum::extract::{Path, State};

use super::super::state::AppState;
use super::super::types::{
    ApiError, ApiResult, CreateAccountRequest, ListAccountsQuery, PageQuery, ValidatedJson,
    ValidatedQuery, ok,
};
use crate::core_types::AccountId;
use crate::models::{Account, CreateAccountParams, Entry, ListAccountsParams, ListEntriesParams};
use crate::store::{LedgerStore, Queries};

pub(super) fn check_id(id: AccountId) -> Result<AccountId, ApiError> {
    if id < 1 {
        return Err(ApiError::bad_request(format!("Invalid id: {}", id)));
    }
    Ok(id)
}

/// Open an account with a zero balance
#[utoipa::path(
    post,
    path = "/api/v1/accounts",
    request_body = CreateAccountRequest,
    responses(
        (status = 200, description = "Account created", body = Account),
        (status = 400, description = "Invalid owner or currency"),
        (status = 403, description = "Owner already has an account in this currency")
    ),
    tag = "Accounts"
)]
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateAccountRequest>,
) -> ApiResult<Account> {
    let mut conn = state.store.conn().await?;
    let account = conn
        .create_account(CreateAccountParams {
            owner: req.owner,
            balance: 0,
            currency: req.currency,
        })
        .await?;

    tracing::info!(
        account_id = account.id,
        owner = %account.owner,
        currency = %account.currency,
        "Account created"
    );
    ok(account)
}

#[utoipa::path(
    get,
    path = "/api/v1/accounts/{id}",
    params(("id" = i64, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Account", body = Account),
        (status = 404, description = "Account not found")
    ),
    tag = "Accounts"
)]
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<AccountId>,
) -> ApiResult<Account> {
    let id = check_id(id)?;
    let mut conn = state.store.conn().await?;
    ok(conn.get_account(id).await?)
}

#[utoipa::path(
    get,
    path = "/api/v1/accounts",
    params(ListAccountsQuery),
    responses(
        (status = 200, description = "Accounts ordered by id", body = Vec<Account>),
        (status = 400, description = "Invalid pagination")
    ),
    tag = "Accounts"
)]
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(query): ValidatedQuery<ListAccountsQuery>,
) -> ApiResult<Vec<Account>> {
    let page = query.page();
    let mut conn = state.store.conn().await?;
    let accounts = conn
        .list_accounts(ListAccountsParams {
            owner: query.owner,
            limit: page.limit(),
            offset: page.offset(),
        })
        .await?;
    ok(accounts)
}

/// Ledger entries of one account
#[utoipa::path(
    get,
    path = "/api/v1/accounts/{id}/entries",
    params(("id" = i64, Path, description = "Account ID"), PageQuery),
    responses(
        (status = 200, description = "Entries ordered by id", body = Vec<Entry>),
        (status = 404, description = "Account not found")
    ),
    tag = "Accounts"
)]
pub async fn list_account_entries(
    State(state): State<Arc<AppState>>,
    Path(id): Path<AccountId>,
    ValidatedQuery(page): ValidatedQuery<PageQuery>,
) -> ApiResult<Vec<Entry>> {
    let id = check_id(id)?;
    let mut conn = state.store.conn().await?;
    conn.get_account(id).await?;

    let entries = conn
        .list_entries(ListEntriesParams {
            account_id: id,
            limit: page.limit(),
            offset: page.offset(),
        })
        .await?;
    ok(entries)
}

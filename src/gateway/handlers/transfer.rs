//! Transfer handlers

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;

use super::super::state::AppState;
use super::super::types::{
    ApiError, ApiResult, CreateTransferRequest, ListTransfersQuery, ValidatedJson,
    ValidatedQuery, error_codes, ok,
};
use super::account::check_id;
use crate::core_types::AccountId;
use crate::models::{ListTransfersParams, Transfer};
use crate::store::{LedgerStore, Queries, StoreError};
use crate::transfer::{TransferTxParams, TransferTxResult};

/// Reject early when an account is missing or holds another currency.
/// The executor repeats both checks under the row lock.
async fn valid_account(
    conn: &mut dyn Queries,
    id: AccountId,
    currency: &str,
) -> Result<(), ApiError> {
    let account = conn.get_account(id).await.map_err(|e| match e {
        StoreError::NotFound { .. } => ApiError::not_found(
            error_codes::ACCOUNT_NOT_FOUND,
            format!("account not found: {}", id),
        ),
        other => other.into(),
    })?;

    if account.currency != currency {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            error_codes::CURRENCY_MISMATCH,
            format!(
                "account [{}] currency mismatch: {} vs {}",
                id, account.currency, currency
            ),
        ));
    }
    Ok(())
}

/// Move money between two accounts
///
/// Transient failures (lock conflicts, timeouts) are retried up to
/// `transfer.max_attempts` times; each attempt is all-or-nothing.
#[utoipa::path(
    post,
    path = "/api/v1/transfers",
    request_body = CreateTransferRequest,
    responses(
        (status = 200, description = "Transfer committed", body = TransferTxResult),
        (status = 400, description = "Invalid parameters or currency mismatch"),
        (status = 404, description = "Account not found"),
        (status = 409, description = "Lock conflict persisted across retries"),
        (status = 422, description = "Insufficient funds"),
        (status = 503, description = "Storage unavailable"),
        (status = 504, description = "Transfer timed out")
    ),
    tag = "Transfers"
)]
pub async fn create_transfer(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateTransferRequest>,
) -> ApiResult<TransferTxResult> {
    {
        let mut conn = state.store.conn().await?;
        valid_account(conn.as_mut(), req.from_account_id, &req.currency).await?;
        valid_account(conn.as_mut(), req.to_account_id, &req.currency).await?;
    }

    let params = TransferTxParams::new(req.from_account_id, req.to_account_id, req.amount)
        .with_currency(req.currency);

    let result = state
        .retry
        .run(|attempt| {
            tracing::debug!(attempt, "Executing transfer");
            state.executor.execute(params.clone())
        })
        .await
        .inspect_err(|e| {
            tracing::warn!(code = e.code(), "Transfer rejected: {}", e);
        })?;

    ok(result)
}

#[utoipa::path(
    get,
    path = "/api/v1/transfers/{id}",
    params(("id" = i64, Path, description = "Transfer ID")),
    responses(
        (status = 200, description = "Transfer", body = Transfer),
        (status = 404, description = "Transfer not found")
    ),
    tag = "Transfers"
)]
pub async fn get_transfer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Transfer> {
    let id = check_id(id)?;
    let mut conn = state.store.conn().await?;
    ok(conn.get_transfer(id).await?)
}

#[utoipa::path(
    get,
    path = "/api/v1/transfers",
    params(ListTransfersQuery),
    responses(
        (status = 200, description = "Transfers ordered by id", body = Vec<Transfer>),
        (status = 400, description = "Invalid query")
    ),
    tag = "Transfers"
)]
pub async fn list_transfers(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(query): ValidatedQuery<ListTransfersQuery>,
) -> ApiResult<Vec<Transfer>> {
    let page = query.page();
    let mut conn = state.store.conn().await?;
    let transfers = conn
        .list_transfers(ListTransfersParams {
            from_account_id: query.from_account_id,
            to_account_id: query.to_account_id,
            limit: page.limit(),
            offset: page.offset(),
        })
        .await?;
    ok(transfers)
}

//! Request DTOs and validating extractors
//!
//! Shape rules live on the DTOs as `validator` attributes. The
//! [`ValidatedJson`] / [`ValidatedQuery`] extractors reject bad input with a
//! `400` envelope before a handler runs.

use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use super::response::ApiError;
use crate::core_types::{AccountId, Amount, is_supported_currency};

fn validate_currency(currency: &str) -> Result<(), ValidationError> {
    if is_supported_currency(currency) {
        Ok(())
    } else {
        Err(ValidationError::new("unsupported_currency"))
    }
}

// ============================================================================
// Request Bodies
// ============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAccountRequest {
    #[schema(example = "alice")]
    #[validate(length(min = 1, max = 64))]
    pub owner: String,
    #[schema(example = "USD")]
    #[validate(custom(function = "validate_currency"))]
    pub currency: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTransferRequest {
    #[validate(range(min = 1))]
    pub from_account_id: AccountId,
    #[validate(range(min = 1))]
    pub to_account_id: AccountId,
    /// Minor units. Zero is accepted or rejected by the transfer policy.
    #[schema(example = 1000)]
    #[validate(range(min = 0))]
    pub amount: Amount,
    #[schema(example = "USD")]
    #[validate(custom(function = "validate_currency"))]
    pub currency: String,
}

// ============================================================================
// Query Strings
// ============================================================================

/// Upper bound for `page_id`; keeps `offset` well inside `i64`
pub const MAX_PAGE_ID: i64 = 1_000_000_000;

/// Pagination: `page_id` is 1-based
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    #[validate(range(min = 1, max = MAX_PAGE_ID))]
    pub page_id: i64,
    #[validate(range(min = 5, max = 10))]
    pub page_size: i64,
}

impl PageQuery {
    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page_id - 1).saturating_mul(self.page_size)
    }
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListAccountsQuery {
    /// Only accounts of this owner
    pub owner: Option<String>,
    #[validate(range(min = 1, max = MAX_PAGE_ID))]
    pub page_id: i64,
    #[validate(range(min = 5, max = 10))]
    pub page_size: i64,
}

impl ListAccountsQuery {
    pub fn page(&self) -> PageQuery {
        PageQuery {
            page_id: self.page_id,
            page_size: self.page_size,
        }
    }
}

/// Transfers where `from_account_id` is the source or `to_account_id` the
/// destination
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListTransfersQuery {
    #[validate(range(min = 1))]
    pub from_account_id: AccountId,
    #[validate(range(min = 1))]
    pub to_account_id: AccountId,
    #[validate(range(min = 1, max = MAX_PAGE_ID))]
    pub page_id: i64,
    #[validate(range(min = 5, max = 10))]
    pub page_size: i64,
}

impl ListTransfersQuery {
    pub fn page(&self) -> PageQuery {
        PageQuery {
            page_id: self.page_id,
            page_size: self.page_size,
        }
    }
}

// ============================================================================
// Extractors
// ============================================================================

/// JSON body that passed its `validator` rules
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON: {}", e.body_text())))?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// Query string that passed its `validator` rules
#[derive(Debug)]
pub struct ValidatedQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidatedQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid query: {}", e.body_text())))?;
        value.validate()?;
        Ok(Self(value))
    }
}

//! Gateway types module
//!
//! ## Input Types
//! - [`request`]: request DTOs with `validator` rules, plus the
//!   [`ValidatedJson`] / [`ValidatedQuery`] extractors
//!
//! ## Output Types
//! - [`ApiResponse<T>`]: Unified API response wrapper
//! - [`ApiError`]: error half of [`ApiResult`]

pub mod request;
pub mod response;

pub use request::{
    CreateAccountRequest, CreateTransferRequest, ListAccountsQuery, ListTransfersQuery,
    PageQuery, ValidatedJson, ValidatedQuery,
};
pub use response::{ApiError, ApiResponse, ApiResult, error_codes, ok};

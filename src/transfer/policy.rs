//! Request-level validation applied before any storage access

use serde::{Deserialize, Serialize};

use super::error::TransferError;
use super::types::TransferTxParams;

/// Which edge-case transfers are accepted. Both are rejected by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferPolicy {
    /// Accept `amount == 0` (negative amounts are always rejected)
    pub allow_zero_amount: bool,
    /// Accept `from_account_id == to_account_id`
    pub allow_self_transfer: bool,
}

impl TransferPolicy {
    pub fn validate(&self, params: &TransferTxParams) -> Result<(), TransferError> {
        if params.amount < 0 || (params.amount == 0 && !self.allow_zero_amount) {
            return Err(TransferError::InvalidAmount(params.amount));
        }
        if params.from_account_id == params.to_account_id && !self.allow_self_transfer {
            return Err(TransferError::SameAccount);
        }
        Ok(())
    }
}

//! Core types used throughout the ledger
//!
//! Identifiers are PostgreSQL `BIGSERIAL` values, amounts are signed
//! minor currency units (cents for USD).

/// Account ID - assigned by the store, immutable after creation.
pub type AccountId = i64;

/// Entry ID - one ledger line, append-only
pub type EntryId = i64;

/// Transfer ID
pub type TransferId = i64;

/// Amount in minor units.
///
/// Signed so that a debit entry can carry a negative value.
pub type Amount = i64;

/// Currency codes accepted by the ledger.
pub const SUPPORTED_CURRENCIES: [&str; 3] = ["USD", "EUR", "CAD"];

/// Check whether a currency code is accepted (exact, upper-case match)
pub fn is_supported_currency(currency: &str) -> bool {
    SUPPORTED_CURRENCIES.contains(&currency)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_currencies() {
        assert!(is_supported_currency("USD"));
        assert!(is_supported_currency("EUR"));
        assert!(is_supported_currency("CAD"));
        assert!(!is_supported_currency("usd"));
        assert!(!is_supported_currency("JPY"));
        assert!(!is_supported_currency(""));
    }
}

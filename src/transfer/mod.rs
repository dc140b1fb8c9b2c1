//! Transfer Executor
//!
//! The only path that moves money between accounts.
//!
//! # Attempt
//!
//! ```text
//! STARTED → LOCKS_ACQUIRED → ROWS_WRITTEN → COMMITTED
//!    └──────────┴────────────────┴──────→ ABORTED
//! ```
//!
//! One call to [`TransferExecutor::execute`] is one atomic outcome: either a
//! transfer row, a debit entry, a credit entry and both balance updates are
//! committed together, or nothing is.
//!
//! # Invariants
//!
//! 1. **Lock order**: account rows are locked in ascending id order
//! 2. **Fresh balance**: funds are checked on the row read under its lock
//! 3. **Conservation**: the two entries of a transfer sum to zero
//! 4. **No silent retry**: retrying is the caller's decision ([`RetryPolicy`])

pub mod error;
pub mod executor;
pub mod phase;
pub mod policy;
pub mod retry;
pub mod types;


pub use error::{ErrorKind, TransferError};
pub use executor::TransferExecutor;
pub use phase::TransferPhase;
pub use policy::TransferPolicy;
pub use retry::RetryPolicy;
pub use types::{TransferTxParams, TransferTxResult};

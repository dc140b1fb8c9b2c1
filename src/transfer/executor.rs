//! Transfer Executor
//!
//! Moves money between two accounts inside one atomic scope.
//!
//! # Locking
//!
//! Both account rows are locked up front in ascending id order, and balance
//! updates are applied in the same order. Every attempt, whichever direction
//! it moves money, therefore requests locks in one global order and two
//! transfers can never wait on each other in a cycle.
//!
//! Funds are checked on the balance read under the lock, never on a value
//! read before the scope opened.
//!
//! # Failure
//!
//! Any error rolls the scope back before it is returned. The executor never
//! retries; see [`super::retry::RetryPolicy`] for the caller side.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::error::TransferError;
use super::phase::TransferPhase;
use super::policy::TransferPolicy;
use super::types::{TransferTxParams, TransferTxResult};
use crate::core_types::AccountId;
use crate::models::{Account, AddAccountBalanceParams, CreateEntryParams, CreateTransferParams};
use crate::store::{LedgerStore, LedgerTx, Queries, StoreError};

pub struct TransferExecutor {
    store: Arc<dyn LedgerStore>,
    policy: TransferPolicy,
    /// Deadline for one attempt, up to the commit request
    timeout: Option<Duration>,
}

impl TransferExecutor {
    pub fn new(store: Arc<dyn LedgerStore>, policy: TransferPolicy) -> Self {
        Self {
            store,
            policy,
            timeout: None,
        }
    }

    /// `Duration::ZERO` disables the deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    pub fn policy(&self) -> TransferPolicy {
        self.policy
    }

    /// Run one transfer attempt.
    ///
    /// The deadline covers opening the scope, locking and writing. Once the
    /// commit is issued it runs to completion, so a `Timeout` always means
    /// nothing was persisted.
    pub async fn execute(
        &self,
        params: TransferTxParams,
    ) -> Result<TransferTxResult, TransferError> {
        self.policy.validate(&params)?;

        let deadline = self.timeout.map(|t| Instant::now() + t);
        let timeout_ms = self.timeout.map_or(0, |t| t.as_millis() as u64);

        let open = async {
            match deadline {
                // The store bounds lock waits by what is left, so a blocked
                // statement ends on the server near the deadline
                Some(deadline) => {
                    let budget = deadline.saturating_duration_since(Instant::now());
                    self.store.begin_within(budget).await
                }
                None => self.store.begin().await,
            }
        };
        let mut tx = within(deadline, open)
            .await
            .ok_or(TransferError::Timeout(timeout_ms))??;

        let mut phase = TransferPhase::Started;
        debug!(
            from = params.from_account_id,
            to = params.to_account_id,
            amount = params.amount,
            phase = %phase,
            "Transfer attempt started"
        );

        let outcome = match within(deadline, run_in_scope(tx.as_mut(), &params, &mut phase)).await
        {
            // Lock wait cut short by the scope budget
            Some(Err(TransferError::Conflict(_))) if expired(deadline) => {
                Err(TransferError::Timeout(timeout_ms))
            }
            Some(outcome) => outcome,
            None => Err(TransferError::Timeout(timeout_ms)),
        };

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                abort(tx, &params, phase, &e).await;
                return Err(e);
            }
        };

        if let Err(e) = tx.commit().await {
            let e = TransferError::from(e);
            warn!(
                from = params.from_account_id,
                to = params.to_account_id,
                phase = %phase,
                error = %e,
                "Transfer commit failed"
            );
            return Err(e);
        }

        info!(
            transfer_id = result.transfer.id,
            from = params.from_account_id,
            to = params.to_account_id,
            amount = params.amount,
            phase = %TransferPhase::Committed,
            "Transfer committed"
        );
        Ok(result)
    }
}

async fn within<F: Future>(deadline: Option<Instant>, fut: F) -> Option<F::Output> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, fut).await.ok(),
        None => Some(fut.await),
    }
}

fn expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

/// Roll back explicitly; the original error is what the caller sees
async fn abort(
    tx: Box<dyn LedgerTx>,
    params: &TransferTxParams,
    phase: TransferPhase,
    error: &TransferError,
) {
    debug_assert!(phase.can_advance_to(TransferPhase::Aborted));
    if let Err(rollback_err) = tx.rollback().await {
        warn!(error = %rollback_err, "Rollback failed, scope discarded on drop");
    }
    info!(
        from = params.from_account_id,
        to = params.to_account_id,
        amount = params.amount,
        aborted_at = %phase,
        code = error.code(),
        "Transfer aborted: {}", error
    );
}

#[derive(Clone, Copy)]
enum Side {
    Source,
    Destination,
}

async fn lock_account(
    tx: &mut dyn LedgerTx,
    id: AccountId,
    side: Side,
) -> Result<Account, TransferError> {
    match tx.get_account_for_update(id).await {
        Ok(account) => Ok(account),
        Err(StoreError::NotFound { .. }) => Err(match side {
            Side::Source => TransferError::SourceAccountNotFound(id),
            Side::Destination => TransferError::DestinationAccountNotFound(id),
        }),
        Err(e) => Err(e.into()),
    }
}

async fn run_in_scope(
    tx: &mut dyn LedgerTx,
    params: &TransferTxParams,
    phase: &mut TransferPhase,
) -> Result<TransferTxResult, TransferError> {
    let from_id = params.from_account_id;
    let to_id = params.to_account_id;
    let amount = params.amount;

    // === Lock both rows, lower id first ===
    let (from, to) = if from_id == to_id {
        let account = lock_account(tx, from_id, Side::Source).await?;
        (account.clone(), account)
    } else if from_id < to_id {
        let from = lock_account(tx, from_id, Side::Source).await?;
        let to = lock_account(tx, to_id, Side::Destination).await?;
        (from, to)
    } else {
        let to = lock_account(tx, to_id, Side::Destination).await?;
        let from = lock_account(tx, from_id, Side::Source).await?;
        (from, to)
    };
    *phase = TransferPhase::LocksAcquired;

    // === Domain checks on locked rows ===
    let expected = params.currency.as_deref().unwrap_or(&from.currency);
    for account in [&from, &to] {
        if account.currency != expected {
            return Err(TransferError::CurrencyMismatch {
                account_id: account.id,
                expected: expected.to_string(),
                actual: account.currency.clone(),
            });
        }
    }
    if from.balance < amount {
        return Err(TransferError::InsufficientFunds {
            account_id: from.id,
            balance: from.balance,
            amount,
        });
    }

    // === Rows ===
    let transfer = tx
        .create_transfer(CreateTransferParams {
            from_account_id: from_id,
            to_account_id: to_id,
            amount,
        })
        .await?;
    let from_entry = tx
        .create_entry(CreateEntryParams {
            account_id: from_id,
            amount: -amount,
        })
        .await?;
    let to_entry = tx
        .create_entry(CreateEntryParams {
            account_id: to_id,
            amount,
        })
        .await?;

    // === Balances, same order as the locks ===
    let debit = AddAccountBalanceParams {
        id: from_id,
        amount: -amount,
    };
    let credit = AddAccountBalanceParams {
        id: to_id,
        amount,
    };
    let (from_account, to_account) = if from_id <= to_id {
        let from_account = tx.add_account_balance(debit).await?;
        let to_account = tx.add_account_balance(credit).await?;
        (from_account, to_account)
    } else {
        let to_account = tx.add_account_balance(credit).await?;
        let from_account = tx.add_account_balance(debit).await?;
        (from_account, to_account)
    };

    // A self-transfer returns the row after both deltas on each side
    let from_account = if from_id == to_id {
        to_account.clone()
    } else {
        from_account
    };
    *phase = TransferPhase::RowsWritten;

    Ok(TransferTxResult {
        transfer,
        from_entry,
        to_entry,
        from_account,
        to_account,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateAccountParams;
    use crate::store::{FailPoint, MemoryStore};

    async fn open(store: &MemoryStore, owner: &str, balance: i64, currency: &str) -> Account {
        let mut conn = store.conn().await.unwrap();
        conn.create_account(CreateAccountParams {
            owner: owner.to_string(),
            balance,
            currency: currency.to_string(),
        })
        .await
        .unwrap()
    }

    fn executor(store: &MemoryStore) -> TransferExecutor {
        TransferExecutor::new(Arc::new(store.clone()), TransferPolicy::default())
    }

    async fn balance(store: &MemoryStore, id: AccountId) -> i64 {
        store
            .conn()
            .await
            .unwrap()
            .get_account(id)
            .await
            .unwrap()
            .balance
    }

    #[tokio::test]
    async fn test_successful_transfer() {
        let store = MemoryStore::new();
        let x = open(&store, "x", 100, "USD").await;
        let y = open(&store, "y", 50, "USD").await;

        let result = executor(&store)
            .execute(TransferTxParams::new(x.id, y.id, 30).with_currency("USD"))
            .await
            .unwrap();

        assert_eq!(result.transfer.amount, 30);
        assert_eq!(result.from_entry.amount, -30);
        assert_eq!(result.to_entry.amount, 30);
        assert_eq!(result.from_account.balance, 70);
        assert_eq!(result.to_account.balance, 80);
        assert_eq!(balance(&store, x.id).await, 70);
        assert_eq!(balance(&store, y.id).await, 80);
        assert_eq!(store.row_counts().unwrap(), (2, 2, 1));
    }

    #[tokio::test]
    async fn test_reverse_direction_locks_lower_id_first() {
        let store = MemoryStore::new();
        let low = open(&store, "low", 10, "USD").await;
        let high = open(&store, "high", 10, "USD").await;

        let result = executor(&store)
            .execute(TransferTxParams::new(high.id, low.id, 4))
            .await
            .unwrap();
        assert_eq!(result.from_account.id, high.id);
        assert_eq!(result.from_account.balance, 6);
        assert_eq!(result.to_account.balance, 14);
    }

    #[tokio::test]
    async fn test_insufficient_funds_writes_nothing() {
        let store = MemoryStore::new();
        let x = open(&store, "x", 100, "USD").await;
        let y = open(&store, "y", 50, "USD").await;

        let err = executor(&store)
            .execute(TransferTxParams::new(x.id, y.id, 1000))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::InsufficientFunds { .. }));
        assert_eq!(balance(&store, x.id).await, 100);
        assert_eq!(balance(&store, y.id).await, 50);
        assert_eq!(store.row_counts().unwrap(), (2, 0, 0));
    }

    #[tokio::test]
    async fn test_currency_mismatch() {
        let store = MemoryStore::new();
        let x = open(&store, "x", 100, "USD").await;
        let y = open(&store, "y", 50, "EUR").await;

        let err = executor(&store)
            .execute(TransferTxParams::new(x.id, y.id, 30))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TransferError::CurrencyMismatch {
                account_id: y.id,
                expected: "USD".into(),
                actual: "EUR".into()
            }
        );
        assert_eq!(store.row_counts().unwrap(), (2, 0, 0));
    }

    #[tokio::test]
    async fn test_requested_currency_must_match() {
        let store = MemoryStore::new();
        let x = open(&store, "x", 100, "CAD").await;
        let y = open(&store, "y", 0, "CAD").await;

        let err = executor(&store)
            .execute(TransferTxParams::new(x.id, y.id, 1).with_currency("USD"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::CurrencyMismatch { account_id, .. } if account_id == x.id));
    }

    #[tokio::test]
    async fn test_missing_accounts() {
        let store = MemoryStore::new();
        let x = open(&store, "x", 100, "USD").await;

        let exec = executor(&store);
        assert_eq!(
            exec.execute(TransferTxParams::new(x.id, 999, 1)).await,
            Err(TransferError::DestinationAccountNotFound(999))
        );
        assert_eq!(
            exec.execute(TransferTxParams::new(999, x.id, 1)).await,
            Err(TransferError::SourceAccountNotFound(999))
        );
    }

    #[tokio::test]
    async fn test_policy_checked_before_storage() {
        let store = MemoryStore::new();
        store.set_offline(true);

        let exec = executor(&store);
        assert_eq!(
            exec.execute(TransferTxParams::new(1, 1, 5)).await,
            Err(TransferError::SameAccount)
        );
        assert_eq!(
            exec.execute(TransferTxParams::new(1, 2, 0)).await,
            Err(TransferError::InvalidAmount(0))
        );
        assert!(matches!(
            exec.execute(TransferTxParams::new(1, 2, 5)).await,
            Err(TransferError::Connectivity(_))
        ));
    }

    #[tokio::test]
    async fn test_self_transfer_when_allowed() {
        let store = MemoryStore::new();
        let x = open(&store, "x", 100, "USD").await;

        let exec = TransferExecutor::new(
            Arc::new(store.clone()),
            TransferPolicy {
                allow_zero_amount: false,
                allow_self_transfer: true,
            },
        );
        let result = exec
            .execute(TransferTxParams::new(x.id, x.id, 40))
            .await
            .unwrap();
        assert_eq!(result.from_account.balance, 100);
        assert_eq!(result.to_account.balance, 100);
        assert_eq!(balance(&store, x.id).await, 100);
        assert_eq!(store.row_counts().unwrap(), (1, 2, 1));
    }

    #[tokio::test]
    async fn test_zero_amount_when_allowed() {
        let store = MemoryStore::new();
        let x = open(&store, "x", 0, "USD").await;
        let y = open(&store, "y", 0, "USD").await;

        let exec = TransferExecutor::new(
            Arc::new(store.clone()),
            TransferPolicy {
                allow_zero_amount: true,
                allow_self_transfer: false,
            },
        );
        let result = exec.execute(TransferTxParams::new(x.id, y.id, 0)).await.unwrap();
        assert_eq!(result.transfer.amount, 0);
        assert_eq!(store.row_counts().unwrap(), (2, 2, 1));
    }

    #[tokio::test]
    async fn test_fault_after_entries_rolls_back_everything() {
        let store = MemoryStore::new();
        let x = open(&store, "x", 100, "USD").await;
        let y = open(&store, "y", 50, "USD").await;

        store.inject_fault(
            FailPoint::AddAccountBalance,
            StoreError::Internal("disk full".into()),
            1,
        );
        let err = executor(&store)
            .execute(TransferTxParams::new(x.id, y.id, 30))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Storage(_)));
        assert!(!err.is_retryable());

        assert_eq!(balance(&store, x.id).await, 100);
        assert_eq!(balance(&store, y.id).await, 50);
        assert_eq!(store.row_counts().unwrap(), (2, 0, 0));
    }

    #[tokio::test]
    async fn test_commit_failure_leaves_no_rows() {
        let store = MemoryStore::new();
        let x = open(&store, "x", 100, "USD").await;
        let y = open(&store, "y", 50, "USD").await;

        store.inject_fault(
            FailPoint::Commit,
            StoreError::Conflict("could not serialize access".into()),
            1,
        );
        let err = executor(&store)
            .execute(TransferTxParams::new(x.id, y.id, 30))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(store.row_counts().unwrap(), (2, 0, 0));

        // Locks were released; the next attempt goes through
        executor(&store)
            .execute(TransferTxParams::new(x.id, y.id, 30))
            .await
            .unwrap();
        assert_eq!(balance(&store, x.id).await, 70);
    }

    #[tokio::test]
    async fn test_deadline_shorter_than_store_lock_timeout() {
        for store_wait in [Duration::ZERO, Duration::from_secs(30)] {
            let store = MemoryStore::with_lock_timeout(store_wait);
            let x = open(&store, "x", 100, "USD").await;
            let y = open(&store, "y", 50, "USD").await;

            let mut holder = store.begin().await.unwrap();
            holder.get_account_for_update(x.id).await.unwrap();

            // The holder keeps its lock for the whole attempt
            let exec = executor(&store).with_timeout(Duration::from_millis(100));
            let err = tokio::time::timeout(
                Duration::from_secs(2),
                exec.execute(TransferTxParams::new(x.id, y.id, 30)),
            )
            .await
            .expect("attempt must end at its deadline")
            .unwrap_err();
            assert_eq!(err, TransferError::Timeout(100));

            holder.rollback().await.unwrap();
            assert_eq!(store.row_counts().unwrap(), (2, 0, 0));
        }
    }

    #[tokio::test]
    async fn test_timeout_while_row_is_locked() {
        let store = MemoryStore::with_lock_timeout(Duration::ZERO);
        let x = open(&store, "x", 100, "USD").await;
        let y = open(&store, "y", 50, "USD").await;

        let mut holder = store.begin().await.unwrap();
        holder.get_account_for_update(y.id).await.unwrap();

        let exec = executor(&store).with_timeout(Duration::from_millis(50));
        let err = exec
            .execute(TransferTxParams::new(x.id, y.id, 30))
            .await
            .unwrap_err();
        assert_eq!(err, TransferError::Timeout(50));
        assert!(err.is_retryable());

        holder.rollback().await.unwrap();

        // The timed-out attempt released x; nothing was written
        assert_eq!(store.row_counts().unwrap(), (2, 0, 0));
        exec.execute(TransferTxParams::new(x.id, y.id, 30))
            .await
            .unwrap();
        assert_eq!(balance(&store, y.id).await, 80);
    }
}

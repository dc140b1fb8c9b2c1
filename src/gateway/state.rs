use std::sync::Arc;
use std::time::Duration;

use crate::config::TransferConfig;
use crate::store::LedgerStore;
use crate::transfer::{RetryPolicy, TransferExecutor};

/// Gateway application state (shared)
pub struct AppState {
    /// Ledger backend, for reads and account creation
    pub store: Arc<dyn LedgerStore>,
    /// The only writer of balances
    pub executor: Arc<TransferExecutor>,
    /// Retry of transient transfer failures per request
    pub retry: RetryPolicy,
}

impl AppState {
    pub fn new(store: Arc<dyn LedgerStore>, config: &TransferConfig) -> Self {
        let executor = TransferExecutor::new(store.clone(), config.policy())
            .with_timeout(Duration::from_millis(config.timeout_ms));

        Self {
            store,
            executor: Arc::new(executor),
            retry: RetryPolicy::new(
                config.max_attempts,
                Duration::from_millis(config.retry_backoff_ms),
            ),
        }
    }
}

use std::{future::Future, time::Duration};

use sea_orm::DatabaseConnection;

use crate::ResultEngine;

mod access;
mod balances;
mod budgets;
mod categories;
mod reconciliation;
mod reports;
mod transactions;
mod users;
mod wallets;

pub use balances::BalanceAudit;
pub use reconciliation::BalanceEdit;
pub use reports::{CurrencyTotal, FlowTotals, MonthTotals, Summary};
pub use transactions::{ListScope, TransactionListFilter, TransactionOutcome, TransactionPage};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(10);

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    max_retries: u32,
    retry_backoff: Duration,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Runs `attempt` until it succeeds, fails with a non-retryable error or
    /// the retry budget is spent. Only `Conflict` is retried; every attempt
    /// runs in its own DB transaction so nothing leaks from a failed one.
    async fn with_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        mut attempt: F,
    ) -> ResultEngine<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ResultEngine<T>>,
    {
        let mut retries = 0u32;
        loop {
            match attempt().await {
                Err(err) if err.is_retryable() && retries < self.max_retries => {
                    retries += 1;
                    tracing::warn!(operation, retries, error = %err, "retrying after conflict");
                    tokio::time::sleep(self.retry_backoff * retries).await;
                }
                other => return other,
            }
        }
    }
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    max_retries: u32,
    retry_backoff: Duration,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// How many times a write is attempted again after a `Conflict`.
    pub fn max_retries(mut self, max_retries: u32) -> EngineBuilder {
        self.max_retries = max_retries;
        self
    }

    /// Base delay between attempts; the n-th retry waits `n * backoff`.
    pub fn retry_backoff(mut self, backoff: Duration) -> EngineBuilder {
        self.retry_backoff = backoff;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            max_retries: self.max_retries,
            retry_backoff: self.retry_backoff,
        })
    }
}

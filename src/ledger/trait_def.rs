use crate::models::{VisitOutcome, VisitStats, VisitorRecord};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Failure of the underlying store. Never retried by the ledger.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("ledger operation timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type LedgerResult<T> = Result<T, PersistenceError>;

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Create tables and seed the aggregate row if they do not exist yet
    async fn init(&self) -> anyhow::Result<()>;

    /// Insert the visitor if absent and bump the counters as one atomic unit.
    ///
    /// `total_visits` always grows by one; `unique_visitors` grows by one only
    /// when this call created the visitor record.
    async fn record_visit(&self, visitor_id: &str) -> LedgerResult<VisitOutcome>;

    /// Current totals, `(0, 0)` before the first visit
    async fn read_stats(&self) -> LedgerResult<VisitStats>;

    /// Look up a visitor without modifying anything
    async fn find_visitor(&self, visitor_id: &str) -> LedgerResult<Option<VisitorRecord>>;

    /// Short backend name used in logs and the health endpoint
    fn backend(&self) -> &'static str;
}

/// Bound a database future by the configured operation timeout
pub(crate) async fn with_timeout<T, F>(timeout: Duration, operation: F) -> LedgerResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(PersistenceError::Timeout(timeout)),
    }
}

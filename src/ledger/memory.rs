use crate::ledger::{Ledger, LedgerResult};
use crate::models::{VisitOutcome, VisitStats, VisitorRecord};
use async_trait::async_trait;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Default)]
struct LedgerState {
    stats: VisitStats,
    visitors: HashMap<String, VisitorRecord>,
}

/// Process-local ledger. Everything is lost on restart.
///
/// Counters and the set of seen visitors live behind one mutex so the
/// check-then-increment in [`Ledger::record_visit`] runs as a single unit.
#[derive(Default)]
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn init(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn record_visit(&self, visitor_id: &str) -> LedgerResult<VisitOutcome> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let is_new = match state.visitors.entry(visitor_id.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(VisitorRecord {
                    id: visitor_id.to_string(),
                    first_seen: now_secs(),
                });
                true
            }
            Entry::Occupied(_) => false,
        };

        state.stats.total_visits += 1;
        if is_new {
            state.stats.unique_visitors += 1;
        }

        tracing::debug!(visitor_id, is_new, "recorded visit in memory");

        Ok(VisitOutcome {
            stats: state.stats,
            is_new,
        })
    }

    async fn read_stats(&self) -> LedgerResult<VisitStats> {
        Ok(self.state.lock().await.stats)
    }

    async fn find_visitor(&self, visitor_id: &str) -> LedgerResult<Option<VisitorRecord>> {
        Ok(self.state.lock().await.visitors.get(visitor_id).cloned())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_empty_ledger_reads_zero() {
        let ledger = MemoryLedger::new();
        assert_eq!(ledger.read_stats().await.unwrap(), VisitStats::new(0, 0));
        assert!(ledger.find_visitor("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_repeat_visitor_counts_once() {
        let ledger = MemoryLedger::new();

        let first = ledger.record_visit("abc").await.unwrap();
        assert!(first.is_new);
        assert_eq!(first.stats, VisitStats::new(1, 1));

        let second = ledger.record_visit("abc").await.unwrap();
        assert!(!second.is_new);
        assert_eq!(second.stats, VisitStats::new(2, 1));

        let record = ledger.find_visitor("abc").await.unwrap().unwrap();
        assert_eq!(record.id, "abc");
        assert!(record.first_seen > 0);
    }

    #[tokio::test]
    async fn test_concurrent_same_new_visitor() {
        let ledger = Arc::new(MemoryLedger::new());

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                tokio::spawn(async move { ledger.record_visit("racer").await.unwrap() })
            })
            .collect();

        let mut new_count = 0;
        for handle in handles {
            if handle.await.unwrap().is_new {
                new_count += 1;
            }
        }

        assert_eq!(new_count, 1, "only one of the racing visits may be new");
        assert_eq!(ledger.read_stats().await.unwrap(), VisitStats::new(2, 1));
    }
}

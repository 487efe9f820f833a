use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A visitor the ledger has seen at least once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct VisitorRecord {
    pub id: String,
    /// Unix timestamp (seconds) of the first recorded visit
    pub first_seen: i64,
}

/// Snapshot of the two running totals.
///
/// `unique_visitors <= total_visits` holds for every snapshot a ledger hands out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitStats {
    pub total_visits: u64,
    pub unique_visitors: u64,
}

impl VisitStats {
    pub const fn new(total_visits: u64, unique_visitors: u64) -> Self {
        Self {
            total_visits,
            unique_visitors,
        }
    }

    /// Build a snapshot from the signed BIGINT columns of the aggregate row
    pub(crate) fn from_row(total_visits: i64, unique_visitors: i64) -> Self {
        Self {
            total_visits: total_visits.max(0) as u64,
            unique_visitors: unique_visitors.max(0) as u64,
        }
    }
}

/// Result of recording a single visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitOutcome {
    pub stats: VisitStats,
    /// Whether this visit created the visitor record
    pub is_new: bool,
}

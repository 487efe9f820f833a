use crate::ledger::trait_def::with_timeout;
use crate::ledger::{Ledger, LedgerResult};
use crate::models::{VisitOutcome, VisitStats, VisitorRecord};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub struct SqliteLedger {
    pool: Arc<SqlitePool>,
    timeout: Duration,
    /// SQLite has a single writer; queue visits here instead of on SQLITE_BUSY
    write_lock: Mutex<()>,
}

impl SqliteLedger {
    pub fn new(database_url: &str, max_connections: u32, timeout: Duration) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(timeout)
            .connect_lazy_with(options);

        Ok(Self {
            pool: Arc::new(pool),
            timeout,
            write_lock: Mutex::new(()),
        })
    }
}

#[async_trait]
impl Ledger for SqliteLedger {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS visit_stats (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                total_visits INTEGER NOT NULL DEFAULT 0,
                unique_visitors INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS visitors (
                id TEXT PRIMARY KEY,
                first_seen INTEGER NOT NULL DEFAULT (CAST(strftime('%s', 'now') AS INTEGER))
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            INSERT INTO visit_stats (id, total_visits, unique_visitors)
            VALUES (1, 0, 0)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn record_visit(&self, visitor_id: &str) -> LedgerResult<VisitOutcome> {
        let _writer = self.write_lock.lock().await;

        let (stats, is_new) = with_timeout(self.timeout, async {
            let mut tx = self.pool.begin().await?;

            let is_new = sqlx::query(
                r#"
                INSERT INTO visitors (id)
                VALUES (?)
                ON CONFLICT(id) DO NOTHING
                "#,
            )
            .bind(visitor_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
                > 0;

            let (total, unique) = sqlx::query_as::<_, (i64, i64)>(
                r#"
                INSERT INTO visit_stats (id, total_visits, unique_visitors)
                VALUES (1, 1, ?)
                ON CONFLICT(id) DO UPDATE
                SET total_visits = total_visits + 1,
                    unique_visitors = unique_visitors + excluded.unique_visitors
                RETURNING total_visits, unique_visitors
                "#,
            )
            .bind(i64::from(is_new))
            .fetch_one(&mut *tx)
            .await?;

            tx.commit().await?;

            Ok::<_, sqlx::Error>((VisitStats::from_row(total, unique), is_new))
        })
        .await?;

        tracing::debug!(visitor_id, is_new, "recorded visit in sqlite");

        Ok(VisitOutcome { stats, is_new })
    }

    async fn read_stats(&self) -> LedgerResult<VisitStats> {
        let row = with_timeout(
            self.timeout,
            sqlx::query_as::<_, (i64, i64)>(
                r#"
                SELECT total_visits, unique_visitors
                FROM visit_stats
                WHERE id = 1
                "#,
            )
            .fetch_optional(self.pool.as_ref()),
        )
        .await?;

        Ok(row
            .map(|(total, unique)| VisitStats::from_row(total, unique))
            .unwrap_or_default())
    }

    async fn find_visitor(&self, visitor_id: &str) -> LedgerResult<Option<VisitorRecord>> {
        with_timeout(
            self.timeout,
            sqlx::query_as::<_, VisitorRecord>(
                r#"
                SELECT id, first_seen
                FROM visitors
                WHERE id = ?
                "#,
            )
            .bind(visitor_id)
            .fetch_optional(self.pool.as_ref()),
        )
        .await
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}

use crate::ledger::trait_def::with_timeout;
use crate::ledger::{Ledger, LedgerResult};
use crate::models::{VisitOutcome, VisitStats, VisitorRecord};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub struct PostgresLedger {
    pool: Arc<PgPool>,
    timeout: Duration,
}

impl PostgresLedger {
    /// Create a lazily connecting pool. With `require_tls` the connection is
    /// encrypted but the server certificate is not verified.
    pub fn new(
        database_url: &str,
        max_connections: u32,
        timeout: Duration,
        require_tls: bool,
    ) -> Result<Self> {
        let mut options = PgConnectOptions::from_str(database_url)?;
        if require_tls {
            options = options.ssl_mode(PgSslMode::Require);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(timeout)
            .connect_lazy_with(options);

        Ok(Self {
            pool: Arc::new(pool),
            timeout,
        })
    }
}

#[async_trait]
impl Ledger for PostgresLedger {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS visit_stats (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                total_visits BIGINT NOT NULL DEFAULT 0,
                unique_visitors BIGINT NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS visitors (
                id TEXT PRIMARY KEY,
                first_seen TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            INSERT INTO visit_stats (id, total_visits, unique_visitors)
            VALUES (1, 0, 0)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn record_visit(&self, visitor_id: &str) -> LedgerResult<VisitOutcome> {
        // One statement: the visitor insert and the counter upsert commit together.
        // A concurrent insert of the same id waits on the primary key and then
        // takes the DO NOTHING branch, so it cannot bump unique_visitors twice.
        let (total, unique, is_new) = with_timeout(
            self.timeout,
            sqlx::query_as::<_, (i64, i64, bool)>(
                r#"
                WITH inserted AS (
                    INSERT INTO visitors (id)
                    VALUES ($1)
                    ON CONFLICT (id) DO NOTHING
                    RETURNING 1
                ),
                fresh AS (
                    SELECT COUNT(*)::BIGINT AS n FROM inserted
                )
                INSERT INTO visit_stats AS s (id, total_visits, unique_visitors)
                SELECT 1, 1, fresh.n FROM fresh
                ON CONFLICT (id) DO UPDATE
                SET total_visits = s.total_visits + 1,
                    unique_visitors = s.unique_visitors + EXCLUDED.unique_visitors
                RETURNING s.total_visits, s.unique_visitors, (SELECT n FROM fresh) > 0
                "#,
            )
            .bind(visitor_id)
            .fetch_one(self.pool.as_ref()),
        )
        .await?;

        tracing::debug!(visitor_id, is_new, "recorded visit in postgres");

        Ok(VisitOutcome {
            stats: VisitStats::from_row(total, unique),
            is_new,
        })
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
                SELECT id, EXTRACT(EPOCH FROM first_seen)::BIGINT AS first_seen
                FROM visitors
                WHERE id = $1
                "#,
            )
            .bind(visitor_id)
            .fetch_optional(self.pool.as_ref()),
        )
        .await
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

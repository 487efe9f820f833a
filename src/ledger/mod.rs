pub mod memory;
pub mod postgres;
pub mod sqlite;
pub mod trait_def;

pub use memory::MemoryLedger;
pub use postgres::PostgresLedger;
pub use sqlite::SqliteLedger;
pub use trait_def::{Ledger, LedgerResult, PersistenceError};

use crate::config::{DatabaseBackend, DatabaseConfig};
use anyhow::Result;
use std::sync::Arc;

/// Build the ledger selected by configuration. Pools connect lazily, so an
/// unreachable database surfaces on the first operation rather than here.
pub fn connect(database: Option<&DatabaseConfig>) -> Result<Arc<dyn Ledger>> {
    let ledger: Arc<dyn Ledger> = match database {
        None => Arc::new(MemoryLedger::new()),
        Some(db) => match db.backend {
            DatabaseBackend::Postgres => Arc::new(PostgresLedger::new(
                &db.url,
                db.max_connections,
                db.timeout(),
                db.require_tls,
            )?),
            DatabaseBackend::Sqlite => Arc::new(SqliteLedger::new(
                &db.url,
                db.max_connections,
                db.timeout(),
            )?),
        },
    };

    Ok(ledger)
}

// SQLite Connection Pool Setup

use crate::error::map_sqlx_error;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};
use vexpersist_core::{Result, UnitConfig};

fn is_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Create the unit's connection pool (WAL journal, busy timeout)
pub async fn create_pool(unit: &UnitConfig) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&unit.url)
        .map_err(map_sqlx_error)?
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(unit.busy_timeout_secs))
        .create_if_missing(unit.create_if_missing)
        .foreign_keys(unit.foreign_keys);

    let mut pool_options = SqlitePoolOptions::new().max_connections(unit.max_connections.max(1));
    if is_memory(&unit.url) {
        // Every connection to :memory: is its own database, keep exactly one alive
        if unit.max_connections > 1 {
            warn!(url = %unit.url, "In-memory database limited to one connection");
        }
        pool_options = pool_options
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    let pool = pool_options
        .connect_with(options)
        .await
        .map_err(map_sqlx_error)?;

    debug!(url = %unit.url, "SQLite pool ready");
    Ok(pool)
}

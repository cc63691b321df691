// Schema script runner

use crate::error::map_sqlx_error;
use sqlx::SqlitePool;
use tracing::info;
use vexpersist_core::domain::split_statements;
use vexpersist_core::Result;

const VERSION_TABLE: &str = "vexpersist_schema_version";

/// Apply every script past the recorded version, one transaction each.
/// Returns the schema version afterwards.
pub async fn apply_schema(pool: &SqlitePool, scripts: &[String]) -> Result<i64> {
    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {} (version INTEGER PRIMARY KEY, applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP)",
        VERSION_TABLE
    ))
    .execute(pool)
    .await
    .map_err(map_sqlx_error)?;

    let current_version: i64 = sqlx::query_scalar(&format!(
        "SELECT COALESCE(MAX(version), 0) FROM {}",
        VERSION_TABLE
    ))
    .fetch_one(pool)
    .await
    .map_err(map_sqlx_error)?;

    let mut version = current_version;
    for (idx, script) in scripts.iter().enumerate() {
        let target = idx as i64 + 1;
        if target <= current_version {
            continue;
        }
        info!(version = target, "Applying schema script");
        apply_script(pool, script, target).await?;
        version = target;
    }
    Ok(version)
}

async fn apply_script(pool: &SqlitePool, script: &str, version: i64) -> Result<()> {
    let statements = split_statements(script)?;

    let mut tx = pool.begin().await.map_err(map_sqlx_error)?;
    for statement in &statements {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
    }
    sqlx::query(&format!("INSERT INTO {} (version) VALUES (?)", VERSION_TABLE))
        .bind(version)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
    tx.commit().await.map_err(map_sqlx_error)?;
    Ok(())
}

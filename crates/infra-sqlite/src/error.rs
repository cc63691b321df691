// sqlx::Error -> PersistenceError
//
// Conversion lives here because of the orphan rule: core cannot depend on
// sqlx and this crate cannot implement From<sqlx::Error> for a core type.

use vexpersist_core::PersistenceError;

pub(crate) fn map_sqlx_error(err: sqlx::Error) -> PersistenceError {
    match &err {
        sqlx::Error::Database(db_err) => {
            if let Some(code) = db_err.code() {
                let code_str = code.as_ref();

                // SQLite result codes: https://www.sqlite.org/rescode.html
                match code_str {
                    "2067" | "1555" => PersistenceError::Database(format!(
                        "Unique constraint violation: {} ({})",
                        db_err.message(),
                        code_str
                    )),
                    "787" | "3850" => PersistenceError::Database(format!(
                        "Foreign key constraint violation: {} ({})",
                        db_err.message(),
                        code_str
                    )),
                    "1299" => PersistenceError::Database(format!(
                        "NOT NULL constraint violation: {}",
                        db_err.message()
                    )),
                    "5" => PersistenceError::Database(format!(
                        "Database locked (SQLITE_BUSY): {}",
                        db_err.message()
                    )),
                    "13" => PersistenceError::Database(format!("Database full: {}", db_err.message())),
                    _ => PersistenceError::Database(format!(
                        "Database error [{}]: {}",
                        code_str,
                        db_err.message()
                    )),
                }
            } else {
                PersistenceError::Database(format!("Database error: {}", db_err.message()))
            }
        }
        sqlx::Error::RowNotFound => PersistenceError::Database("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => {
            PersistenceError::Database(format!("Column not found: {}", col))
        }
        sqlx::Error::PoolClosed => {
            PersistenceError::SessionClosed("connection pool is closed".to_string())
        }
        sqlx::Error::PoolTimedOut => {
            PersistenceError::Database("Timed out acquiring a connection".to_string())
        }
        sqlx::Error::Configuration(e) => PersistenceError::Config(e.to_string()),
        _ => PersistenceError::Database(err.to_string()),
    }
}

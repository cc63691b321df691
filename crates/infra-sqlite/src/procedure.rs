// Stored procedures for SQLite: catalog-defined bodies run in a savepoint

use crate::codec::{decode_rows, prepare};
use crate::error::map_sqlx_error;
use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::Sqlite;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};
use vexpersist_core::domain::{Catalog, DomainError, ParsedQuery, ProcedureCall, ResultSet, Value};
use vexpersist_core::port::ProcedureConnection;
use vexpersist_core::{PersistenceError, Result};

const SAVEPOINT: &str = "vexpersist_call";

/// SQLite has no stored procedures. A procedure is a catalog entry whose
/// body statements run in order inside a savepoint; IN values bind by
/// ordinal (`?1`) or by declared parameter name (`:name`). The result is
/// the final statement's rows.
pub struct SqliteProcedureConnection {
    conn: Option<PoolConnection<Sqlite>>,
    catalog: Arc<Catalog>,
}

impl SqliteProcedureConnection {
    pub(crate) fn new(conn: PoolConnection<Sqlite>, catalog: Arc<Catalog>) -> Self {
        Self {
            conn: Some(conn),
            catalog,
        }
    }

    async fn control(conn: &mut PoolConnection<Sqlite>, sql: &str) -> Result<()> {
        sqlx::query(sql)
            .execute(&mut **conn)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn run_body(
        conn: &mut PoolConnection<Sqlite>,
        statements: &[ParsedQuery],
        positional: &[Value],
        named: &BTreeMap<String, Value>,
    ) -> Result<ResultSet> {
        let mut last = Vec::new();
        for query in statements {
            let statement = query.bind_values(positional, named)?;
            let rows = prepare(&statement)
                .fetch_all(&mut **conn)
                .await
                .map_err(map_sqlx_error)?;
            last = decode_rows(&rows)?;
        }
        Ok(ResultSet::new(last))
    }
}

#[async_trait]
impl ProcedureConnection for SqliteProcedureConnection {
    async fn call(&mut self, call: &ProcedureCall) -> Result<ResultSet> {
        let definition = self.catalog.procedure(call.signature.procedure())?;
        if definition.params.len() != call.in_params.len() {
            return Err(DomainError::ValidationError(format!(
                "procedure '{}' takes {} parameter(s), got {}",
                definition.name,
                definition.params.len(),
                call.in_params.len()
            ))
            .into());
        }
        let statements = definition.statements()?;
        let named: BTreeMap<String, Value> = definition
            .params
            .iter()
            .map(|p| p.trim_start_matches(':').to_string())
            .zip(call.in_params.iter().cloned())
            .collect();

        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| PersistenceError::SessionClosed("procedure connection is closed".to_string()))?;

        debug!(call = %call.signature, statements = statements.len(), "Running procedure body");
        Self::control(conn, &format!("SAVEPOINT {}", SAVEPOINT)).await?;
        match Self::run_body(conn, &statements, &call.in_params, &named).await {
            Ok(rows) => {
                Self::control(conn, &format!("RELEASE SAVEPOINT {}", SAVEPOINT)).await?;
                Ok(rows)
            }
            Err(e) => {
                for undo in [
                    format!("ROLLBACK TO SAVEPOINT {}", SAVEPOINT),
                    format!("RELEASE SAVEPOINT {}", SAVEPOINT),
                ] {
                    if let Err(undo_err) = Self::control(conn, &undo).await {
                        warn!(error = %undo_err, sql = %undo, "Undoing procedure savepoint failed");
                    }
                }
                Err(e)
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            drop(conn);
        }
        Ok(())
    }
}

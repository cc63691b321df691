// SQLite Session: one pooled connection with explicit transaction control

use crate::codec::{decode_rows, prepare};
use crate::error::map_sqlx_error;
use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::Sqlite;
use std::sync::Arc;
use tracing::{debug, warn};
use vexpersist_core::domain::{Catalog, Record, Statement};
use vexpersist_core::port::Session;
use vexpersist_core::{PersistenceError, Result};

pub struct SqliteSession {
    conn: Option<PoolConnection<Sqlite>>,
    catalog: Arc<Catalog>,
    in_tx: bool,
}

impl SqliteSession {
    pub(crate) fn new(conn: PoolConnection<Sqlite>, catalog: Arc<Catalog>) -> Self {
        Self {
            conn: Some(conn),
            catalog,
            in_tx: false,
        }
    }

    fn conn(&mut self) -> Result<&mut PoolConnection<Sqlite>> {
        self.conn
            .as_mut()
            .ok_or_else(|| PersistenceError::SessionClosed("session is closed".to_string()))
    }

    async fn control(&mut self, sql: &'static str) -> Result<()> {
        let conn = self.conn()?;
        sqlx::query(sql)
            .execute(&mut **conn)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[async_trait]
impl Session for SqliteSession {
    fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }

    fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    fn in_transaction(&self) -> bool {
        self.in_tx
    }

    async fn fetch_all(&mut self, statement: &Statement) -> Result<Vec<Record>> {
        let conn = self.conn()?;
        let rows = prepare(statement)
            .fetch_all(&mut **conn)
            .await
            .map_err(map_sqlx_error)?;
        decode_rows(&rows)
    }

    async fn execute(&mut self, statement: &Statement) -> Result<u64> {
        let conn = self.conn()?;
        let done = prepare(statement)
            .execute(&mut **conn)
            .await
            .map_err(map_sqlx_error)?;
        Ok(done.rows_affected())
    }

    async fn begin(&mut self) -> Result<()> {
        if self.in_tx {
            return Err(PersistenceError::Transaction(
                "transaction already active".to_string(),
            ));
        }
        self.control("BEGIN").await?;
        self.in_tx = true;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        if !self.in_tx {
            return Err(PersistenceError::Transaction("no active transaction".to_string()));
        }
        self.control("COMMIT").await?;
        self.in_tx = false;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        if !self.in_tx {
            return Err(PersistenceError::Transaction("no active transaction".to_string()));
        }
        // SQLite may already have rolled back (e.g. after SQLITE_FULL)
        let result = self.control("ROLLBACK").await;
        self.in_tx = false;
        result
    }

    async fn close(&mut self) -> Result<()> {
        let rolled_back = if self.in_tx { self.rollback().await } else { Ok(()) };
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        match rolled_back {
            Ok(()) => {
                drop(conn);
                debug!("SQLite session returned its connection");
                Ok(())
            }
            Err(e) => {
                // Connection state unknown, do not hand it back to the pool
                if let Err(close_err) = conn.close().await {
                    warn!(error = %close_err, "Closing connection failed");
                }
                Err(e)
            }
        }
    }
}

impl Drop for SqliteSession {
    fn drop(&mut self) {
        if self.in_tx {
            if let Some(conn) = self.conn.take() {
                warn!("SQLite session dropped inside a transaction, discarding connection");
                drop(conn.detach());
            }
        }
    }
}

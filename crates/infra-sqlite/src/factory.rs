// SQLite SessionFactory and PersistenceProvider

use crate::connection::create_pool;
use crate::error::map_sqlx_error;
use crate::procedure::SqliteProcedureConnection;
use crate::schema::apply_schema;
use crate::session::SqliteSession;
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;
use vexpersist_core::domain::error::Result as DomainResult;
use vexpersist_core::domain::{Catalog, Entity};
use vexpersist_core::port::{PersistenceProvider, Session, SessionFactory};
use vexpersist_core::{CallableConnection, PersistenceConfig, PersistenceError, Result, UnitConfig};

/// Sessions for one persistence unit, drawn from its pool
pub struct SqliteSessionFactory {
    unit_name: String,
    pool: SqlitePool,
    catalog: Arc<Catalog>,
}

impl SqliteSessionFactory {
    pub fn new(unit_name: impl Into<String>, pool: SqlitePool, catalog: Catalog) -> Self {
        Self {
            unit_name: unit_name.into(),
            pool,
            catalog: Arc::new(catalog),
        }
    }

    /// Create the pool, apply schema scripts and build the catalog
    pub async fn connect(unit_name: &str, unit: &UnitConfig) -> Result<Self> {
        Self::connect_with(unit_name, unit, |_| Ok(())).await
    }

    async fn connect_with<F>(unit_name: &str, unit: &UnitConfig, extend: F) -> Result<Self>
    where
        F: FnOnce(&mut Catalog) -> Result<()>,
    {
        let mut catalog = unit.catalog()?;
        extend(&mut catalog)?;
        let pool = create_pool(unit).await?;
        let version = apply_schema(&pool, &unit.schema).await?;
        info!(
            unit = %unit_name,
            schema_version = version,
            named_queries = catalog.named_query_names().len(),
            procedures = catalog.procedure_names().len(),
            "Session factory ready"
        );
        Ok(Self::new(unit_name, pool, catalog))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }

    async fn acquire(&self) -> Result<sqlx::pool::PoolConnection<sqlx::Sqlite>> {
        if self.pool.is_closed() {
            return Err(PersistenceError::SessionClosed(format!(
                "session factory for '{}' is closed",
                self.unit_name
            )));
        }
        self.pool.acquire().await.map_err(map_sqlx_error)
    }

    pub async fn open(&self) -> Result<SqliteSession> {
        Ok(SqliteSession::new(self.acquire().await?, self.catalog()))
    }

    pub async fn procedure_connection(&self) -> Result<SqliteProcedureConnection> {
        Ok(SqliteProcedureConnection::new(self.acquire().await?, self.catalog()))
    }

    /// Procedure connection wrapped for `StoredProcedureFactory`
    pub async fn callable_connection(&self) -> Result<CallableConnection> {
        Ok(CallableConnection::new(self.procedure_connection().await?))
    }
}

#[async_trait]
impl SessionFactory for SqliteSessionFactory {
    fn unit_name(&self) -> &str {
        &self.unit_name
    }

    async fn open_session(&self) -> Result<Box<dyn Session>> {
        Ok(Box::new(self.open().await?))
    }

    fn is_open(&self) -> bool {
        !self.pool.is_closed()
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

type Registration = (String, fn(&mut Catalog) -> DomainResult<()>);

/// Resolves unit names from a `PersistenceConfig`
pub struct SqlitePersistenceProvider {
    config: PersistenceConfig,
    registrations: Vec<Registration>,
}

impl SqlitePersistenceProvider {
    pub fn new(config: PersistenceConfig) -> Self {
        Self {
            config,
            registrations: Vec::new(),
        }
    }

    /// Add an entity's declared named queries to a unit's catalog
    pub fn register<T: Entity>(mut self, unit_name: &str) -> Self {
        let register: fn(&mut Catalog) -> DomainResult<()> = Catalog::register::<T>;
        self.registrations.push((unit_name.to_string(), register));
        self
    }

    pub fn config(&self) -> &PersistenceConfig {
        &self.config
    }

    pub async fn connect(&self, unit_name: &str) -> Result<SqliteSessionFactory> {
        let unit = self.config.unit(unit_name)?;
        SqliteSessionFactory::connect_with(unit_name, unit, |catalog| {
            for (unit, register) in &self.registrations {
                if unit.eq_ignore_ascii_case(unit_name) {
                    register(catalog)?;
                }
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl PersistenceProvider for SqlitePersistenceProvider {
    async fn create_session_factory(&self, unit_name: &str) -> Result<Arc<dyn SessionFactory>> {
        Ok(Arc::new(self.connect(unit_name).await?))
    }
}

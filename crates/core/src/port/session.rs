// Session ports: the runtime's unit-of-work and how it is obtained

use crate::domain::{Catalog, Record, Statement};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// A unit-of-work handle supplied by the persistence runtime
#[async_trait]
pub trait Session: Send {
    /// Named queries and procedures of the unit this session belongs to
    fn catalog(&self) -> Arc<Catalog>;

    fn is_open(&self) -> bool;

    fn in_transaction(&self) -> bool;

    /// Run a row-returning statement
    async fn fetch_all(&mut self, statement: &Statement) -> Result<Vec<Record>>;

    /// Run a statement, returning the number of affected rows
    async fn execute(&mut self, statement: &Statement) -> Result<u64>;

    async fn begin(&mut self) -> Result<()>;

    async fn commit(&mut self) -> Result<()>;

    async fn rollback(&mut self) -> Result<()>;

    /// Release the session; an active transaction is rolled back.
    /// Closing an already closed session is a no-op.
    async fn close(&mut self) -> Result<()>;
}

/// Opens sessions for one persistence unit
#[async_trait]
pub trait SessionFactory: Send + Sync {
    fn unit_name(&self) -> &str;

    async fn open_session(&self) -> Result<Box<dyn Session>>;

    fn is_open(&self) -> bool;

    async fn close(&self);
}

/// Resolves persistence-unit names into session factories
#[async_trait]
pub trait PersistenceProvider: Send + Sync {
    async fn create_session_factory(&self, unit_name: &str) -> Result<Arc<dyn SessionFactory>>;
}

// Named queries resolved from the session's catalog

use super::scope::{SessionLease, SessionScope};
use crate::domain::{Params, Record, Statement, Window};
use crate::error::{PersistenceError, Result};
use crate::port::{NamedQuery, NamedQueryHooks, NoHooks};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub struct NamedQueryHandler {
    scope: SessionScope,
    hooks: Arc<dyn NamedQueryHooks>,
}

impl NamedQueryHandler {
    pub fn new(scope: SessionScope) -> Self {
        Self {
            scope,
            hooks: Arc::new(NoHooks),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn NamedQueryHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn scope(&self) -> &SessionScope {
        &self.scope
    }

    fn resolve(
        lease: &mut SessionLease,
        name: &str,
        window: Option<Window>,
        params: &Params,
    ) -> Result<Statement> {
        let catalog = lease.catalog()?;
        let query = catalog.named_query(name)?;
        let statement = match window {
            Some(window) => query.windowed(window).bind(params)?,
            None => query.bind(params)?,
        };
        Ok(statement)
    }

    async fn run_find(&self, name: &str, window: Option<Window>, params: &Params) -> Result<Vec<Record>> {
        let mut lease = self.scope.lease().await?;
        let outcome = match Self::resolve(&mut lease, name, window, params) {
            Ok(statement) => lease.fetch_all(&statement).await,
            Err(e) => Err(e),
        };
        lease.release(outcome).await
    }

    async fn run_exec(&self, name: &str, params: &Params) -> Result<u64> {
        let mut lease = self.scope.lease().await?;
        let outcome = match Self::resolve(&mut lease, name, None, params) {
            Ok(statement) => Self::execute(&mut lease, &statement).await,
            Err(e) => Err(e),
        };
        lease.release(outcome).await
    }

    async fn execute(lease: &mut SessionLease, statement: &Statement) -> Result<u64> {
        lease.begin().await?;
        let outcome = lease.execute(statement).await;
        lease.finish(outcome).await
    }

    async fn find(&self, name: &str, window: Option<Window>, params: Params) -> Result<Vec<Record>> {
        self.hooks.before_find(name, &params);
        let outcome = self.run_find(name, window, &params).await;
        self.hooks.after_find(name, &params);
        if let Ok(rows) = &outcome {
            debug!(query = %name, rows = rows.len(), "find_by_named_query");
        }
        outcome.map_err(|e| PersistenceError::failed("find_by_named_query", e))
    }
}

#[async_trait]
impl NamedQuery for NamedQueryHandler {
    async fn find_by_named_query(&self, name: &str, params: Params) -> Result<Vec<Record>> {
        self.find(name, None, params).await
    }

    async fn find_by_named_query_windowed(
        &self,
        name: &str,
        first_result: Option<usize>,
        max_results: Option<usize>,
        params: Params,
    ) -> Result<Vec<Record>> {
        self.find(name, Window::from_bounds(first_result, max_results), params)
            .await
    }

    async fn exec_by_named_query(&self, name: &str, params: Params) -> Result<u64> {
        self.hooks.before_exec(name, &params);
        let outcome = self.run_exec(name, &params).await;
        self.hooks.after_exec(name, &params);
        if let Ok(affected) = &outcome {
            debug!(query = %name, affected, "exec_by_named_query");
        }
        outcome.map_err(|e| PersistenceError::failed("exec_by_named_query", e))
    }
}

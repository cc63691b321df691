// Handler factories: one per facade, handing out scoped handlers

use super::connection::LocalPersistenceConnection;
use super::dao::DaoHandler;
use super::injected::InjectedSession;
use super::named_query::NamedQueryHandler;
use super::scope::SessionScope;
use super::stored_procedure::{CallableConnection, StoredProcedureHandler};
use crate::port::{DaoHooks, NamedQueryHooks, NoHooks};
use std::sync::Arc;

/// Session a factory hands to its handlers
#[derive(Clone, Debug)]
pub enum SessionSource {
    Local(Arc<LocalPersistenceConnection>),
    Injected(InjectedSession),
}

impl SessionSource {
    /// `keep_alive` only matters for local sessions
    fn scope(&self, keep_alive: bool) -> SessionScope {
        match self {
            SessionSource::Local(connection) => {
                SessionScope::local(Arc::clone(connection), keep_alive)
            }
            SessionSource::Injected(session) => SessionScope::Injected(session.clone()),
        }
    }
}

pub struct DaoFactory {
    source: SessionSource,
    hooks: Arc<dyn DaoHooks>,
}

impl DaoFactory {
    pub fn new(source: SessionSource) -> Self {
        Self {
            source,
            hooks: Arc::new(NoHooks),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn DaoHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// DAO whose local session closes after every call
    pub fn create_dao(&self) -> DaoHandler {
        self.create_dao_with(false)
    }

    pub fn create_dao_with(&self, keep_alive: bool) -> DaoHandler {
        DaoHandler::new(self.source.scope(keep_alive)).with_hooks(Arc::clone(&self.hooks))
    }
}

pub struct NamedQueryFactory {
    source: SessionSource,
    hooks: Arc<dyn NamedQueryHooks>,
}

impl NamedQueryFactory {
    pub fn new(source: SessionSource) -> Self {
        Self {
            source,
            hooks: Arc::new(NoHooks),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn NamedQueryHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn create_named_query(&self) -> NamedQueryHandler {
        self.create_named_query_with(false)
    }

    pub fn create_named_query_with(&self, keep_alive: bool) -> NamedQueryHandler {
        NamedQueryHandler::new(self.source.scope(keep_alive)).with_hooks(Arc::clone(&self.hooks))
    }
}

pub struct StoredProcedureFactory {
    connection: CallableConnection,
}

impl StoredProcedureFactory {
    pub fn new(connection: CallableConnection) -> Self {
        Self { connection }
    }

    pub fn create_stored_procedure(&self) -> StoredProcedureHandler {
        StoredProcedureHandler::new(self.connection.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{FakeProvider, FakeSession, Journal};

    #[test]
    fn test_scope_follows_source_and_flag() {
        let provider = FakeProvider::new();
        let local = SessionSource::Local(Arc::new(LocalPersistenceConnection::new(
            "main", provider,
        )));
        let factory = DaoFactory::new(local);
        assert!(!factory.create_dao().scope().keep_alive());
        assert!(factory.create_dao_with(true).scope().keep_alive());

        let injected = SessionSource::Injected(InjectedSession::new(FakeSession::new(Journal::new())));
        let factory = NamedQueryFactory::new(injected);
        let handler = factory.create_named_query_with(false);
        assert!(!handler.scope().is_local());
    }
}

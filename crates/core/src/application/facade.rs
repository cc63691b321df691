// Entry point: pick how sessions are obtained, get handler factories

use super::connection::LocalPersistenceConnection;
use super::factory::{DaoFactory, NamedQueryFactory, SessionSource, StoredProcedureFactory};
use super::injected::InjectedSession;
use super::locator::ServiceLocator;
use super::stored_procedure::CallableConnection;
use std::sync::Arc;

/// Factories for one way of obtaining sessions
pub trait PersistentSessionFacade: Send + Sync {
    fn dao_factory(&self) -> DaoFactory;

    fn named_query_factory(&self) -> NamedQueryFactory;

    fn stored_procedure_factory(&self, connection: CallableConnection) -> StoredProcedureFactory {
        StoredProcedureFactory::new(connection)
    }
}

/// Sessions come from a persistence unit's local connection
#[derive(Debug, Clone)]
pub struct LocalSessionFacade {
    connection: Arc<LocalPersistenceConnection>,
}

impl LocalSessionFacade {
    pub fn connection(&self) -> &Arc<LocalPersistenceConnection> {
        &self.connection
    }
}

impl PersistentSessionFacade for LocalSessionFacade {
    fn dao_factory(&self) -> DaoFactory {
        DaoFactory::new(SessionSource::Local(Arc::clone(&self.connection)))
    }

    fn named_query_factory(&self) -> NamedQueryFactory {
        NamedQueryFactory::new(SessionSource::Local(Arc::clone(&self.connection)))
    }
}

/// Sessions are supplied by the caller
#[derive(Debug, Clone)]
pub struct InjectedSessionFacade {
    session: InjectedSession,
}

impl InjectedSessionFacade {
    pub fn session(&self) -> &InjectedSession {
        &self.session
    }
}

impl PersistentSessionFacade for InjectedSessionFacade {
    fn dao_factory(&self) -> DaoFactory {
        DaoFactory::new(SessionSource::Injected(self.session.clone()))
    }

    fn named_query_factory(&self) -> NamedQueryFactory {
        NamedQueryFactory::new(SessionSource::Injected(self.session.clone()))
    }
}

pub struct PersistentFacade;

impl PersistentFacade {
    pub fn local(locator: &ServiceLocator, unit_name: &str) -> LocalSessionFacade {
        LocalSessionFacade {
            connection: locator.persistence_connection(unit_name),
        }
    }

    pub fn injected(session: InjectedSession) -> InjectedSessionFacade {
        InjectedSessionFacade { session }
    }

    /// The unit's connection, for explicit transactions across calls
    pub fn persistence_connection(
        locator: &ServiceLocator,
        unit_name: &str,
    ) -> Arc<LocalPersistenceConnection> {
        locator.persistence_connection(unit_name)
    }
}

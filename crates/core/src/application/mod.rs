// Application Layer - session lifecycle, handlers, factories, facade

pub mod connection;
pub mod dao;
pub mod facade;
pub mod factory;
pub mod injected;
pub mod locator;
pub mod named_query;
pub mod scope;
pub mod stored_procedure;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::LocalPersistenceConnection;
pub use dao::DaoHandler;
pub use facade::{
    InjectedSessionFacade, LocalSessionFacade, PersistentFacade, PersistentSessionFacade,
};
pub use factory::{DaoFactory, NamedQueryFactory, SessionSource, StoredProcedureFactory};
pub use injected::InjectedSession;
pub use locator::ServiceLocator;
pub use named_query::NamedQueryHandler;
pub use scope::SessionScope;
pub use stored_procedure::{CallableConnection, StoredProcedureHandler};

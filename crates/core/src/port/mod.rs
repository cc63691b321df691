// Port Layer - Interfaces for the persistence runtime and the access modes

pub mod dao;
pub mod hooks;
pub mod named_query;
pub mod procedure_connection;
pub mod session;
pub mod stored_procedure;

// Re-exports
pub use dao::Dao;
pub use hooks::{DaoHooks, NamedQueryHooks, NoHooks};
pub use named_query::NamedQuery;
pub use procedure_connection::ProcedureConnection;
pub use session::{PersistenceProvider, Session, SessionFactory};
pub use stored_procedure::StoredProcedure;

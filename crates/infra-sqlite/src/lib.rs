// Vexpersist Infrastructure - SQLite Adapter
// Implements: Session, SessionFactory, PersistenceProvider, ProcedureConnection

mod codec;
mod connection;
mod error;
mod factory;
mod procedure;
mod schema;
mod session;

pub use connection::create_pool;
pub use factory::{SqlitePersistenceProvider, SqliteSessionFactory};
pub use procedure::SqliteProcedureConnection;
pub use schema::apply_schema;
pub use session::SqliteSession;

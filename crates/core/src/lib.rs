// Vexpersist Core - Domain, Ports & Persistence Facade
// NO database driver dependencies; adapters live in infra crates

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod port;

pub use application::{
    CallableConnection, InjectedSession, LocalPersistenceConnection, PersistentFacade,
    PersistentSessionFacade, ServiceLocator,
};
pub use config::{PersistenceConfig, UnitConfig};
pub use error::{PersistenceError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Service locator: one local connection per persistence unit

use super::connection::LocalPersistenceConnection;
use crate::error::Result;
use crate::port::PersistenceProvider;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

pub struct ServiceLocator {
    provider: Arc<dyn PersistenceProvider>,
    connections: Mutex<HashMap<String, Arc<LocalPersistenceConnection>>>,
}

impl ServiceLocator {
    pub fn new(provider: Arc<dyn PersistenceProvider>) -> Self {
        Self {
            provider,
            connections: Mutex::new(HashMap::new()),
        }
    }

    fn connections(&self) -> MutexGuard<'_, HashMap<String, Arc<LocalPersistenceConnection>>> {
        // The map stays consistent even if a holder panicked
        self.connections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Cached connection for the unit, created on first use.
    /// Unit names are case-insensitive.
    pub fn persistence_connection(&self, unit_name: &str) -> Arc<LocalPersistenceConnection> {
        let key = unit_name.to_ascii_lowercase();
        let mut connections = self.connections();
        Arc::clone(connections.entry(key).or_insert_with(|| {
            info!(unit = %unit_name, "Registering persistence connection");
            Arc::new(LocalPersistenceConnection::new(
                unit_name,
                Arc::clone(&self.provider),
            ))
        }))
    }

    pub fn cached_units(&self) -> Vec<String> {
        let mut units: Vec<String> = self
            .connections()
            .values()
            .map(|c| c.unit_name().to_string())
            .collect();
        units.sort();
        units
    }

    /// Shut every cached connection down concurrently and forget it.
    /// All units are attempted; the first failure is returned.
    pub async fn shutdown_all(&self) -> Result<()> {
        let drained: Vec<Arc<LocalPersistenceConnection>> =
            self.connections().drain().map(|(_, c)| c).collect();

        let results = join_all(drained.iter().map(|c| c.shutdown())).await;

        let mut first_error = None;
        for (connection, result) in drained.iter().zip(results) {
            if let Err(e) = result {
                warn!(unit = %connection.unit_name(), error = %e, "Shutdown failed");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for ServiceLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceLocator")
            .field("units", &self.cached_units())
            .finish()
    }
}

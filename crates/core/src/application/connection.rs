// Local persistence connection: one cached session per persistence unit

use super::scope::SessionLease;
use crate::error::Result;
use crate::port::{PersistenceProvider, Session, SessionFactory};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell, OwnedMutexGuard};
use tracing::{debug, info};

pub(crate) type SessionSlot = Arc<Mutex<Option<Box<dyn Session>>>>;

/// Owns the unit's session factory (created lazily) and a single session
/// that is reopened on demand after being closed.
pub struct LocalPersistenceConnection {
    unit_name: String,
    provider: Arc<dyn PersistenceProvider>,
    factory: OnceCell<Arc<dyn SessionFactory>>,
    slot: SessionSlot,
}

impl LocalPersistenceConnection {
    pub fn new(unit_name: impl Into<String>, provider: Arc<dyn PersistenceProvider>) -> Self {
        Self {
            unit_name: unit_name.into(),
            provider,
            factory: OnceCell::new(),
            slot: Arc::new(Mutex::new(None)),
        }
    }

    pub fn unit_name(&self) -> &str {
        &self.unit_name
    }

    /// A failed initialisation is retried on the next call
    async fn session_factory(&self) -> Result<Arc<dyn SessionFactory>> {
        self.factory
            .get_or_try_init(|| async {
                info!(unit = %self.unit_name, "Creating session factory");
                self.provider.create_session_factory(&self.unit_name).await
            })
            .await
            .cloned()
    }

    async fn open_locked(&self, guard: &mut OwnedMutexGuard<Option<Box<dyn Session>>>) -> Result<()> {
        let needs_open = !matches!(&**guard, Some(s) if s.is_open());
        if needs_open {
            let factory = self.session_factory().await?;
            **guard = Some(factory.open_session().await?);
            debug!(unit = %self.unit_name, "Opened local session");
        }
        Ok(())
    }

    /// Exclusive access to the unit's session, opening it if needed
    pub(crate) async fn lease(&self, keep_alive: bool) -> Result<SessionLease> {
        let mut guard = Arc::clone(&self.slot).lock_owned().await;
        self.open_locked(&mut guard).await?;
        Ok(SessionLease::local(guard, keep_alive))
    }

    pub async fn is_session_open(&self) -> bool {
        self.slot
            .lock()
            .await
            .as_ref()
            .is_some_and(|s| s.is_open())
    }

    pub async fn in_transaction(&self) -> bool {
        self.slot
            .lock()
            .await
            .as_ref()
            .is_some_and(|s| s.is_open() && s.in_transaction())
    }

    pub async fn close_session(&self) -> Result<()> {
        let mut guard = self.slot.lock().await;
        if let Some(mut session) = guard.take() {
            session.close().await?;
            debug!(unit = %self.unit_name, "Closed local session");
        }
        Ok(())
    }

    /// Begin a transaction on the unit's session; handler calls join it
    /// and leave the session open until `commit` or `rollback`.
    pub async fn start_transaction(&self) -> Result<()> {
        let mut guard = Arc::clone(&self.slot).lock_owned().await;
        self.open_locked(&mut guard).await?;
        match guard.as_mut() {
            Some(session) => session.begin().await,
            None => Ok(()),
        }
    }

    /// Commit if a transaction is active
    pub async fn commit(&self) -> Result<()> {
        let mut guard = self.slot.lock().await;
        match guard.as_mut() {
            Some(session) if session.in_transaction() => session.commit().await,
            _ => Ok(()),
        }
    }

    /// Roll back if a transaction is active
    pub async fn rollback(&self) -> Result<()> {
        let mut guard = self.slot.lock().await;
        match guard.as_mut() {
            Some(session) if session.in_transaction() => session.rollback().await,
            _ => Ok(()),
        }
    }

    /// Close the session and the session factory
    pub async fn shutdown(&self) -> Result<()> {
        self.close_session().await?;
        if let Some(factory) = self.factory.get() {
            factory.close().await;
            info!(unit = %self.unit_name, "Session factory closed");
        }
        Ok(())
    }
}

impl std::fmt::Debug for LocalPersistenceConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalPersistenceConnection")
            .field("unit_name", &self.unit_name)
            .field("initialized", &self.factory.initialized())
            .finish()
    }
}

// Caller-owned session handed to the facade

use super::connection::SessionSlot;
use super::scope::SessionLease;
use crate::error::{PersistenceError, Result};
use crate::port::Session;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A session whose lifecycle belongs to the caller.
///
/// Handlers built on it never begin, commit or close anything; the owner
/// drives the transaction through the methods below. Clones share the
/// same session.
#[derive(Clone)]
pub struct InjectedSession {
    slot: SessionSlot,
}

impl InjectedSession {
    pub fn new(session: impl Session + 'static) -> Self {
        Self::from_boxed(Box::new(session))
    }

    pub fn from_boxed(session: Box<dyn Session>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(session))),
        }
    }

    pub(crate) async fn lease(&self) -> Result<SessionLease> {
        let guard = Arc::clone(&self.slot).lock_owned().await;
        let open = guard.as_ref().is_some_and(|s| s.is_open());
        if !open {
            return Err(PersistenceError::SessionClosed(
                "injected session is closed".to_string(),
            ));
        }
        Ok(SessionLease::borrowed(guard))
    }

    pub async fn is_open(&self) -> bool {
        self.slot.lock().await.as_ref().is_some_and(|s| s.is_open())
    }

    pub async fn in_transaction(&self) -> bool {
        self.slot
            .lock()
            .await
            .as_ref()
            .is_some_and(|s| s.is_open() && s.in_transaction())
    }

    pub async fn begin(&self) -> Result<()> {
        self.lease().await?.session()?.begin().await
    }

    pub async fn commit(&self) -> Result<()> {
        self.lease().await?.session()?.commit().await
    }

    pub async fn rollback(&self) -> Result<()> {
        self.lease().await?.session()?.rollback().await
    }

    /// Close the underlying session; later calls fail with `SessionClosed`
    pub async fn close(&self) -> Result<()> {
        let mut guard = self.slot.lock().await;
        match guard.take() {
            Some(mut session) => session.close().await,
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for InjectedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InjectedSession").finish_non_exhaustive()
    }
}

// Session scope and lease: who owns the session, and what happens to it
// after a handler call.

use super::connection::LocalPersistenceConnection;
use super::injected::InjectedSession;
use crate::domain::{Catalog, Record, Statement};
use crate::error::{PersistenceError, Result};
use crate::port::Session;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, warn};

/// Where a handler gets its session from
#[derive(Clone)]
pub enum SessionScope {
    /// Session owned by a local connection; closed after each call unless
    /// `keep_alive` is set
    Local {
        connection: Arc<LocalPersistenceConnection>,
        keep_alive: bool,
    },
    /// Session owned by the caller; never closed and never wrapped in a
    /// transaction
    Injected(InjectedSession),
}

impl SessionScope {
    pub fn local(connection: Arc<LocalPersistenceConnection>, keep_alive: bool) -> Self {
        SessionScope::Local {
            connection,
            keep_alive,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, SessionScope::Local { .. })
    }

    pub fn keep_alive(&self) -> bool {
        match self {
            SessionScope::Local { keep_alive, .. } => *keep_alive,
            SessionScope::Injected(_) => true,
        }
    }

    pub(crate) async fn lease(&self) -> Result<SessionLease> {
        match self {
            SessionScope::Local {
                connection,
                keep_alive,
            } => connection.lease(*keep_alive).await,
            SessionScope::Injected(session) => session.lease().await,
        }
    }
}

impl std::fmt::Debug for SessionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionScope::Local {
                connection,
                keep_alive,
            } => f
                .debug_struct("Local")
                .field("unit", &connection.unit_name())
                .field("keep_alive", keep_alive)
                .finish(),
            SessionScope::Injected(_) => f.write_str("Injected"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ownership {
    Local { keep_alive: bool },
    Borrowed,
}

/// Exclusive use of a session for the length of one handler call.
///
/// Local leases wrap writes in a transaction the lease started itself
/// (`begin`/`finish`) and close the session on `release` unless kept
/// alive. A joined transaction is left to whoever started it. A lease
/// dropped while its own transaction is open discards the session.
pub(crate) struct SessionLease {
    guard: OwnedMutexGuard<Option<Box<dyn Session>>>,
    ownership: Ownership,
    owns_transaction: bool,
}

impl SessionLease {
    pub(crate) fn local(guard: OwnedMutexGuard<Option<Box<dyn Session>>>, keep_alive: bool) -> Self {
        Self {
            guard,
            ownership: Ownership::Local { keep_alive },
            owns_transaction: false,
        }
    }

    pub(crate) fn borrowed(guard: OwnedMutexGuard<Option<Box<dyn Session>>>) -> Self {
        Self {
            guard,
            ownership: Ownership::Borrowed,
            owns_transaction: false,
        }
    }

    pub(crate) fn session(&mut self) -> Result<&mut (dyn Session + 'static)> {
        match self.guard.as_mut() {
            Some(session) if session.is_open() => Ok(&mut **session),
            _ => Err(PersistenceError::SessionClosed(
                "no open session".to_string(),
            )),
        }
    }

    pub(crate) fn catalog(&mut self) -> Result<Arc<Catalog>> {
        Ok(self.session()?.catalog())
    }

    pub(crate) async fn fetch_all(&mut self, statement: &Statement) -> Result<Vec<Record>> {
        debug!(sql = %statement.sql, args = statement.args.len(), "fetch");
        self.session()?.fetch_all(statement).await
    }

    pub(crate) async fn execute(&mut self, statement: &Statement) -> Result<u64> {
        debug!(sql = %statement.sql, args = statement.args.len(), "execute");
        self.session()?.execute(statement).await
    }

    /// Start a transaction for a write. Injected sessions are left alone
    /// and an already active transaction is joined.
    pub(crate) async fn begin(&mut self) -> Result<()> {
        if self.ownership == Ownership::Borrowed {
            return Ok(());
        }
        let session = self.session()?;
        if session.in_transaction() {
            debug!("Joining active transaction");
            return Ok(());
        }
        session.begin().await?;
        self.owns_transaction = true;
        Ok(())
    }

    /// Commit the lease's own transaction on success, roll it back on
    /// failure. The outcome passes through unless the commit fails.
    pub(crate) async fn finish<T>(&mut self, outcome: Result<T>) -> Result<T> {
        if !self.owns_transaction {
            return outcome;
        }
        let session = self.session()?;
        let outcome = match outcome {
            Ok(value) => match session.commit().await {
                Ok(()) => Ok(value),
                Err(commit_err) => {
                    if session.in_transaction() {
                        if let Err(e) = session.rollback().await {
                            warn!(error = %e, "Rollback after failed commit failed");
                        }
                    }
                    Err(commit_err)
                }
            },
            Err(err) => {
                if session.in_transaction() {
                    if let Err(e) = session.rollback().await {
                        warn!(error = %e, "Rollback failed");
                    }
                }
                Err(err)
            }
        };
        self.owns_transaction = false;
        outcome
    }

    /// End the call: close a local session unless kept alive. A session
    /// still inside a transaction the caller started stays open until the
    /// caller ends it. A close failure only surfaces when the call itself
    /// succeeded.
    pub(crate) async fn release<T>(mut self, outcome: Result<T>) -> Result<T> {
        let close = matches!(self.ownership, Ownership::Local { keep_alive: false });
        if !close {
            return outcome;
        }
        let joined = !self.owns_transaction
            && self.guard.as_ref().is_some_and(|s| s.is_open() && s.in_transaction());
        if joined {
            debug!("Keeping session open for the caller's transaction");
            return outcome;
        }
        let Some(mut session) = self.guard.take() else {
            return outcome;
        };
        let closed = session.close().await;
        debug!("Closed session after call");
        match (outcome, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(err), Err(e)) => {
                warn!(error = %e, "Closing session failed");
                Err(err)
            }
            (Err(err), Ok(())) => Err(err),
        }
    }
}

impl std::fmt::Debug for SessionLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLease")
            .field("ownership", &self.ownership)
            .field("owns_transaction", &self.owns_transaction)
            .finish()
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        if self.owns_transaction {
            // Cancelled mid-transaction: the session state is unknown
            warn!("Session lease dropped inside its transaction, discarding session");
            self.guard.take();
        }
    }
}

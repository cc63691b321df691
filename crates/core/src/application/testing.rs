// In-memory fakes for exercising handlers without a database

use crate::domain::{Catalog, ProcedureCall, Record, ResultSet, Statement};
use crate::error::{PersistenceError, Result};
use crate::port::{PersistenceProvider, ProcedureConnection, Session, SessionFactory};
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Ordered log of what the fakes were asked to do
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == event).count()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

#[derive(Default)]
struct ScriptState {
    rows: VecDeque<Vec<Record>>,
    fail_on: Vec<String>,
    fail_close: bool,
    affected: Option<u64>,
}

/// Scripted responses shared by every session a fake provider opens
#[derive(Clone, Default)]
pub struct Script(Arc<Mutex<ScriptState>>);

impl Script {
    /// Rows returned by the next fetch
    pub fn push_rows(&self, rows: Vec<Record>) {
        self.0.lock().unwrap().rows.push_back(rows);
    }

    /// Fail any event whose text contains `needle`
    pub fn fail_on(&self, needle: &str) {
        self.0.lock().unwrap().fail_on.push(needle.to_string());
    }

    pub fn fail_close(&self) {
        self.0.lock().unwrap().fail_close = true;
    }

    pub fn set_affected(&self, rows: u64) {
        self.0.lock().unwrap().affected = Some(rows);
    }

    fn check(&self, event: &str) -> Result<()> {
        let state = self.0.lock().unwrap();
        if state.fail_on.iter().any(|needle| event.contains(needle.as_str())) {
            return Err(PersistenceError::Database(format!("scripted failure: {}", event)));
        }
        Ok(())
    }
}

pub struct FakeSession {
    journal: Journal,
    script: Script,
    catalog: Arc<Catalog>,
    open: bool,
    in_tx: bool,
}

impl FakeSession {
    pub fn new(journal: Journal) -> Self {
        Self::with(journal, Script::default(), Arc::new(Catalog::new()))
    }

    pub fn with(journal: Journal, script: Script, catalog: Arc<Catalog>) -> Self {
        Self {
            journal,
            script,
            catalog,
            open: true,
            in_tx: false,
        }
    }
}

#[async_trait]
impl Session for FakeSession {
    fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn in_transaction(&self) -> bool {
        self.in_tx
    }

    async fn fetch_all(&mut self, statement: &Statement) -> Result<Vec<Record>> {
        let event = format!("fetch:{}", statement.sql);
        self.journal.record(event.clone());
        self.script.check(&event)?;
        Ok(self.script.0.lock().unwrap().rows.pop_front().unwrap_or_default())
    }

    async fn execute(&mut self, statement: &Statement) -> Result<u64> {
        let event = format!("exec:{}", statement.sql);
        self.journal.record(event.clone());
        self.script.check(&event)?;
        Ok(self.script.0.lock().unwrap().affected.unwrap_or(1))
    }

    async fn begin(&mut self) -> Result<()> {
        if self.in_tx {
            return Err(PersistenceError::Transaction("already active".into()));
        }
        self.journal.record("begin");
        self.script.check("begin")?;
        self.in_tx = true;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        if !self.in_tx {
            return Err(PersistenceError::Transaction("not active".into()));
        }
        self.journal.record("commit");
        self.script.check("commit")?;
        self.in_tx = false;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        if !self.in_tx {
            return Err(PersistenceError::Transaction("not active".into()));
        }
        self.journal.record("rollback");
        self.in_tx = false;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.in_tx {
            self.journal.record("rollback");
            self.in_tx = false;
        }
        if self.open {
            self.journal.record("close");
            self.open = false;
        }
        if self.script.0.lock().unwrap().fail_close {
            return Err(PersistenceError::Database("scripted close failure".into()));
        }
        Ok(())
    }
}

pub struct FakeFactory {
    unit: String,
    journal: Journal,
    script: Script,
    catalog: Arc<Catalog>,
    open: AtomicBool,
}

#[async_trait]
impl SessionFactory for FakeFactory {
    fn unit_name(&self) -> &str {
        &self.unit
    }

    async fn open_session(&self) -> Result<Box<dyn Session>> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(PersistenceError::SessionClosed("factory closed".into()));
        }
        self.journal.record("open");
        Ok(Box::new(FakeSession::with(
            self.journal.clone(),
            self.script.clone(),
            Arc::clone(&self.catalog),
        )))
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        self.journal.record("factory-close");
        self.open.store(false, Ordering::SeqCst);
    }
}

pub struct FakeProvider {
    journal: Journal,
    script: Script,
    catalog: Arc<Catalog>,
    failing: Mutex<HashSet<String>>,
    created: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Arc<Self> {
        Self::with_catalog(Catalog::new())
    }

    pub fn with_catalog(catalog: Catalog) -> Arc<Self> {
        Arc::new(Self {
            journal: Journal::new(),
            script: Script::default(),
            catalog: Arc::new(catalog),
            failing: Mutex::new(HashSet::new()),
            created: AtomicUsize::new(0),
        })
    }

    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    pub fn script(&self) -> Script {
        self.script.clone()
    }

    pub fn fail_unit(&self, unit: &str) {
        self.failing.lock().unwrap().insert(unit.to_string());
    }

    pub fn clear_failures(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn factories_created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PersistenceProvider for FakeProvider {
    async fn create_session_factory(&self, unit_name: &str) -> Result<Arc<dyn SessionFactory>> {
        if self.failing.lock().unwrap().contains(unit_name) {
            return Err(PersistenceError::UnknownUnit(unit_name.to_string()));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeFactory {
            unit: unit_name.to_string(),
            journal: self.journal.clone(),
            script: self.script.clone(),
            catalog: Arc::clone(&self.catalog),
            open: AtomicBool::new(true),
        }))
    }
}

/// Procedure connection answering every call with the same rows
pub struct FakeProcedures {
    journal: Journal,
    rows: Vec<Record>,
}

impl FakeProcedures {
    pub fn new(journal: Journal, rows: Vec<Record>) -> Self {
        Self { journal, rows }
    }
}

#[async_trait]
impl ProcedureConnection for FakeProcedures {
    async fn call(&mut self, call: &ProcedureCall) -> Result<ResultSet> {
        self.journal.record(format!("call:{}", call.signature));
        Ok(ResultSet::new(self.rows.clone()))
    }

    async fn close(&mut self) -> Result<()> {
        self.journal.record("close");
        Ok(())
    }
}

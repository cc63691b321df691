//! Shared fixtures: a `Customer` entity and a file-backed `main` unit

#![allow(dead_code)]

use std::sync::Arc;
use tempfile::TempDir;
use vexpersist_core::domain::error::Result as DomainResult;
use vexpersist_core::domain::{Entity, FromRecord, ProcedureDefinition, Record, Value};
use vexpersist_core::{PersistenceConfig, ServiceLocator, UnitConfig};
use vexpersist_infra_sqlite::SqlitePersistenceProvider;

pub const UNIT: &str = "main";

#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub id: Option<i64>,
    pub name: String,
    pub city: String,
    pub balance: f64,
}

impl Customer {
    pub fn new(name: &str, city: &str, balance: f64) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            city: city.to_string(),
            balance,
        }
    }
}

impl FromRecord for Customer {
    fn from_record(record: &Record) -> DomainResult<Self> {
        Ok(Self {
            id: record.get_as("id")?,
            name: record.get_as("name")?,
            city: record.get_as("city")?,
            balance: record.get_as("balance")?,
        })
    }
}

impl Entity for Customer {
    const NAME: &'static str = "Customer";
    const TABLE: &'static str = "customers";
    const ID_COLUMN: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &["id", "name", "city", "balance"];

    fn id(&self) -> Value {
        self.id.into()
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("id", self.id)
            .with("name", self.name.clone())
            .with("city", self.city.clone())
            .with("balance", self.balance)
    }

    fn named_queries() -> &'static [(&'static str, &'static str)] {
        &[
            (
                "Customer.byCity",
                "SELECT * FROM customers WHERE city = :city ORDER BY name",
            ),
            (
                "Customer.moveCity",
                "UPDATE customers SET city = :to WHERE city = :from",
            ),
        ]
    }
}

const SCHEMA_V1: &str = "
CREATE TABLE customers (
    id      INTEGER PRIMARY KEY,
    name    TEXT NOT NULL UNIQUE,
    city    TEXT NOT NULL,
    balance REAL NOT NULL DEFAULT 0 CHECK (balance >= 0)
);
CREATE INDEX idx_customers_city ON customers(city);
";

pub fn unit_config(dir: &TempDir) -> UnitConfig {
    let url = format!("sqlite://{}", dir.path().join("vexpersist.db").display());
    UnitConfig::new(url)
        .with_schema(SCHEMA_V1)
        .with_named_query("Customer.count", "SELECT COUNT(*) AS total FROM customers")
        .with_named_query("Customer.all", "SELECT * FROM customers ORDER BY id")
        .with_procedure(ProcedureDefinition::new(
            "transfer",
            &["from_id", "to_id", "amount"],
            "UPDATE customers SET balance = balance - :amount WHERE id = :from_id;
             UPDATE customers SET balance = balance + :amount WHERE id = :to_id;
             SELECT (SELECT balance FROM customers WHERE id = :from_id) AS from_balance,
                    (SELECT balance FROM customers WHERE id = :to_id) AS to_balance",
        ))
        .with_procedure(ProcedureDefinition::new(
            "customers_in",
            &["city"],
            "SELECT id, name, balance FROM customers WHERE city = ?1 ORDER BY id",
        ))
}

pub struct TestUnit {
    pub dir: TempDir,
    pub provider: Arc<SqlitePersistenceProvider>,
    pub locator: ServiceLocator,
}

pub fn setup() -> TestUnit {
    let dir = tempfile::tempdir().unwrap();
    let config = PersistenceConfig::default().with_unit(UNIT, unit_config(&dir));
    let provider = Arc::new(SqlitePersistenceProvider::new(config).register::<Customer>(UNIT));
    let locator = ServiceLocator::new(provider.clone());
    TestUnit {
        dir,
        provider,
        locator,
    }
}

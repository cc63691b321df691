//! Persistence unit configuration.
//!
//! Units are read from a TOML file and may be overridden from the
//! environment (`VEXPERSIST__UNITS__<UNIT>__URL=...`):
//!
//! ```toml
//! [units.main]
//! url = "sqlite://data/main.db"
//! max_connections = 4
//! schema = ["CREATE TABLE IF NOT EXISTS customers (id INTEGER PRIMARY KEY, name TEXT)"]
//!
//! [[units.main.named_queries]]
//! name = "Customer.byCity"
//! sql = "SELECT * FROM customers WHERE city = :city ORDER BY name"
//!
//! [[units.main.procedures]]
//! name = "close_account"
//! params = ["account_id"]
//! body = "UPDATE accounts SET open = 0 WHERE id = :account_id; SELECT changes() AS closed"
//! ```

use crate::domain::{Catalog, ProcedureDefinition};
use crate::error::{PersistenceError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const ENV_PREFIX: &str = "VEXPERSIST";
const ENV_SEPARATOR: &str = "__";

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_BUSY_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default)]
    pub units: BTreeMap<String, UnitConfig>,
}

/// One persistence unit: data source plus its query/procedure catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub foreign_keys: bool,

    #[serde(default = "default_true")]
    pub create_if_missing: bool,

    /// Schema scripts applied in order when the unit is first opened;
    /// a script's version is its position, starting at 1.
    #[serde(default)]
    pub schema: Vec<String>,

    #[serde(default)]
    pub named_queries: Vec<NamedQueryDefinition>,

    #[serde(default)]
    pub procedures: Vec<ProcedureDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedQueryDefinition {
    pub name: String,
    pub sql: String,
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

fn default_busy_timeout_secs() -> u64 {
    DEFAULT_BUSY_TIMEOUT_SECS
}

fn default_true() -> bool {
    true
}

impl PersistenceConfig {
    /// Load from a TOML file, then apply environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PersistenceError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Toml))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?;

        let parsed: Self = settings.try_deserialize()?;
        tracing::debug!(path = %path.display(), units = parsed.units.len(), "Loaded persistence config");
        Ok(parsed)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(content, config::FileFormat::Toml))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn with_unit(mut self, name: impl Into<String>, unit: UnitConfig) -> Self {
        self.units.insert(name.into(), unit);
        self
    }

    /// Unit names compare case-insensitively (config keys may be folded)
    pub fn unit(&self, name: &str) -> Result<&UnitConfig> {
        self.units
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, unit)| unit)
            .ok_or_else(|| PersistenceError::UnknownUnit(name.to_string()))
    }

    pub fn unit_names(&self) -> Vec<&str> {
        self.units.keys().map(String::as_str).collect()
    }
}

impl UnitConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            busy_timeout_secs: DEFAULT_BUSY_TIMEOUT_SECS,
            foreign_keys: true,
            create_if_missing: true,
            schema: Vec::new(),
            named_queries: Vec::new(),
            procedures: Vec::new(),
        }
    }

    pub fn with_schema(mut self, script: impl Into<String>) -> Self {
        self.schema.push(script.into());
        self
    }

    pub fn with_named_query(mut self, name: impl Into<String>, sql: impl Into<String>) -> Self {
        self.named_queries.push(NamedQueryDefinition {
            name: name.into(),
            sql: sql.into(),
        });
        self
    }

    pub fn with_procedure(mut self, definition: ProcedureDefinition) -> Self {
        self.procedures.push(definition);
        self
    }

    /// Parse the unit's definitions into a catalog
    pub fn catalog(&self) -> Result<Catalog> {
        let mut catalog = Catalog::new();
        for query in &self.named_queries {
            catalog.add_named_query(&query.name, &query.sql)?;
        }
        for procedure in &self.procedures {
            catalog.add_procedure(procedure.clone())?;
        }
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[units.main]
url = "sqlite::memory:"
max_connections = 2
schema = ["CREATE TABLE t (id INTEGER PRIMARY KEY, n INTEGER)"]

[[units.main.named_queries]]
name = "Customer.byCity"
sql = "SELECT * FROM customers WHERE city = :city"

[[units.main.procedures]]
name = "touch"
params = ["id"]
body = "UPDATE t SET n = n + 1 WHERE id = :id"

[units.reporting]
url = "sqlite://reports.db"
"#;

    #[test]
    fn test_parse_units_with_defaults() {
        let config = PersistenceConfig::from_toml_str(SAMPLE).unwrap();
        let main = config.unit("main").unwrap();
        assert_eq!(main.max_connections, 2);
        assert!(main.foreign_keys);
        assert_eq!(main.named_queries[0].name, "Customer.byCity");
        assert_eq!(main.schema.len(), 1);

        let reporting = config.unit("REPORTING").unwrap();
        assert_eq!(reporting.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(reporting.busy_timeout_secs, DEFAULT_BUSY_TIMEOUT_SECS);
        assert!(reporting.procedures.is_empty());
    }

    #[test]
    fn test_unknown_unit() {
        let config = PersistenceConfig::default();
        assert!(matches!(
            config.unit("ghost"),
            Err(PersistenceError::UnknownUnit(name)) if name == "ghost"
        ));
    }

    #[test]
    fn test_catalog_from_unit() {
        let config = PersistenceConfig::from_toml_str(SAMPLE).unwrap();
        let catalog = config.unit("main").unwrap().catalog().unwrap();
        assert!(catalog.named_query("Customer.byCity").is_ok());
        assert_eq!(catalog.procedure("touch").unwrap().params, vec!["id"]);
    }

    #[test]
    fn test_bad_named_query_fails_catalog() {
        let unit = UnitConfig::new("sqlite::memory:").with_named_query("broken", "SELECT 'x");
        assert!(unit.catalog().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = PersistenceConfig::load(file.path()).unwrap();
        assert_eq!(config.unit_names().len(), 2);

        let missing = PersistenceConfig::load(Path::new("/nonexistent/vexpersist.toml"));
        assert!(matches!(missing, Err(PersistenceError::Config(_))));
    }
}

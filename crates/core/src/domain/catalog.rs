// Per-unit catalog of named queries and stored procedures

use super::entity::Entity;
use super::error::{DomainError, Result};
use super::procedure::ProcedureDefinition;
use super::query::ParsedQuery;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    named_queries: HashMap<String, ParsedQuery>,
    procedures: HashMap<String, ProcedureDefinition>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named query; the text is parsed up front so a bad
    /// definition fails at registration rather than at call time.
    pub fn add_named_query(&mut self, name: &str, sql: &str) -> Result<()> {
        let parsed = ParsedQuery::parse(sql).map_err(|e| {
            DomainError::ValidationError(format!("named query '{}': {}", name, e))
        })?;
        self.named_queries.insert(name.to_string(), parsed);
        Ok(())
    }

    pub fn add_procedure(&mut self, definition: ProcedureDefinition) -> Result<()> {
        definition.statements().map_err(|e| {
            DomainError::ValidationError(format!("procedure '{}': {}", definition.name, e))
        })?;
        self.procedures
            .insert(definition.name.to_ascii_lowercase(), definition);
        Ok(())
    }

    /// Register the named queries an entity declares
    pub fn register<T: Entity>(&mut self) -> Result<()> {
        for (name, sql) in T::named_queries() {
            self.add_named_query(name, sql)?;
        }
        Ok(())
    }

    pub fn named_query(&self, name: &str) -> Result<&ParsedQuery> {
        self.named_queries
            .get(name)
            .ok_or_else(|| DomainError::NamedQueryNotFound(name.to_string()))
    }

    /// Procedure names resolve case-insensitively, like SQL identifiers
    pub fn procedure(&self, name: &str) -> Result<&ProcedureDefinition> {
        self.procedures
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| DomainError::ProcedureNotFound(name.to_string()))
    }

    pub fn named_query_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.named_queries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn procedure_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.procedures.values().map(|p| p.name.as_str()).collect();
        names.sort_unstable();
        names
    }
}

// Row representation returned by sessions

use super::error::{DomainError, Result};
use super::value::{FromValue, Value};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// One row: ordered `(column, value)` pairs.
///
/// Column lookup is case-insensitive, matching SQL identifier rules.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Builder-style insert
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    /// Insert or replace a column value
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.position(&column) {
            Some(idx) => self.fields[idx].1 = value,
            None => self.fields.push((column, value)),
        }
    }

    /// Append a column even if one with the same name exists; lookups
    /// return the first match
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.fields.push((column.into(), value.into()));
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.position(column).map(|idx| &self.fields[idx].1)
    }

    /// Value of a column that must be present
    pub fn require(&self, column: &str) -> Result<&Value> {
        self.get(column)
            .ok_or_else(|| DomainError::MissingColumn(column.to_string()))
    }

    /// Typed value of a column that must be present
    pub fn get_as<T: FromValue>(&self, column: &str) -> Result<T> {
        T::from_value(self.require(column)?)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(c, _)| c.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn get_mut(&mut self, column: &str) -> Option<&mut Value> {
        self.position(column).map(move |idx| &mut self.fields[idx].1)
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|(c, _)| c.eq_ignore_ascii_case(column))
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (column, value) in iter {
            record.set(column, value);
        }
        record
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (column, value) in &self.fields {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Rows of a query or procedure call
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct ResultSet {
    rows: Vec<Record>,
}

impl ResultSet {
    pub fn new(rows: Vec<Record>) -> Self {
        Self { rows }
    }

    /// Column names of the first row (empty for an empty result)
    pub fn columns(&self) -> Vec<String> {
        self.rows
            .first()
            .map(|r| r.columns().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn first(&self) -> Option<&Record> {
        self.rows.first()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<Record> {
        self.rows
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [Record] {
        &mut self.rows
    }
}

impl From<Vec<Record>> for ResultSet {
    fn from(rows: Vec<Record>) -> Self {
        Self::new(rows)
    }
}

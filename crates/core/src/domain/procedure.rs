// Stored procedure call model and OUT parameter marshaling

use super::error::{DomainError, Result};
use super::query::{split_statements, ParsedQuery};
use super::record::{Record, ResultSet};
use super::value::{FromValue, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default numeric scale for OUT parameters
pub const DEFAULT_SCALE: u32 = 2;

const MAX_SCALE: u32 = 15;
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Declared SQL type of a procedure parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlType {
    /// No declared type: values pass through unchanged
    #[default]
    Null,
    Integer,
    BigInt,
    SmallInt,
    Real,
    Double,
    Numeric,
    Decimal,
    Char,
    Varchar,
    Text,
    Boolean,
    Blob,
    Date,
    Timestamp,
}

impl SqlType {
    /// Convert a value to this type. Numeric and decimal values are rounded
    /// to `scale` fractional digits. NULL stays NULL.
    pub fn coerce(&self, value: &Value, scale: u32) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match self {
            SqlType::Null => Ok(value.clone()),
            SqlType::Integer | SqlType::BigInt | SqlType::SmallInt => {
                let wide = match value {
                    Value::Real(r) if r.is_finite() => r.trunc() as i64,
                    other => i64::from_value(other)?,
                };
                if *self == SqlType::SmallInt && i16::try_from(wide).is_err() {
                    return Err(value.conversion_error("smallint"));
                }
                if *self == SqlType::Integer && i32::try_from(wide).is_err() {
                    return Err(value.conversion_error("integer"));
                }
                Ok(Value::Integer(wide))
            }
            SqlType::Real | SqlType::Double => Ok(Value::Real(f64::from_value(value)?)),
            SqlType::Numeric | SqlType::Decimal => {
                let raw = f64::from_value(value)?;
                let factor = 10f64.powi(scale.min(MAX_SCALE) as i32);
                Ok(Value::Real((raw * factor).round() / factor))
            }
            SqlType::Char | SqlType::Varchar | SqlType::Text => {
                Ok(Value::Text(String::from_value(value)?))
            }
            SqlType::Boolean => Ok(Value::Bool(bool::from_value(value)?)),
            SqlType::Blob => Ok(Value::Blob(Vec::<u8>::from_value(value)?)),
            SqlType::Date => coerce_date(value),
            SqlType::Timestamp => coerce_timestamp(value),
        }
    }
}

fn coerce_date(value: &Value) -> Result<Value> {
    let date = match value {
        Value::Text(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
            .or_else(|_| parse_timestamp(s).map(|ts| ts.date()))
            .map_err(|_| value.conversion_error("date"))?,
        Value::Integer(secs) => DateTime::from_timestamp(*secs, 0)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| value.conversion_error("date"))?,
        _ => return Err(value.conversion_error("date")),
    };
    Ok(Value::Text(date.format(DATE_FORMAT).to_string()))
}

fn coerce_timestamp(value: &Value) -> Result<Value> {
    let ts = match value {
        Value::Text(s) => parse_timestamp(s).map_err(|_| value.conversion_error("timestamp"))?,
        Value::Integer(secs) => DateTime::from_timestamp(*secs, 0)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| value.conversion_error("timestamp"))?,
        _ => return Err(value.conversion_error("timestamp")),
    };
    Ok(Value::Text(ts.format(TIMESTAMP_FORMAT).to_string()))
}

fn parse_timestamp(s: &str) -> std::result::Result<NaiveDateTime, chrono::ParseError> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| DateTime::parse_from_rfc3339(s).map(|dt| dt.naive_utc()))
}

impl TryFrom<i32> for SqlType {
    type Error = DomainError;

    /// Standard SQL/ODBC type codes
    fn try_from(code: i32) -> Result<Self> {
        Ok(match code {
            0 => SqlType::Null,
            1 => SqlType::Char,
            2 => SqlType::Numeric,
            3 => SqlType::Decimal,
            4 => SqlType::Integer,
            5 | -6 => SqlType::SmallInt,
            6 | 8 => SqlType::Double,
            7 => SqlType::Real,
            12 => SqlType::Varchar,
            -1 | 2005 => SqlType::Text,
            16 | -7 => SqlType::Boolean,
            -5 => SqlType::BigInt,
            91 => SqlType::Date,
            93 => SqlType::Timestamp,
            -2 | -3 | -4 | 2004 => SqlType::Blob,
            other => {
                return Err(DomainError::ValidationError(format!(
                    "unsupported SQL type code {}",
                    other
                )))
            }
        })
    }
}

impl FromStr for SqlType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "null" | "any" => SqlType::Null,
            "integer" | "int" => SqlType::Integer,
            "bigint" => SqlType::BigInt,
            "smallint" | "tinyint" => SqlType::SmallInt,
            "real" | "float" => SqlType::Real,
            "double" => SqlType::Double,
            "numeric" => SqlType::Numeric,
            "decimal" => SqlType::Decimal,
            "char" => SqlType::Char,
            "varchar" => SqlType::Varchar,
            "text" | "clob" => SqlType::Text,
            "boolean" | "bool" | "bit" => SqlType::Boolean,
            "blob" | "binary" | "varbinary" => SqlType::Blob,
            "date" => SqlType::Date,
            "timestamp" | "datetime" => SqlType::Timestamp,
            other => {
                return Err(DomainError::ValidationError(format!(
                    "unknown SQL type '{}'",
                    other
                )))
            }
        })
    }
}

/// Describes one procedure parameter: name, declared type, value and scale
#[derive(Debug, Clone, PartialEq)]
pub struct StoredProcedureParam {
    pub name: String,
    pub sql_type: SqlType,
    pub value: Value,
    pub scale: u32,
}

impl Default for StoredProcedureParam {
    fn default() -> Self {
        Self::new("", Value::Null)
    }
}

impl StoredProcedureParam {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::typed(name, SqlType::Null, value)
    }

    pub fn typed(name: impl Into<String>, sql_type: SqlType, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            sql_type,
            value: value.into(),
            scale: DEFAULT_SCALE,
        }
    }

    /// OUT parameter registration (no value)
    pub fn out(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self::typed(name, sql_type, Value::Null)
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale;
        self
    }

    fn coerce(&self, value: &Value) -> Result<Value> {
        self.sql_type.coerce(value, self.scale)
    }
}

/// `{call name(?, ?, ...)}` with one placeholder per IN parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSignature {
    procedure: String,
    arity: usize,
}

impl CallSignature {
    pub fn new(procedure: &str, arity: usize) -> Result<Self> {
        validate_procedure_name(procedure)?;
        Ok(Self {
            procedure: procedure.to_string(),
            arity,
        })
    }

    pub fn procedure(&self) -> &str {
        &self.procedure
    }

    pub fn arity(&self) -> usize {
        self.arity
    }
}

impl fmt::Display for CallSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marks = vec!["?"; self.arity].join(", ");
        write!(f, "{{call {}({})}}", self.procedure, marks)
    }
}

fn validate_procedure_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.split('.').all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if valid {
        Ok(())
    } else {
        Err(DomainError::InvalidIdentifier(name.to_string()))
    }
}

/// A procedure registered with a persistence unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureDefinition {
    pub name: String,

    /// IN parameter names, in call order
    #[serde(default)]
    pub params: Vec<String>,

    /// One or more statements separated by `;`
    pub body: String,
}

impl ProcedureDefinition {
    pub fn new(name: impl Into<String>, params: &[&str], body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: params.iter().map(|p| p.to_string()).collect(),
            body: body.into(),
        }
    }

    pub fn statements(&self) -> Result<Vec<ParsedQuery>> {
        split_statements(&self.body)?
            .iter()
            .map(|s| ParsedQuery::parse(s))
            .collect()
    }
}

/// Everything a connection needs to run one procedure call
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureCall {
    pub signature: CallSignature,
    pub in_params: Vec<Value>,
    pub out_params: Vec<StoredProcedureParam>,
}

impl ProcedureCall {
    pub fn new(
        procedure: &str,
        in_params: Vec<Value>,
        out_params: Vec<StoredProcedureParam>,
    ) -> Result<Self> {
        let signature = CallSignature::new(procedure, in_params.len())?;
        Ok(Self {
            signature,
            in_params,
            out_params,
        })
    }
}

/// Coerce columns named after registered OUT parameters, in every row
pub fn coerce_out_columns(rows: &mut ResultSet, out_params: &[StoredProcedureParam]) -> Result<()> {
    for row in rows.rows_mut() {
        for param in out_params {
            if let Some(value) = row.get_mut(&param.name) {
                *value = param.coerce(value)?;
            }
        }
    }
    Ok(())
}

/// Read OUT values from the first row, in registration order
pub fn read_out_values(rows: &ResultSet, out_params: &[StoredProcedureParam]) -> Result<Record> {
    if out_params.is_empty() {
        return Ok(Record::new());
    }
    let first = rows.first().ok_or_else(|| {
        DomainError::MissingColumn(format!(
            "{} (procedure returned no row)",
            out_params[0].name
        ))
    })?;
    let mut out = Record::with_capacity(out_params.len());
    for param in out_params {
        let value = first.require(&param.name)?;
        out.set(param.name.clone(), param.coerce(value)?);
    }
    Ok(out)
}

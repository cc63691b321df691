// Value <-> SQLite binding and row decoding

use crate::error::map_sqlx_error;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Row, Sqlite, TypeInfo, ValueRef};
use vexpersist_core::domain::{Record, Statement, Value};
use vexpersist_core::Result;

pub(crate) type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

fn bind_value<'q>(query: SqliteQuery<'q>, value: &'q Value) -> SqliteQuery<'q> {
    match value {
        Value::Null => query.bind(None::<i64>),
        Value::Bool(b) => query.bind(*b),
        Value::Integer(i) => query.bind(*i),
        Value::Real(r) => query.bind(*r),
        Value::Text(s) => query.bind(s.as_str()),
        Value::Blob(b) => query.bind(b.as_slice()),
    }
}

/// Query with the statement's arguments bound in order
pub(crate) fn prepare(statement: &Statement) -> SqliteQuery<'_> {
    statement
        .args
        .iter()
        .fold(sqlx::query(&statement.sql), bind_value)
}

/// Decode by the stored value's storage class, not the declared column type
pub(crate) fn decode_row(row: &SqliteRow) -> Result<Record> {
    let mut record = Record::with_capacity(row.columns().len());
    for column in row.columns() {
        let idx = column.ordinal();
        let raw = row.try_get_raw(idx).map_err(map_sqlx_error)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let storage = raw.type_info().name().to_string();
            match storage.as_str() {
                "INTEGER" => Value::Integer(row.try_get_unchecked::<i64, _>(idx).map_err(map_sqlx_error)?),
                "REAL" => Value::Real(row.try_get_unchecked::<f64, _>(idx).map_err(map_sqlx_error)?),
                "BLOB" => Value::Blob(row.try_get_unchecked::<Vec<u8>, _>(idx).map_err(map_sqlx_error)?),
                _ => Value::Text(row.try_get_unchecked::<String, _>(idx).map_err(map_sqlx_error)?),
            }
        };
        record.push(column.name(), value);
    }
    Ok(record)
}

pub(crate) fn decode_rows(rows: &[SqliteRow]) -> Result<Vec<Record>> {
    rows.iter().map(decode_row).collect()
}

// Entity mapping contract

use super::error::{DomainError, Result};
use super::record::Record;
use super::value::Value;

/// Build a value from a row
pub trait FromRecord: Sized {
    fn from_record(record: &Record) -> Result<Self>;
}

impl FromRecord for Record {
    fn from_record(record: &Record) -> Result<Self> {
        Ok(record.clone())
    }
}

/// A type persisted as one row of one table, keyed by a single id column.
///
/// Implementations map fields to columns explicitly; the DAO builds its
/// statements from `TABLE`, `ID_COLUMN` and `COLUMNS`.
pub trait Entity: FromRecord + Send + Sync + 'static {
    /// Logical entity name (hooks, logs)
    const NAME: &'static str;

    const TABLE: &'static str;

    const ID_COLUMN: &'static str;

    /// All mapped columns, id column included
    const COLUMNS: &'static [&'static str];

    fn id(&self) -> Value;

    /// Column values; must cover every entry of `COLUMNS`
    fn to_record(&self) -> Record;

    /// Named queries declared alongside the entity: `(name, sql)`
    fn named_queries() -> &'static [(&'static str, &'static str)] {
        &[]
    }
}

/// Static description of an entity type, as passed to hooks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityMeta {
    pub name: &'static str,
    pub table: &'static str,
    pub id_column: &'static str,
    pub columns: &'static [&'static str],
}

impl EntityMeta {
    pub fn of<T: Entity>() -> Self {
        Self {
            name: T::NAME,
            table: T::TABLE,
            id_column: T::ID_COLUMN,
            columns: T::COLUMNS,
        }
    }

    /// Resolve a field name to its mapped column
    pub fn column(&self, field: &str) -> Result<&'static str> {
        self.columns
            .iter()
            .copied()
            .find(|c| c.eq_ignore_ascii_case(field))
            .ok_or_else(|| {
                DomainError::ValidationError(format!(
                    "{} has no mapped field '{}'",
                    self.name, field
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tag;

    impl FromRecord for Tag {
        fn from_record(_: &Record) -> Result<Self> {
            Ok(Tag)
        }
    }

    impl Entity for Tag {
        const NAME: &'static str = "Tag";
        const TABLE: &'static str = "tags";
        const ID_COLUMN: &'static str = "id";
        const COLUMNS: &'static [&'static str] = &["id", "label"];

        fn id(&self) -> Value {
            Value::Integer(1)
        }

        fn to_record(&self) -> Record {
            Record::new().with("id", 1i64).with("label", "x")
        }
    }

    #[test]
    fn test_meta_column_lookup() {
        let meta = EntityMeta::of::<Tag>();
        assert_eq!(meta.table, "tags");
        assert_eq!(meta.column("LABEL").unwrap(), "label");
        assert!(meta.column("missing").is_err());
        assert!(Tag::named_queries().is_empty());
    }
}

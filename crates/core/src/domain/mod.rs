// Domain Layer - values, records, entity mapping, query and procedure model

pub mod catalog;
pub mod entity;
pub mod error;
pub mod procedure;
pub mod query;
pub mod record;
pub mod value;

// Re-exports
pub use catalog::Catalog;
pub use entity::{Entity, EntityMeta, FromRecord};
pub use error::DomainError;
pub use procedure::{
    CallSignature, ProcedureCall, ProcedureDefinition, SqlType, StoredProcedureParam,
    DEFAULT_SCALE,
};
pub use query::{split_statements, ParsedQuery, Params, Placeholder, Statement, Window};
pub use record::{Record, ResultSet};
pub use value::{FromValue, Value};

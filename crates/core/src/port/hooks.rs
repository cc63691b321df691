// Before/after extension points invoked around every handler operation.
// All methods default to no-ops; `NoHooks` is the shipped implementation.

use crate::domain::{EntityMeta, Params, Record, Value};

pub trait DaoHooks: Send + Sync {
    fn before_get_all(&self, _entity: &EntityMeta) {}
    fn after_get_all(&self, _entity: &EntityMeta) {}

    fn before_get(&self, _entity: &EntityMeta, _id: &Value) {}
    fn after_get(&self, _entity: &EntityMeta, _id: &Value) {}

    fn before_save(&self, _entity: &EntityMeta, _record: &Record) {}
    fn after_save(&self, _entity: &EntityMeta, _record: &Record) {}

    /// Also used by `cancel`
    fn before_refresh(&self, _entity: &EntityMeta, _id: &Value) {}
    fn after_refresh(&self, _entity: &EntityMeta, _id: &Value) {}

    fn before_remove(&self, _entity: &EntityMeta, _id: &Value) {}
    fn after_remove(&self, _entity: &EntityMeta, _id: &Value) {}
}

pub trait NamedQueryHooks: Send + Sync {
    fn before_find(&self, _name: &str, _params: &Params) {}
    fn after_find(&self, _name: &str, _params: &Params) {}

    fn before_exec(&self, _name: &str, _params: &Params) {}
    fn after_exec(&self, _name: &str, _params: &Params) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl DaoHooks for NoHooks {}

impl NamedQueryHooks for NoHooks {}

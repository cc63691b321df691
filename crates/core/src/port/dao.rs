// Data Access Object port

use crate::domain::{Entity, Value};
use crate::error::Result;
use async_trait::async_trait;

/// Generic entity CRUD
#[async_trait]
pub trait Dao: Send + Sync {
    /// All rows of `T`, ordered by the given fields (in order)
    async fn get_all<T: Entity>(&self, order_by: &[&str]) -> Result<Vec<T>>;

    async fn get<T: Entity>(&self, id: Value) -> Result<Option<T>>;

    /// Merge `entity` into the store and return the stored state
    async fn save<T: Entity>(&self, entity: &T) -> Result<T>;

    /// Overwrite `entity` with the stored state
    async fn refresh<T: Entity>(&self, entity: &mut T) -> Result<()>;

    /// Like `refresh`, but failures are logged and ignored
    #[deprecated(note = "use `refresh`, which reports failures")]
    async fn cancel<T: Entity>(&self, entity: &mut T);

    /// Returns whether a row was removed
    async fn remove<T: Entity>(&self, entity: &T) -> Result<bool>;
}

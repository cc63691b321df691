// Stored procedure port

use crate::domain::{Record, ResultSet, StoredProcedureParam, Value};
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait StoredProcedure: Send + Sync {
    async fn get_by_stored_procedure(&self, name: &str, in_params: Vec<Value>) -> Result<ResultSet> {
        self.get_by_stored_procedure_with(name, &[], in_params).await
    }

    /// Columns named after `out_params` are converted to their declared type
    async fn get_by_stored_procedure_with(
        &self,
        name: &str,
        out_params: &[StoredProcedureParam],
        in_params: Vec<Value>,
    ) -> Result<ResultSet>;

    async fn exec_stored_procedure(&self, name: &str, in_params: Vec<Value>) -> Result<()> {
        self.exec_stored_procedure_with(name, &[], in_params)
            .await
            .map(|_| ())
    }

    /// Returns the OUT values, in registration order
    async fn exec_stored_procedure_with(
        &self,
        name: &str,
        out_params: &[StoredProcedureParam],
        in_params: Vec<Value>,
    ) -> Result<Record>;
}

// Raw connection port for stored procedure calls

use crate::domain::{ProcedureCall, ResultSet};
use crate::error::Result;
use async_trait::async_trait;

/// A database connection able to run callable statements
#[async_trait]
pub trait ProcedureConnection: Send {
    /// Execute the call; returns the rows of the procedure's final statement
    async fn call(&mut self, call: &ProcedureCall) -> Result<ResultSet>;

    async fn close(&mut self) -> Result<()>;
}

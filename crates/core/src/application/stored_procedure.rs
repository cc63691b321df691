// Stored procedure calls over a callable connection

use crate::domain::procedure::{coerce_out_columns, read_out_values};
use crate::domain::{ProcedureCall, Record, ResultSet, StoredProcedureParam, Value};
use crate::error::{PersistenceError, Result};
use crate::port::{ProcedureConnection, StoredProcedure};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Shared handle to the connection procedures run on.
/// The caller owns it; handlers never close it.
#[derive(Clone)]
pub struct CallableConnection {
    inner: Arc<Mutex<Box<dyn ProcedureConnection>>>,
}

impl CallableConnection {
    pub fn new(connection: impl ProcedureConnection + 'static) -> Self {
        Self::from_boxed(Box::new(connection))
    }

    pub fn from_boxed(connection: Box<dyn ProcedureConnection>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(connection)),
        }
    }

    pub(crate) async fn call(&self, call: &ProcedureCall) -> Result<ResultSet> {
        debug!(call = %call.signature, "Calling stored procedure");
        self.inner.lock().await.call(call).await
    }

    pub async fn close(&self) -> Result<()> {
        self.inner.lock().await.close().await
    }
}

impl std::fmt::Debug for CallableConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallableConnection").finish_non_exhaustive()
    }
}

pub struct StoredProcedureHandler {
    connection: CallableConnection,
}

impl StoredProcedureHandler {
    pub fn new(connection: CallableConnection) -> Self {
        Self { connection }
    }

    async fn run(
        &self,
        name: &str,
        out_params: &[StoredProcedureParam],
        in_params: Vec<Value>,
    ) -> Result<ResultSet> {
        let call = ProcedureCall::new(name, in_params, out_params.to_vec())?;
        self.connection.call(&call).await
    }
}

#[async_trait]
impl StoredProcedure for StoredProcedureHandler {
    async fn get_by_stored_procedure_with(
        &self,
        name: &str,
        out_params: &[StoredProcedureParam],
        in_params: Vec<Value>,
    ) -> Result<ResultSet> {
        let outcome = match self.run(name, out_params, in_params).await {
            Ok(mut rows) => coerce_out_columns(&mut rows, out_params)
                .map(|()| rows)
                .map_err(PersistenceError::from),
            Err(e) => Err(e),
        };
        outcome.map_err(|e| PersistenceError::failed("get_by_stored_procedure", e))
    }

    async fn exec_stored_procedure_with(
        &self,
        name: &str,
        out_params: &[StoredProcedureParam],
        in_params: Vec<Value>,
    ) -> Result<Record> {
        let outcome = match self.run(name, out_params, in_params).await {
            Ok(rows) => read_out_values(&rows, out_params).map_err(PersistenceError::from),
            Err(e) => Err(e),
        };
        outcome.map_err(|e| PersistenceError::failed("exec_stored_procedure", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{FakeProcedures, Journal};
    use crate::domain::{DomainError, SqlType};

    fn callable(journal: &Journal, rows: Vec<Record>) -> CallableConnection {
        CallableConnection::new(FakeProcedures::new(journal.clone(), rows))
    }

    #[tokio::test]
    async fn test_get_coerces_out_columns() {
        let journal = Journal::new();
        let rows = vec![
            Record::new().with("id", 1).with("balance", 10.456),
            Record::new().with("id", 2).with("balance", 3),
        ];
        let procedures = StoredProcedureHandler::new(callable(&journal, rows));

        let result = procedures
            .get_by_stored_procedure_with(
                "accounts_by_owner",
                &[StoredProcedureParam::out("balance", SqlType::Decimal)],
                vec![Value::from("ada")],
            )
            .await
            .unwrap();

        assert_eq!(result.rows()[0].get("balance"), Some(&Value::Real(10.46)));
        assert_eq!(result.rows()[1].get("balance"), Some(&Value::Real(3.0)));
        assert_eq!(journal.events(), vec!["call:{call accounts_by_owner(?)}"]);
    }

    #[tokio::test]
    async fn test_exec_reads_out_values_in_order() {
        let journal = Journal::new();
        let rows = vec![Record::new().with("total", "42").with("status", "ok")];
        let procedures = StoredProcedureHandler::new(callable(&journal, rows));

        let out = procedures
            .exec_stored_procedure_with(
                "settle",
                &[
                    StoredProcedureParam::out("status", SqlType::Varchar),
                    StoredProcedureParam::out("total", SqlType::Integer),
                ],
                vec![Value::from(7), Value::from("EUR")],
            )
            .await
            .unwrap();

        assert_eq!(out.columns().collect::<Vec<_>>(), vec!["status", "total"]);
        assert_eq!(out.get("total"), Some(&Value::Integer(42)));
        assert_eq!(journal.events(), vec!["call:{call settle(?, ?)}"]);
    }

    #[tokio::test]
    async fn test_missing_out_column_is_an_error() {
        let journal = Journal::new();
        let procedures = StoredProcedureHandler::new(callable(&journal, vec![]));

        procedures
            .exec_stored_procedure("noop", vec![])
            .await
            .unwrap();

        let err = procedures
            .exec_stored_procedure_with(
                "noop",
                &[StoredProcedureParam::out("result", SqlType::Integer)],
                vec![],
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::Failed { operation: "exec_stored_procedure", .. }
        ));
        assert!(matches!(
            err.root(),
            PersistenceError::Domain(DomainError::MissingColumn(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_procedure_name_never_reaches_connection() {
        let journal = Journal::new();
        let procedures = StoredProcedureHandler::new(callable(&journal, vec![]));

        let err = procedures
            .get_by_stored_procedure("drop table x; --", vec![])
            .await
            .unwrap_err();
        assert!(matches!(
            err.root(),
            PersistenceError::Domain(DomainError::InvalidIdentifier(_))
        ));
        assert!(journal.events().is_empty());
    }
}

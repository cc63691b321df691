// Named query port

use crate::domain::{FromRecord, Params, Record};
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait NamedQuery: Send + Sync {
    async fn find_by_named_query(&self, name: &str, params: Params) -> Result<Vec<Record>>;

    /// The window applies only when both `first_result` and `max_results`
    /// are given
    async fn find_by_named_query_windowed(
        &self,
        name: &str,
        first_result: Option<usize>,
        max_results: Option<usize>,
        params: Params,
    ) -> Result<Vec<Record>>;

    /// Typed variant of `find_by_named_query`
    async fn find_as<T: FromRecord + Send + 'static>(&self, name: &str, params: Params) -> Result<Vec<T>> {
        self.find_by_named_query(name, params)
            .await?
            .iter()
            .map(|r| T::from_record(r).map_err(Into::into))
            .collect()
    }

    /// Run an update/delete/insert; returns affected rows
    async fn exec_by_named_query(&self, name: &str, params: Params) -> Result<u64>;
}

//! Warehouse execution seam.

use async_trait::async_trait;
use hotquery_core::HotqueryResult;

use crate::result_cache::Rows;

/// Executes SQL against the data warehouse.
///
/// Failures should be reported as
/// [`ExecutionError`](hotquery_core::ExecutionError) so callers can tell a
/// bad query from an unreachable warehouse.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, sql: &str) -> HotqueryResult<Rows>;
}

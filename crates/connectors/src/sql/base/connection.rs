use crate::error::{ConnectorError, DbError};
use async_trait::async_trait;
use model::{core::value::Value, records::batch::RawBatch};
use planner::query::dialect::Dialect;

/// One logical database session, exclusively owned by a reader's background task.
///
/// Statements use `?` placeholders; drivers translate them as needed.
#[async_trait]
pub trait PollConnection: Send {
    async fn connect(&mut self) -> Result<(), ConnectorError>;

    /// Runs a parameterized query and decodes every returned row.
    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<RawBatch, DbError>;

    /// Closes the session. Safe to call when not connected.
    async fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    fn dialect(&self) -> Dialect;
}

/// Creates unconnected sessions, one per reader start.
pub trait ConnectionFactory: Send + Sync {
    fn create(&self) -> Box<dyn PollConnection>;

    fn dialect(&self) -> Dialect;
}

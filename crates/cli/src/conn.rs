use crate::error::CliError;
use connectors::sql::base::connection::ConnectionFactory;
use std::time::{Duration, Instant};
use tracing::info;

/// Opens a connection, runs `SELECT 1` and closes it again.
pub async fn ping(factory: &dyn ConnectionFactory, endpoint: &str) -> Result<Duration, CliError> {
    info!(dialect = %factory.dialect(), endpoint, "Testing connection");
    let started = Instant::now();

    let mut connection = factory.create();
    connection.connect().await?;
    let result = connection.execute("SELECT 1", &[]).await;
    connection.disconnect().await;
    result?;

    let elapsed = started.elapsed();
    info!(endpoint, elapsed_ms = elapsed.as_millis() as u64, "Connection OK");
    Ok(elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::memory::MemoryTable;
    use planner::query::dialect::Dialect;

    #[tokio::test]
    async fn test_ping_reports_connect_failure() {
        let table = MemoryTable::new("id");
        table.fail_next_connects(1);
        let factory = table.factory(Dialect::MariaDb);

        assert!(matches!(
            ping(&factory, "db:3306/shop").await,
            Err(CliError::Connect(_))
        ));
        ping(&factory, "db:3306/shop").await.unwrap();
        assert_eq!(table.executed().len(), 1);
    }
}

use crate::{
    error::{ConnectorError, DbError},
    settings::ConnectionSettings,
    sql::{
        base::{connection::PollConnection, row::DbRow},
        postgres::{
            params::PgParamStore,
            utils::{client_config, connect_client},
        },
    },
};
use async_trait::async_trait;
use model::{core::value::Value, records::batch::RawBatch};
use planner::query::{dialect::Dialect, placeholders::bind_placeholders};
use std::time::Instant;
use tokio_postgres::Client;
use tracing::{debug, info};

pub struct PgConnection {
    settings: ConnectionSettings,
    client: Option<Client>,
}

impl PgConnection {
    pub fn new(settings: ConnectionSettings) -> Self {
        PgConnection {
            settings,
            client: None,
        }
    }
}

#[async_trait]
impl PollConnection for PgConnection {
    async fn connect(&mut self) -> Result<(), ConnectorError> {
        let client = connect_client(client_config(&self.settings)).await?;
        info!(endpoint = %self.settings.target(), "Connected to PostgreSQL");
        self.client = Some(client);
        Ok(())
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<RawBatch, DbError> {
        let client = self.client.as_ref().ok_or(DbError::NotConnected)?;
        let sql = bind_placeholders(sql, Dialect::Postgres)?;
        let bindings = PgParamStore::from_values(params);

        let started = Instant::now();
        let rows = client.query(sql.as_str(), &bindings.as_refs()).await?;
        let elapsed = started.elapsed();

        let rows = rows
            .iter()
            .map(|row| DbRow::PostgresRow(row).to_row_data())
            .collect();
        Ok(RawBatch::new(rows, elapsed))
    }

    async fn disconnect(&mut self) {
        // Dropping the client ends the spawned connection task.
        if self.client.take().is_some() {
            debug!(endpoint = %self.settings.target(), "Closed PostgreSQL connection");
        }
    }

    fn is_connected(&self) -> bool {
        self.client.as_ref().is_some_and(|client| !client.is_closed())
    }

    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }
}

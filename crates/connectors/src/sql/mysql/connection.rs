use crate::{
    error::{ConnectorError, DbError},
    settings::{ConnectionSettings, TlsMode},
    sql::{
        base::{connection::PollConnection, row::DbRow},
        mysql::params::bind,
    },
};
use async_trait::async_trait;
use model::{core::value::Value, records::batch::RawBatch};
use mysql_async::{Conn, Opts, OptsBuilder, Row, SslOpts, prelude::Queryable};
use planner::query::dialect::Dialect;
use std::time::Instant;
use tracing::{debug, info, warn};

/// MySQL and MariaDB share the wire protocol; only the dialect tag differs.
pub struct MySqlConnection {
    settings: ConnectionSettings,
    conn: Option<Conn>,
}

impl MySqlConnection {
    pub fn new(settings: ConnectionSettings) -> Self {
        MySqlConnection {
            settings,
            conn: None,
        }
    }

    fn opts(&self, tls: bool) -> Opts {
        let builder = OptsBuilder::default()
            .ip_or_hostname(self.settings.host.clone())
            .tcp_port(self.settings.port)
            .user(Some(self.settings.user.clone()))
            .pass(self.settings.password.clone())
            .db_name(Some(self.settings.database.clone()))
            .ssl_opts(tls.then(SslOpts::default));
        Opts::from(builder)
    }

    async fn open(&self, tls: bool) -> Result<Conn, ConnectorError> {
        let timeout = self.settings.connect_timeout;
        tokio::time::timeout(timeout, Conn::new(self.opts(tls)))
            .await
            .map_err(|_| ConnectorError::Timeout(timeout))?
            .map_err(ConnectorError::from)
    }
}

#[async_trait]
impl PollConnection for MySqlConnection {
    async fn connect(&mut self) -> Result<(), ConnectorError> {
        let conn = match self.settings.tls {
            TlsMode::Disable => self.open(false).await?,
            TlsMode::Require => self.open(true).await?,
            TlsMode::Prefer => match self.open(true).await {
                Ok(conn) => conn,
                Err(error) => {
                    warn!(%error, "MySQL TLS handshake failed, retrying without TLS");
                    self.open(false).await?
                }
            },
        };
        info!(
            endpoint = %self.settings.target(),
            dialect = %self.settings.dialect,
            "Connected to {}", self.settings.dialect
        );
        self.conn = Some(conn);
        Ok(())
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<RawBatch, DbError> {
        let conn = self.conn.as_mut().ok_or(DbError::NotConnected)?;

        let started = Instant::now();
        let rows: Vec<Row> = conn.exec(sql, bind(params)).await?;
        let elapsed = started.elapsed();

        let rows = rows
            .iter()
            .map(|row| DbRow::MySqlRow(row).to_row_data())
            .collect();
        Ok(RawBatch::new(rows, elapsed))
    }

    async fn disconnect(&mut self) {
        if let Some(conn) = self.conn.take() {
            match conn.disconnect().await {
                Ok(()) => debug!(endpoint = %self.settings.target(), "Closed MySQL connection"),
                Err(error) => warn!(%error, "MySQL disconnect failed"),
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn dialect(&self) -> Dialect {
        self.settings.dialect
    }
}

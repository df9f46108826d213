use mysql_async::Error as MySqlError;
use planner::query::error::StatementError;
use std::time::Duration;
use thiserror::Error;
use tokio_postgres::{Error as PgError, error::SqlState};

/// Errors raised while executing a poll query.
#[derive(Debug, Error)]
pub enum DbError {
    /// Low‐level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("MySQL error: {0}")]
    MySqlError(#[from] MySqlError),

    #[error("Postgres error: {0}")]
    PgError(#[from] PgError),

    /// The statement could not be prepared for the driver.
    #[error("Statement error: {0}")]
    Statement(#[from] StatementError),

    #[error("Connection is not open")]
    NotConnected,

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Errors happening during connection setup.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("MySQL connection failed: {0}")]
    MySql(#[from] MySqlError),

    #[error("Postgres connection failed: {0}")]
    Connection(#[from] PgError),

    #[error("TLS configuration error: {0}")]
    TlsConfig(#[from] native_tls::Error),

    #[error("Connection attempt timed out after {0:?}")]
    Timeout(Duration),
}

impl DbError {
    /// Whether the connection must be re-established before the next query.
    pub fn is_connection_lost(&self) -> bool {
        match self {
            DbError::Io(_) | DbError::NotConnected => true,
            DbError::PgError(err) => pg_connection_lost(err),
            DbError::MySqlError(err) => mysql_connection_lost(err),
            DbError::Statement(_) | DbError::Unknown(_) => false,
        }
    }
}

fn pg_connection_lost(err: &PgError) -> bool {
    if err.is_closed() {
        return true;
    }

    err.code().is_some_and(|code| {
        matches!(
            *code,
            SqlState::ADMIN_SHUTDOWN
                | SqlState::CRASH_SHUTDOWN
                | SqlState::CANNOT_CONNECT_NOW
                | SqlState::CONNECTION_FAILURE
                | SqlState::CONNECTION_DOES_NOT_EXIST
                | SqlState::SQLCLIENT_UNABLE_TO_ESTABLISH_SQLCONNECTION
                | SqlState::SQLSERVER_REJECTED_ESTABLISHMENT_OF_SQLCONNECTION
                | SqlState::CONNECTION_EXCEPTION
                | SqlState::TOO_MANY_CONNECTIONS
        )
    })
}

fn mysql_connection_lost(err: &MySqlError) -> bool {
    match err {
        MySqlError::Io(_) | MySqlError::Driver(_) | MySqlError::Other(_) => true,
        MySqlError::Server(server_err) => {
            is_mysql_connection_error(server_err.code, server_err.state.as_str())
        }
        _ => false,
    }
}

fn is_mysql_connection_error(code: u16, state: &str) -> bool {
    // Client/server connection codes: can't connect, gone away, lost during query,
    // too many connections, bad handshake.
    // See: https://dev.mysql.com/doc/mysql-errors/8.0/en/server-error-reference.html
    const CONNECTION_CODES: [u16; 6] = [2002, 2003, 2006, 2013, 1040, 1042];
    if CONNECTION_CODES.contains(&code) {
        return true;
    }

    state.starts_with("08")
}

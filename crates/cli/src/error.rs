use connectors::error::{ConnectorError, DbError};
use engine_config::error::ConfigurationError;
use engine_runtime::error::RuntimeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigurationError),

    #[error("Failed to run the poll step: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("Failed to connect: {0}")]
    Connect(#[from] ConnectorError),

    #[error("Test query failed: {0}")]
    Database(#[from] DbError),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

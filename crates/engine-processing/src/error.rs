use connectors::error::{ConnectorError, DbError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("Reader '{0}' is already running")]
    AlreadyRunning(String),

    #[error("Failed to open connection: {0}")]
    Connect(#[from] ConnectorError),

    #[error("Poll query failed: {0}")]
    Query(#[from] DbError),

    #[error("Poll task for reader '{step}' terminated abnormally: {reason}")]
    TaskFailed { step: String, reason: String },
}

/// A single row that could not be converted. The row is dropped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("Column '{column}': local time {value} does not exist in {timezone}")]
    NonexistentLocalTime {
        column: String,
        value: String,
        timezone: String,
    },

    #[error("Column '{column}': local time {value} is ambiguous in {timezone}")]
    AmbiguousLocalTime {
        column: String,
        value: String,
        timezone: String,
    },
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Output sink is closed")]
    Closed,

    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConverterError {
    #[error("Failed to forward output for step '{step}': {source}")]
    Sink {
        step: String,
        #[source]
        source: SinkError,
    },
}

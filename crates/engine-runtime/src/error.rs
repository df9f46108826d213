use engine_config::error::ConfigurationError;
use engine_processing::error::{ConverterError, ReaderError};
use planner::query::dialect::Dialect;
use thiserror::Error;

/// Top-level errors for running a poll step.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Reader error: {0}")]
    Reader(#[from] ReaderError),

    #[error("Converter error: {0}")]
    Converter(#[from] ConverterError),

    #[error("Connection factory speaks {found}, but the step is configured for {expected}")]
    DialectMismatch { expected: Dialect, found: Dialect },

    /// The poll task ended without being stopped.
    #[error("Reader for step '{0}' terminated unexpectedly")]
    ReaderTerminated(String),
}

use planner::query::error::StatementError;
use std::path::PathBuf;
use thiserror::Error;

/// A poll step that cannot be built. Raised before any reader exists.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Invalid poll query: {0}")]
    Statement(#[from] StatementError),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown environment variable '{0}'")]
    UnknownVariable(String),
}

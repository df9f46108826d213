use crate::query::lexer::error::LexerError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatementError {
    #[error("Query has no top-level ORDER BY clause")]
    MissingOrderBy,

    #[error("First ORDER BY key '{found}' is not the tie-breaker column '{expected}'")]
    TiebreakerMismatch { expected: String, found: String },

    #[error("Tie-breaker column is empty")]
    EmptyTiebreaker,

    #[error("Query has {placeholders} placeholder(s) but {parameters} parameter(s) were supplied")]
    ParameterCountMismatch {
        placeholders: usize,
        parameters: usize,
    },

    #[error("Top-level {0} is not supported in a poll query")]
    UnsupportedSetOperation(String),

    #[error("Failed to tokenize query: {0}")]
    Lex(String),
}

impl From<LexerError> for StatementError {
    fn from(err: LexerError) -> Self {
        StatementError::Lex(err.to_string())
    }
}

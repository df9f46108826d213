use super::Rule;
use pest::error::{Error as PestError, LineColLocation};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LexerError {
    /// Input the token grammar cannot cover, usually an unterminated
    /// string or quoted identifier.
    #[error("Unreadable SQL at {line}:{column} near `{near}`: {reason}")]
    Syntax {
        line: usize,
        column: usize,
        near: String,
        reason: String,
    },

    #[error("Invalid placeholder '{0}'")]
    InvalidPlaceholder(String),
}

impl From<PestError<Rule>> for LexerError {
    fn from(err: PestError<Rule>) -> Self {
        let (line, column) = match err.line_col {
            LineColLocation::Pos(pos) | LineColLocation::Span(pos, _) => pos,
        };
        let near: String = err.line().chars().skip(column.saturating_sub(1)).take(16).collect();

        LexerError::Syntax {
            line,
            column,
            near,
            reason: err.variant.message().into_owned(),
        }
    }
}

use crate::query::{
    dialect::Dialect,
    lexer::{
        error::LexerError,
        token::{Token, TokenKind},
    },
};
use pest::{Parser, iterators::Pair};
use pest_derive::Parser;

pub mod error;
pub mod token;

#[cfg(test)]
mod tests;

#[derive(Parser)]
#[grammar = "query/sql.pest"]
struct SqlParser;

/// Splits SQL text into tokens with byte spans. Whitespace and comments are
/// dropped; callers splice the original text using the spans.
pub struct Lexer {
    tokens: Vec<Token>,
    backslash_escapes: bool,
}

impl Lexer {
    /// Standard SQL string literals: only `''` escapes a quote.
    pub fn new() -> Self {
        Lexer {
            tokens: Vec::new(),
            backslash_escapes: false,
        }
    }

    /// String literal rules of `dialect`.
    pub fn for_dialect(dialect: Dialect) -> Self {
        Lexer {
            tokens: Vec::new(),
            backslash_escapes: dialect.backslash_escapes(),
        }
    }

    pub fn tokenize(&mut self, input: &str) -> Result<Vec<Token>, LexerError> {
        self.tokens.clear();

        let rule = if self.backslash_escapes {
            Rule::backslash_sql
        } else {
            Rule::sql
        };
        let pairs = SqlParser::parse(rule, input).map_err(LexerError::from)?;

        for pair in pairs.flat_map(|p| p.into_inner()) {
            self.process_pair(pair)?;
        }

        Ok(std::mem::take(&mut self.tokens))
    }

    fn process_pair(&mut self, pair: Pair<Rule>) -> Result<(), LexerError> {
        let span = pair.as_span();
        let lexeme = span.as_str();

        let kind = match pair.as_rule() {
            Rule::EOI => return Ok(()),
            Rule::word => TokenKind::Word,
            Rule::quoted_ident => TokenKind::QuotedIdent(unquote(lexeme, '"')),
            Rule::backtick_ident => TokenKind::QuotedIdent(unquote(lexeme, '`')),
            Rule::string_literal | Rule::backslash_string | Rule::escape_string => {
                TokenKind::String
            }
            Rule::number => TokenKind::Number,
            Rule::placeholder if lexeme == "?" => TokenKind::Placeholder,
            Rule::placeholder => lexeme[1..]
                .parse::<usize>()
                .map(TokenKind::NumberedPlaceholder)
                .map_err(|_| LexerError::InvalidPlaceholder(lexeme.to_string()))?,
            Rule::lparen => TokenKind::LeftParen,
            Rule::rparen => TokenKind::RightParen,
            Rule::comma => TokenKind::Comma,
            Rule::dot => TokenKind::Dot,
            Rule::semicolon => TokenKind::Semicolon,
            _ => TokenKind::Operator,
        };

        let (line, column) = span.start_pos().line_col();
        self.tokens.push(Token {
            kind,
            lexeme: lexeme.to_string(),
            line,
            column,
            span: (span.start(), span.end()),
        });
        Ok(())
    }
}

impl Default for Lexer {
    fn default() -> Self {
        Self::new()
    }
}

/// Tokenizes `input` with a fresh lexer.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexerError> {
    Lexer::new().tokenize(input)
}

/// Tokenizes `input` with the string literal rules of `dialect`.
pub fn tokenize_for(input: &str, dialect: Dialect) -> Result<Vec<Token>, LexerError> {
    Lexer::for_dialect(dialect).tokenize(input)
}

fn unquote(lexeme: &str, quote: char) -> String {
    let inner = &lexeme[quote.len_utf8()..lexeme.len() - quote.len_utf8()];
    let doubled = format!("{quote}{quote}");
    inner.replace(&doubled, &quote.to_string())
}

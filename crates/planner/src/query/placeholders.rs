use crate::query::{
    dialect::Dialect,
    lexer::{token::TokenKind, tokenize_for},
};
use crate::query::error::StatementError;

/// Rewrites `?` placeholders into the dialect's native form. Placeholders in
/// string literals, quoted identifiers and comments are left alone.
pub fn bind_placeholders(sql: &str, dialect: Dialect) -> Result<String, StatementError> {
    if dialect.placeholder(0) == "?" {
        return Ok(sql.to_string());
    }

    let tokens = tokenize_for(sql, dialect)?;
    let mut out = String::with_capacity(sql.len() + 8);
    let mut last = 0;
    let mut index = 0;

    for token in tokens.iter().filter(|t| t.kind == TokenKind::Placeholder) {
        out.push_str(&sql[last..token.start()]);
        out.push_str(&dialect.placeholder(index));
        last = token.end();
        index += 1;
    }
    out.push_str(&sql[last..]);

    Ok(out)
}

//! Finds the clause boundaries a poll query needs rewritten, working on the
//! token stream at parenthesis depth 0 only.

use crate::query::{
    dialect::Dialect,
    error::StatementError,
    lexer::{
        token::{Token, TokenKind},
        tokenize, tokenize_for,
    },
};
use model::pagination::cursor::SortDirection;

const SET_OPERATIONS: [&str; 3] = ["UNION", "INTERSECT", "EXCEPT"];

/// Clauses that may follow `ORDER BY`.
const TRAILING_CLAUSES: [&str; 4] = ["LIMIT", "OFFSET", "FETCH", "FOR"];

/// Keywords that end a sort key expression and start its modifiers.
const KEY_MODIFIERS: [&str; 5] = ["ASC", "DESC", "NULLS", "COLLATE", "USING"];

#[derive(Debug, Clone, PartialEq)]
pub struct QueryShape {
    pub order_by: OrderByClause,
    pub where_clause: Option<WhereClause>,
    /// Byte offset where a new `WHERE` clause goes when the query has none.
    pub insert_at: usize,
    /// Byte offsets of the `?` placeholders, in order.
    pub placeholders: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByClause {
    /// Byte offset of the `ORDER` keyword.
    pub start: usize,
    /// First sort key with identifier quotes and whitespace removed, lowercased.
    pub first_key: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    /// Byte span of the predicate following `WHERE`.
    pub predicate: (usize, usize),
    pub top_level_or: bool,
}

pub fn locate(sql: &str, dialect: Dialect) -> Result<QueryShape, StatementError> {
    let tokens = tokenize_for(sql, dialect)?;
    let depths = depths(&tokens);
    let top: Vec<usize> = (0..tokens.len()).filter(|&i| depths[i] == 0).collect();

    let mut placeholders = Vec::new();
    for token in &tokens {
        match token.kind {
            TokenKind::Placeholder => placeholders.push(token.start()),
            TokenKind::NumberedPlaceholder(_) => {
                return Err(StatementError::Lex(format!(
                    "numbered placeholder '{}' at line {}, column {}; write '?' instead",
                    token.lexeme, token.line, token.column
                )));
            }
            _ => {}
        }
    }

    if let Some(&i) = top
        .iter()
        .find(|&&i| SET_OPERATIONS.iter().any(|op| tokens[i].is_keyword(op)))
    {
        return Err(StatementError::UnsupportedSetOperation(
            tokens[i].lexeme.to_uppercase(),
        ));
    }

    let from = top
        .iter()
        .position(|&i| tokens[i].is_keyword("FROM"))
        .unwrap_or(0);
    let top = &top[from..];

    let order = top
        .iter()
        .position(|&i| is_pair(&tokens, i, "ORDER", "BY"))
        .ok_or(StatementError::MissingOrderBy)?;
    let order_by = order_by_clause(&tokens, &depths, top[order])?;

    let where_pos = top[..order]
        .iter()
        .position(|&i| tokens[i].is_keyword("WHERE"));
    let scan_from = where_pos.map(|p| p + 1).unwrap_or(0);
    let boundary = top[scan_from..]
        .iter()
        .position(|&i| is_clause_start(&tokens, i))
        .map(|p| top[scan_from + p])
        .unwrap_or(top[order]);
    if boundary == 0 {
        return Err(StatementError::Lex(
            "query starts with a clause keyword".to_string(),
        ));
    }

    let where_clause = match where_pos {
        Some(p) => {
            let first = top[p] + 1;
            if first >= boundary {
                return Err(StatementError::Lex(format!(
                    "empty WHERE clause at line {}",
                    tokens[top[p]].line
                )));
            }
            let predicate = &tokens[first..boundary];
            let top_level_or = predicate.iter().zip(&depths[first..boundary]).any(|(t, &d)| {
                // MySQL treats `||` as OR; parenthesizing is harmless elsewhere.
                d == 0 && (t.is_keyword("OR") || (t.kind == TokenKind::Operator && t.lexeme == "||"))
            });
            Some(WhereClause {
                predicate: (tokens[first].start(), tokens[boundary - 1].end()),
                top_level_or,
            })
        }
        None => None,
    };

    Ok(QueryShape {
        order_by,
        where_clause,
        insert_at: tokens[boundary - 1].end(),
        placeholders,
    })
}

/// Parses a declared column reference (`ts`, `t.ts`, `"t"."Ts"`) into its
/// unquoted segments.
pub fn column_segments(column: &str) -> Result<Vec<String>, StatementError> {
    let tokens = tokenize(column)?;
    if tokens.is_empty() {
        return Err(StatementError::EmptyTiebreaker);
    }

    let mut segments = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        let expect_ident = i % 2 == 0;
        match (&token.kind, expect_ident) {
            (TokenKind::Word | TokenKind::QuotedIdent(_), true) => {
                segments.push(token.ident_text().to_string())
            }
            (TokenKind::Dot, false) => {}
            _ => {
                return Err(StatementError::Lex(format!(
                    "'{column}' is not a column reference"
                )));
            }
        }
    }

    if tokens.len() % 2 == 0 || segments.iter().any(|s| s.trim().is_empty()) {
        return Err(StatementError::Lex(format!(
            "'{column}' is not a column reference"
        )));
    }
    Ok(segments)
}

/// Comparison form of a column reference, matching `OrderByClause::first_key`.
pub fn normalize_key(segments: &[String]) -> String {
    segments.join(".").to_lowercase()
}

fn order_by_clause(
    tokens: &[Token],
    depths: &[usize],
    order: usize,
) -> Result<OrderByClause, StatementError> {
    let key_start = order + 2;
    let ends_key = |i: usize| {
        depths[i] == 0
            && (matches!(tokens[i].kind, TokenKind::Comma | TokenKind::Semicolon)
                || TRAILING_CLAUSES.iter().any(|k| tokens[i].is_keyword(k)))
    };
    let item_end = (key_start..tokens.len())
        .find(|&i| ends_key(i))
        .unwrap_or(tokens.len());
    let key_end = (key_start..item_end)
        .find(|&i| depths[i] == 0 && KEY_MODIFIERS.iter().any(|k| tokens[i].is_keyword(k)))
        .unwrap_or(item_end);

    if key_start >= key_end {
        return Err(StatementError::MissingOrderBy);
    }

    let first_key = tokens[key_start..key_end]
        .iter()
        .map(Token::ident_text)
        .collect::<String>()
        .to_lowercase();

    // Modifiers may come in any order: `COLLATE "C" DESC`, `USING >`.
    let mut direction = SortDirection::Ascending;
    for i in (key_end..item_end).filter(|&i| depths[i] == 0) {
        if tokens[i].is_keyword("DESC") {
            direction = SortDirection::Descending;
        } else if tokens[i].is_keyword("USING") {
            match tokens.get(i + 1).map(|t| (&t.kind, t.lexeme.as_str())) {
                Some((TokenKind::Operator, ">")) => direction = SortDirection::Descending,
                Some((TokenKind::Operator, "<")) => direction = SortDirection::Ascending,
                _ => {}
            }
        }
    }

    Ok(OrderByClause {
        start: tokens[order].start(),
        first_key,
        direction,
    })
}

fn depths(tokens: &[Token]) -> Vec<usize> {
    let mut depth = 0usize;
    tokens
        .iter()
        .map(|t| match t.kind {
            TokenKind::LeftParen => {
                depth += 1;
                depth - 1
            }
            TokenKind::RightParen => {
                depth = depth.saturating_sub(1);
                depth
            }
            _ => depth,
        })
        .collect()
}

fn is_pair(tokens: &[Token], i: usize, first: &str, second: &str) -> bool {
    tokens[i].is_keyword(first) && tokens.get(i + 1).is_some_and(|t| t.is_keyword(second))
}

fn is_clause_start(tokens: &[Token], i: usize) -> bool {
    is_pair(tokens, i, "GROUP", "BY")
        || is_pair(tokens, i, "ORDER", "BY")
        || ["HAVING", "WINDOW", "LIMIT", "OFFSET", "FETCH", "FOR"]
            .iter()
            .any(|k| tokens[i].is_keyword(k))
        || tokens[i].kind == TokenKind::Semicolon
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locate_pg(sql: &str) -> Result<QueryShape, StatementError> {
        locate(sql, Dialect::Postgres)
    }

    #[test]
    fn test_direction_after_key_modifiers() {
        for (sql, direction) in [
            (r#"SELECT * FROM t ORDER BY name COLLATE "C" DESC"#, SortDirection::Descending),
            ("SELECT * FROM t ORDER BY id NULLS LAST", SortDirection::Ascending),
            ("SELECT * FROM t ORDER BY id DESC NULLS FIRST, ts", SortDirection::Descending),
            ("SELECT * FROM t ORDER BY id USING >", SortDirection::Descending),
            ("SELECT * FROM t ORDER BY id USING < LIMIT 5", SortDirection::Ascending),
            ("SELECT * FROM t ORDER BY id, ts DESC", SortDirection::Ascending),
        ] {
            let order_by = locate_pg(sql).unwrap().order_by;
            assert_eq!(order_by.direction, direction, "{sql}");
            assert!(matches!(order_by.first_key.as_str(), "id" | "name"), "{sql}");
        }
    }

    #[test]
    fn test_mysql_backslash_escaped_literal() {
        let sql = r"SELECT * FROM t WHERE name <> 'O\'Brien' AND x = ? ORDER BY id";
        let shape = locate(sql, Dialect::MySql).unwrap();
        assert_eq!(shape.placeholders.len(), 1);
        assert!(locate_pg(sql).is_err());
    }

    #[test]
    fn test_locate_without_where() {
        let sql = "SELECT id, name FROM users ORDER BY id";
        let shape = locate(sql, Dialect::Postgres).unwrap();
        assert!(shape.where_clause.is_none());
        assert_eq!(&sql[..shape.insert_at], "SELECT id, name FROM users");
        assert_eq!(&sql[shape.order_by.start..], "ORDER BY id");
        assert_eq!(shape.order_by.first_key, "id");
        assert_eq!(shape.order_by.direction, SortDirection::Ascending);
    }

    #[test]
    fn test_locate_where_and_group_by() {
        let sql = "SELECT k, max(ts) AS ts FROM t WHERE a = ? AND b > 1 GROUP BY k HAVING count(*) > ? ORDER BY \"TS\" DESC, k";
        let shape = locate(sql, Dialect::Postgres).unwrap();
        let clause = shape.where_clause.unwrap();
        assert_eq!(&sql[clause.predicate.0..clause.predicate.1], "a = ? AND b > 1");
        assert!(!clause.top_level_or);
        assert_eq!(shape.order_by.first_key, "ts");
        assert_eq!(shape.order_by.direction, SortDirection::Descending);
        assert_eq!(shape.placeholders.len(), 2);
    }

    #[test]
    fn test_top_level_or_ignores_nested() {
        let nested = locate_pg("SELECT * FROM t WHERE (a OR b) AND c ORDER BY id").unwrap();
        assert!(!nested.where_clause.unwrap().top_level_or);

        let top = locate_pg("SELECT * FROM t WHERE a = 1 OR b = 2 ORDER BY id").unwrap();
        assert!(top.where_clause.unwrap().top_level_or);
    }

    #[test]
    fn test_window_and_subquery_order_by_are_ignored() {
        let sql = "SELECT id, row_number() OVER (ORDER BY name) FROM (SELECT * FROM u ORDER BY name) s ORDER BY s.id";
        let shape = locate(sql, Dialect::Postgres).unwrap();
        assert_eq!(shape.order_by.first_key, "s.id");
        assert_eq!(
            &sql[..shape.insert_at],
            "SELECT id, row_number() OVER (ORDER BY name) FROM (SELECT * FROM u ORDER BY name) s"
        );
    }

    #[test]
    fn test_missing_order_by() {
        assert_eq!(
            locate_pg("SELECT * FROM t WHERE x = 1").unwrap_err(),
            StatementError::MissingOrderBy
        );
    }

    #[test]
    fn test_set_operation_rejected() {
        assert_eq!(
            locate_pg("SELECT id FROM a UNION ALL SELECT id FROM b ORDER BY id").unwrap_err(),
            StatementError::UnsupportedSetOperation("UNION".into())
        );
    }

    #[test]
    fn test_numbered_placeholder_rejected() {
        assert!(matches!(
            locate_pg("SELECT * FROM t WHERE a = $1 ORDER BY id"),
            Err(StatementError::Lex(_))
        ));
    }

    #[test]
    fn test_column_segments() {
        assert_eq!(column_segments("ts").unwrap(), vec!["ts"]);
        assert_eq!(column_segments("\"T\".`Ts`").unwrap(), vec!["T", "Ts"]);
        assert_eq!(normalize_key(&column_segments("\"T\".Ts").unwrap()), "t.ts");
        assert_eq!(column_segments("  ").unwrap_err(), StatementError::EmptyTiebreaker);
        assert!(column_segments("t.").is_err());
        assert!(column_segments("lower(ts)").is_err());
    }
}

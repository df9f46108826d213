use super::*;

fn kinds(input: &str) -> Vec<TokenKind> {
    tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
}

#[test]
fn test_basic_select() {
    let tokens = tokenize("SELECT id, name FROM t WHERE x >= ? ORDER BY id").unwrap();
    let lexemes: Vec<_> = tokens.iter().map(|t| t.lexeme.as_str()).collect();
    assert_eq!(
        lexemes,
        vec![
            "SELECT", "id", ",", "name", "FROM", "t", "WHERE", "x", ">=", "?", "ORDER", "BY", "id"
        ]
    );
    assert_eq!(tokens[9].kind, TokenKind::Placeholder);
    assert!(tokens[10].is_keyword("order"));
}

#[test]
fn test_spans_point_into_source() {
    let sql = "SELECT  a\nFROM t";
    let tokens = tokenize(sql).unwrap();
    for token in &tokens {
        assert_eq!(&sql[token.start()..token.end()], token.lexeme);
    }
    assert_eq!((tokens[2].line, tokens[2].column), (2, 1));
}

#[test]
fn test_quoted_identifiers() {
    assert_eq!(
        kinds(r#""Order ""Id""" `ts`"#),
        vec![
            TokenKind::QuotedIdent("Order \"Id\"".into()),
            TokenKind::QuotedIdent("ts".into())
        ]
    );
}

#[test]
fn test_placeholders_in_literals_and_comments_are_ignored() {
    let sql = "SELECT '?', 'it''s' -- ?\n /* ? */ FROM t WHERE a = ? AND b = $2";
    let placeholders: Vec<_> = tokenize(sql)
        .unwrap()
        .into_iter()
        .filter(|t| {
            matches!(
                t.kind,
                TokenKind::Placeholder | TokenKind::NumberedPlaceholder(_)
            )
        })
        .map(|t| t.kind)
        .collect();
    assert_eq!(
        placeholders,
        vec![TokenKind::Placeholder, TokenKind::NumberedPlaceholder(2)]
    );
}

#[test]
fn test_operators_and_numbers() {
    assert_eq!(
        kinds("a::int <> 1.5e3 || -2"),
        vec![
            TokenKind::Word,
            TokenKind::Operator,
            TokenKind::Word,
            TokenKind::Operator,
            TokenKind::Number,
            TokenKind::Operator,
            TokenKind::Operator,
            TokenKind::Number,
        ]
    );
}

#[test]
fn test_unterminated_string_is_error() {
    let err = tokenize("SELECT 'abc FROM t").unwrap_err();
    assert!(matches!(err, LexerError::Syntax { line: 1, .. }));
}

#[test]
fn test_backslash_escape_follows_dialect() {
    let sql = r"WHERE name <> 'O\'Brien' ORDER BY id";

    let tokens = tokenize_for(sql, Dialect::MySql).unwrap();
    assert_eq!(tokens[3].kind, TokenKind::String);
    assert_eq!(tokens[3].lexeme, r"'O\'Brien'");
    assert_eq!(tokens.len(), 7);

    // Standard literals end at the first quote after the backslash.
    assert!(tokenize_for(sql, Dialect::Postgres).is_err());
    let tokens = tokenize(r"SELECT 'C:\' FROM t").unwrap();
    assert_eq!(tokens[1].lexeme, r"'C:\'");
}

#[test]
fn test_postgres_escape_string() {
    let tokens = tokenize(r"SELECT e'a\'b', E'' FROM t").unwrap();
    let lexemes: Vec<_> = tokens.iter().map(|t| t.lexeme.as_str()).collect();
    assert_eq!(lexemes, vec!["SELECT", r"e'a\'b'", ",", "E''", "FROM", "t"]);
    assert_eq!(tokens[1].kind, TokenKind::String);
}

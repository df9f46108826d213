use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
    /// Byte offsets into the source text, end exclusive.
    pub span: (usize, usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Bare word: keyword or unquoted identifier.
    Word,
    /// `"ident"` or `` `ident` `` with the quotes removed and doubled quotes collapsed.
    QuotedIdent(String),
    String,
    Number,
    /// `?`
    Placeholder,
    /// `$n`
    NumberedPlaceholder(usize),
    LeftParen,
    RightParen,
    Comma,
    Dot,
    Semicolon,
    Operator,
}

impl Token {
    pub fn start(&self) -> usize {
        self.span.0
    }

    pub fn end(&self) -> usize {
        self.span.1
    }

    /// Case-insensitive keyword test; quoted identifiers never match.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Word && self.lexeme.eq_ignore_ascii_case(keyword)
    }

    /// Identifier text as the database sees it: quotes stripped for quoted
    /// identifiers, the raw lexeme for everything else.
    pub fn ident_text(&self) -> &str {
        match &self.kind {
            TokenKind::QuotedIdent(name) => name,
            _ => &self.lexeme,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Word => write!(f, "word"),
            TokenKind::QuotedIdent(_) => write!(f, "quoted identifier"),
            TokenKind::String => write!(f, "string literal"),
            TokenKind::Number => write!(f, "number"),
            TokenKind::Placeholder => write!(f, "?"),
            TokenKind::NumberedPlaceholder(n) => write!(f, "${n}"),
            TokenKind::LeftParen => write!(f, "("),
            TokenKind::RightParen => write!(f, ")"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Dot => write!(f, "."),
            TokenKind::Semicolon => write!(f, ";"),
            TokenKind::Operator => write!(f, "operator"),
        }
    }
}

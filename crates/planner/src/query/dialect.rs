//! Vendor-specific SQL quoting and placeholder syntax.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[serde(alias = "postgresql", alias = "pg")]
    Postgres,
    MySql,
    MariaDb,
}

impl Dialect {
    /// Wraps an identifier in the dialect's quotes, doubling embedded quote
    /// characters.
    ///
    /// - PostgreSQL uses double quotes: `"my_column"`
    /// - MySQL and MariaDB use backticks: `` `my_column` ``
    pub fn quote_identifier(&self, ident: &str) -> String {
        let q = self.quote_char();
        let escaped = ident.replace(q, &format!("{q}{q}"));
        format!("{q}{escaped}{q}")
    }

    /// Quotes each segment of a qualified name: `t.ts` becomes `"t"."ts"`.
    pub fn quote_qualified<S: AsRef<str>>(&self, segments: &[S]) -> String {
        segments
            .iter()
            .map(|s| self.quote_identifier(s.as_ref()))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Returns the placeholder for a parameterized query.
    ///
    /// - PostgreSQL uses `$1`, `$2`, etc.
    /// - MySQL uses `?`
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", index + 1),
            Dialect::MySql | Dialect::MariaDb => "?".to_string(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Postgres => "PostgreSQL",
            Dialect::MySql => "MySQL",
            Dialect::MariaDb => "MariaDB",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Dialect::Postgres => 5432,
            Dialect::MySql | Dialect::MariaDb => 3306,
        }
    }

    /// Whether a backslash escapes the next character inside `'...'`.
    /// Holds for MySQL unless `NO_BACKSLASH_ESCAPES` is set.
    pub fn backslash_escapes(&self) -> bool {
        matches!(self, Dialect::MySql | Dialect::MariaDb)
    }

    fn quote_char(&self) -> char {
        match self {
            Dialect::Postgres => '"',
            Dialect::MySql | Dialect::MariaDb => '`',
        }
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "mysql" => Ok(Dialect::MySql),
            "mariadb" => Ok(Dialect::MariaDb),
            other => Err(format!(
                "unknown dialect '{other}' (expected postgres, mysql or mariadb)"
            )),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(Dialect::Postgres.quote_identifier("order"), r#""order""#);
        assert_eq!(Dialect::MySql.quote_identifier("order"), "`order`");
        assert_eq!(Dialect::Postgres.quote_identifier(r#"a"b"#), r#""a""b""#);
        assert_eq!(Dialect::MariaDb.quote_identifier("a`b"), "`a``b`");
    }

    #[test]
    fn test_quote_qualified() {
        assert_eq!(Dialect::Postgres.quote_qualified(&["t", "ts"]), r#""t"."ts""#);
        assert_eq!(Dialect::MySql.quote_qualified(&["ts"]), "`ts`");
    }

    #[test]
    fn test_from_str() {
        assert_eq!("PG".parse::<Dialect>().unwrap(), Dialect::Postgres);
        assert_eq!("mariadb".parse::<Dialect>().unwrap(), Dialect::MariaDb);
        assert!("oracle".parse::<Dialect>().is_err());
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of the first `ORDER BY` key.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Ascending => write!(f, "ASC"),
            SortDirection::Descending => write!(f, "DESC"),
        }
    }
}

/// Comparison used in the injected keyset predicate.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Gt,
    GtEq,
    Lt,
    LtEq,
}

impl ComparisonOperator {
    /// Strict comparisons exclude the last seen value; inclusive ones re-read it.
    pub fn derive(direction: SortDirection, strict: bool) -> Self {
        match (direction, strict) {
            (SortDirection::Ascending, false) => ComparisonOperator::GtEq,
            (SortDirection::Ascending, true) => ComparisonOperator::Gt,
            (SortDirection::Descending, false) => ComparisonOperator::LtEq,
            (SortDirection::Descending, true) => ComparisonOperator::Lt,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            ComparisonOperator::Gt => ">",
            ComparisonOperator::GtEq => ">=",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::LtEq => "<=",
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_table() {
        let cases = [
            (SortDirection::Ascending, false, ">="),
            (SortDirection::Ascending, true, ">"),
            (SortDirection::Descending, false, "<="),
            (SortDirection::Descending, true, "<"),
        ];

        for (direction, strict, expected) in cases {
            assert_eq!(
                ComparisonOperator::derive(direction, strict).as_sql(),
                expected,
                "{direction} strict={strict}"
            );
        }
    }
}

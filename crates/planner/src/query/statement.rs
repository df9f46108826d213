//! Keyset-paginated poll query. Owns the base SQL, the tie-breaker and the
//! last observed cursor value, and produces the SQL text and parameters for
//! each poll.

use crate::query::{
    dialect::Dialect,
    error::StatementError,
    locator::{QueryShape, column_segments, locate, normalize_key},
};
use model::{
    core::value::Value,
    pagination::cursor::{ComparisonOperator, SortDirection},
    records::row::RowData,
};
use tracing::debug;

#[derive(Debug)]
pub struct PollStatement {
    dialect: Dialect,
    base_sql: String,
    current_sql: String,
    /// Base SQL with the cursor predicate spliced in, computed up front.
    injected_sql: String,
    /// Position of the cursor parameter among the `?` placeholders of `injected_sql`.
    cursor_index: usize,
    tiebreaker: Vec<String>,
    direction: SortDirection,
    strict: bool,
    operator: ComparisonOperator,
    cursor: Option<Value>,
    initial_parameters: Vec<Value>,
}

impl PollStatement {
    /// Validates the query against the tie-breaker and parameters.
    ///
    /// Fails when the query has no top-level `ORDER BY`, when its first sort
    /// key is not the tie-breaker, or when the placeholder count does not
    /// match `parameters`.
    pub fn new(
        dialect: Dialect,
        sql: impl Into<String>,
        parameters: Vec<Value>,
        tiebreaker: &str,
        strict: bool,
    ) -> Result<Self, StatementError> {
        let base_sql = sql.into();
        let tiebreaker = column_segments(tiebreaker)?;
        let shape = locate(&base_sql, dialect)?;

        let expected = normalize_key(&tiebreaker);
        if shape.order_by.first_key != expected {
            return Err(StatementError::TiebreakerMismatch {
                expected: tiebreaker.join("."),
                found: shape.order_by.first_key,
            });
        }

        if shape.placeholders.len() != parameters.len() {
            return Err(StatementError::ParameterCountMismatch {
                placeholders: shape.placeholders.len(),
                parameters: parameters.len(),
            });
        }

        let direction = shape.order_by.direction;
        let operator = ComparisonOperator::derive(direction, strict);
        let predicate = format!(
            "{} {} ?",
            dialect.quote_qualified(&tiebreaker),
            operator.as_sql()
        );
        let (injected_sql, cursor_index) = inject(&base_sql, &shape, &predicate);

        Ok(PollStatement {
            dialect,
            current_sql: base_sql.clone(),
            base_sql,
            injected_sql,
            cursor_index,
            tiebreaker,
            direction,
            strict,
            operator,
            cursor: None,
            initial_parameters: parameters,
        })
    }

    pub fn query(&self) -> &str {
        &self.current_sql
    }

    /// Initial parameters, plus the cursor value once one is set.
    pub fn parameters(&self) -> Vec<Value> {
        let mut params = self.initial_parameters.clone();
        if let Some(cursor) = &self.cursor {
            params.insert(self.cursor_index, cursor.clone());
        }
        params
    }

    /// Stores the cursor. The first non-null value switches the query to the
    /// injected form; null values are ignored.
    pub fn set_cursor(&mut self, value: Value) {
        if value.is_null() {
            return;
        }

        if self.cursor.is_none() {
            self.current_sql.clone_from(&self.injected_sql);
            debug!(sql = %self.current_sql, "Injected cursor predicate");
        }
        self.cursor = Some(value);
    }

    pub fn reset(&mut self) {
        self.current_sql.clone_from(&self.base_sql);
        self.cursor = None;
    }

    /// Tie-breaker value of `row`; `None` when the row lacks the column.
    pub fn cursor_from(&self, row: &RowData) -> Option<Value> {
        row.get(self.cursor_column())
            .map(|field| field.value.clone().unwrap_or(Value::Null))
    }

    /// Result-set column holding the tie-breaker: the last segment of a
    /// qualified name.
    pub fn cursor_column(&self) -> &str {
        self.tiebreaker.last().map(String::as_str).unwrap_or_default()
    }

    pub fn cursor(&self) -> Option<&Value> {
        self.cursor.as_ref()
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    pub fn operator(&self) -> ComparisonOperator {
        self.operator
    }

    pub fn tiebreaker(&self) -> String {
        self.tiebreaker.join(".")
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn base_query(&self) -> &str {
        &self.base_sql
    }

    /// The query as it reads once a cursor has been set.
    pub fn injected_query(&self) -> &str {
        &self.injected_sql
    }
}

fn inject(sql: &str, shape: &QueryShape, predicate: &str) -> (String, usize) {
    let (rewritten, at) = match &shape.where_clause {
        None => {
            let at = shape.insert_at;
            (
                format!("{} WHERE {predicate}{}", &sql[..at], &sql[at..]),
                at,
            )
        }
        Some(clause) if clause.top_level_or => {
            let (start, end) = clause.predicate;
            (
                format!(
                    "{}({}) AND {predicate}{}",
                    &sql[..start],
                    &sql[start..end],
                    &sql[end..]
                ),
                end,
            )
        }
        Some(clause) => {
            let end = clause.predicate.1;
            (
                format!("{} AND {predicate}{}", &sql[..end], &sql[end..]),
                end,
            )
        }
    };

    let cursor_index = shape.placeholders.iter().filter(|&&p| p < at).count();
    (rewritten, cursor_index)
}

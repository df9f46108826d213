//! In-memory `PollConnection` backed by a shared table. Used to drive the
//! poll loop without a database server.
//!
//! Only the keyset predicate and the `ORDER BY` direction of the statement
//! are evaluated; any other filtering in the query text is ignored, and a
//! query without `ORDER BY` returns the table in ascending order.

use crate::{
    error::{ConnectorError, DbError},
    sql::base::connection::{ConnectionFactory, PollConnection},
};
use async_trait::async_trait;
use model::{
    core::value::Value,
    pagination::cursor::SortDirection,
    records::{batch::RawBatch, row::RowData},
};
use planner::query::{
    dialect::Dialect,
    lexer::{token::TokenKind, tokenize_for},
    locator::locate,
};
use std::{
    cmp::Ordering,
    io,
    sync::{Arc, Mutex, MutexGuard},
    time::Instant,
};

#[derive(Debug, Default)]
struct TableState {
    rows: Vec<RowData>,
    failing_queries: usize,
    failing_connects: usize,
    connects: usize,
    executed: Vec<(String, Vec<Value>)>,
}

/// Rows shared by every connection created from the same table.
#[derive(Debug, Clone)]
pub struct MemoryTable {
    column: String,
    state: Arc<Mutex<TableState>>,
}

impl MemoryTable {
    /// `column` is the tie-breaker as it appears in the rewritten query.
    pub fn new(column: impl Into<String>) -> Self {
        MemoryTable {
            column: column.into(),
            state: Arc::new(Mutex::new(TableState::default())),
        }
    }

    pub fn insert(&self, rows: impl IntoIterator<Item = RowData>) {
        self.lock().rows.extend(rows);
    }

    /// The next `n` queries fail with a connection reset.
    pub fn fail_next_queries(&self, n: usize) {
        self.lock().failing_queries = n;
    }

    /// The next `n` connection attempts are refused.
    pub fn fail_next_connects(&self, n: usize) {
        self.lock().failing_connects = n;
    }

    /// Successful connection attempts so far.
    pub fn connects(&self) -> usize {
        self.lock().connects
    }

    /// Every query that reached the table, with its parameters.
    pub fn executed(&self) -> Vec<(String, Vec<Value>)> {
        self.lock().executed.clone()
    }

    pub fn factory(&self, dialect: Dialect) -> MemoryConnectionFactory {
        MemoryConnectionFactory {
            table: self.clone(),
            dialect,
        }
    }

    fn lock(&self) -> MutexGuard<'_, TableState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn query(&self, sql: &str, params: &[Value], dialect: Dialect) -> Result<Vec<RowData>, DbError> {
        let direction = locate(sql, dialect)
            .map(|shape| shape.order_by.direction)
            .unwrap_or(SortDirection::Ascending);
        let predicate = keyset_predicate(sql, &self.column, params, dialect)?;

        let mut state = self.lock();
        state.executed.push((sql.to_string(), params.to_vec()));
        if state.failing_queries > 0 {
            state.failing_queries -= 1;
            return Err(DbError::Io(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )));
        }

        let mut rows: Vec<RowData> = state
            .rows
            .iter()
            .filter(|row| match &predicate {
                Some((op, bound)) => matches_op(&row.get_value(&self.column), op, bound),
                None => true,
            })
            .cloned()
            .collect();

        rows.sort_by(|a, b| {
            let ord = a
                .get_value(&self.column)
                .compare(&b.get_value(&self.column))
                .unwrap_or(Ordering::Equal);
            match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });
        Ok(rows)
    }
}

/// Finds `<quoted column> <op> ?` and the parameter bound to that placeholder.
fn keyset_predicate(
    sql: &str,
    column: &str,
    params: &[Value],
    dialect: Dialect,
) -> Result<Option<(String, Value)>, DbError> {
    let tokens = tokenize_for(sql, dialect).map_err(|e| DbError::Unknown(e.to_string()))?;
    let mut placeholder = 0;

    for (i, token) in tokens.iter().enumerate() {
        if token.kind != TokenKind::Placeholder {
            continue;
        }
        if i >= 2
            && tokens[i - 1].kind == TokenKind::Operator
            && matches!(&tokens[i - 2].kind, TokenKind::QuotedIdent(name) if name.eq_ignore_ascii_case(column))
        {
            let bound = params.get(placeholder).cloned().ok_or_else(|| {
                DbError::Unknown(format!("no parameter bound to placeholder {placeholder}"))
            })?;
            return Ok(Some((tokens[i - 1].lexeme.clone(), bound)));
        }
        placeholder += 1;
    }

    Ok(None)
}

fn matches_op(value: &Value, op: &str, bound: &Value) -> bool {
    let Some(ord) = value.compare(bound) else {
        return false;
    };
    match op {
        ">" => ord == Ordering::Greater,
        ">=" => ord != Ordering::Less,
        "<" => ord == Ordering::Less,
        "<=" => ord != Ordering::Greater,
        _ => false,
    }
}

pub struct MemoryConnection {
    table: MemoryTable,
    dialect: Dialect,
    connected: bool,
}

#[async_trait]
impl PollConnection for MemoryConnection {
    async fn connect(&mut self) -> Result<(), ConnectorError> {
        let mut state = self.table.lock();
        if state.failing_connects > 0 {
            state.failing_connects -= 1;
            return Err(ConnectorError::Timeout(std::time::Duration::ZERO));
        }
        state.connects += 1;
        self.connected = true;
        Ok(())
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<RawBatch, DbError> {
        if !self.connected {
            return Err(DbError::NotConnected);
        }
        let started = Instant::now();
        let result = self.table.query(sql, params, self.dialect);
        if matches!(&result, Err(e) if e.is_connection_lost()) {
            self.connected = false;
        }
        Ok(RawBatch::new(result?, started.elapsed()))
    }

    async fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }
}

#[derive(Debug, Clone)]
pub struct MemoryConnectionFactory {
    table: MemoryTable,
    dialect: Dialect,
}

impl ConnectionFactory for MemoryConnectionFactory {
    fn create(&self) -> Box<dyn PollConnection> {
        Box::new(MemoryConnection {
            table: self.table.clone(),
            dialect: self.dialect,
            connected: false,
        })
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }
}

use crate::records::row::RowData;
use std::time::Duration;

/// Rows returned by a single successful poll, handed from the poll loop to the converter.
#[derive(Debug, Clone)]
pub struct RawBatch {
    pub rows: Vec<RowData>,
    pub row_count: usize,
    /// Time spent executing the query.
    pub elapsed: Duration,
}

impl RawBatch {
    pub fn new(rows: Vec<RowData>, elapsed: Duration) -> Self {
        RawBatch {
            row_count: rows.len(),
            rows,
            elapsed,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn last_row(&self) -> Option<&RowData> {
        self.rows.last()
    }
}

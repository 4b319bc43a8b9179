use serde::{Deserialize, Serialize};

use super::interval::Row;

/// Display state for one instrumented thread: its depth-indexed rows and
/// where they start in the global row numbering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreadRow {
    pub label: String,
    /// Global index of this thread's depth-0 row.
    pub row_offset: usize,
    /// `rows[d]` holds every interval at nesting depth `d`.
    pub rows: Vec<Row>,
    /// Highest frame number processed in arrival order, if any.
    pub last_frame: Option<i64>,
}

impl ThreadRow {
    pub fn with_offset(row_offset: usize) -> Self {
        Self {
            row_offset,
            ..Self::default()
        }
    }

    /// Offset of the thread that follows this one, leaving room for the
    /// separator row.
    pub fn next_offset(&self) -> usize {
        self.row_offset + self.rows.len() + 1
    }

    pub fn num_bars(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }
}

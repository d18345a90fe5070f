//! Error types for the event harness.

use thiserror::Error;
use truthtree_core::TreeError;

/// Errors raised while reading events or processing them.
#[derive(Debug, Error)]
pub enum EventError {
    /// Reading or writing a file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Event file is not valid JSON for the columnar layout
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Columns of one table disagree in length
    #[error("Column {column} has {found} entries, expected {expected}")]
    ColumnLength {
        column: &'static str,
        expected: usize,
        found: usize,
    },

    /// A value does not fit the typed record
    #[error("Invalid value in {column}[{row}]: {value}")]
    InvalidValue {
        column: &'static str,
        row: usize,
        value: i64,
    },

    /// Tree reconstruction rejected the event
    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),
}

impl EventError {
    /// Creates a column length error.
    pub fn column_length(column: &'static str, expected: usize, found: usize) -> Self {
        Self::ColumnLength {
            column,
            expected,
            found,
        }
    }
}

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backend::BackendCursor;
use crate::types::RowValues;

/// A row from a query result, with access by column name or index.
///
/// Column names are shared across all rows of one result set; cached rows
/// are serialized as-is so a cache store can persist them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// The column names for this row (shared across all rows in a result set)
    pub columns: Arc<Vec<String>>,
    /// The values for this row
    pub values: Vec<RowValues>,
}

impl Row {
    #[must_use]
    pub fn new(columns: Arc<Vec<String>>, values: Vec<RowValues>) -> Self {
        Self { columns, values }
    }

    /// Get the index of a column by name.
    #[must_use]
    pub fn column_index(&self, column_name: &str) -> Option<usize> {
        self.columns.iter().position(|col| col == column_name)
    }

    /// Get a value from the row by column name.
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the row by column index.
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }
}

/// Where a statement's current result rows live.
///
/// Exactly one of these after any execute; every fetch operation behaves the
/// same regardless of the variant (data-source transparency).
pub enum ResultStorage {
    /// Rows come from a live backend cursor.
    Database { cursor: Box<dyn BackendCursor> },
    /// Rows were materialized through the result cache. `total` preserves
    /// the original count so `rows()` stays stable while the deque drains.
    Cache { rows: VecDeque<Row>, total: usize },
}

impl ResultStorage {
    #[must_use]
    pub fn from_cached_rows(rows: Vec<Row>) -> Self {
        let total = rows.len();
        ResultStorage::Cache {
            rows: rows.into(),
            total,
        }
    }

    #[must_use]
    pub fn origin(&self) -> StorageOrigin {
        match self {
            ResultStorage::Database { .. } => StorageOrigin::Database,
            ResultStorage::Cache { .. } => StorageOrigin::Cache,
        }
    }

    /// Original row count: cursor-reported for database results, initial
    /// collection size for cached results. Never decremented by fetching.
    #[must_use]
    pub fn row_count(&self) -> usize {
        match self {
            ResultStorage::Database { cursor } => cursor.row_count(),
            ResultStorage::Cache { total, .. } => *total,
        }
    }
}

/// Tag identifying where a statement's result rows came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOrigin {
    Database,
    Cache,
}

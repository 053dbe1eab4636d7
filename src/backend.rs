use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::SqlDbdError;
use crate::query_builder::{InsertArguments, UpdateArguments};
use crate::results::Row;
use crate::types::RowValues;

/// Transaction status as reported by the backend connection.
///
/// The backend is the authoritative source; the engine re-queries this
/// before every begin/commit/rollback decision instead of trusting a
/// locally cached flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionState {
    /// No transaction in progress.
    #[default]
    Idle,
    /// Inside a valid transaction block.
    Active,
    /// Inside a transaction block that has failed.
    Failed,
}

/// A cursor over the result of one backend call.
///
/// Backends are free to keep a live server-side cursor or to materialize
/// eagerly (libpq materializes the whole result anyway); the engine only
/// sees this interface.
pub trait BackendCursor: Send {
    /// Pull the next row as a positional value list, or `None` when the
    /// cursor is exhausted.
    ///
    /// # Errors
    /// Returns an error if the backend fails while reading the row.
    fn fetch_indexed(&mut self) -> Result<Option<Vec<RowValues>>, SqlDbdError>;

    /// Pull the next row keyed by column names, or `None` when exhausted.
    ///
    /// # Errors
    /// Returns an error if the backend fails while reading the row.
    fn fetch_assoc(&mut self) -> Result<Option<Row>, SqlDbdError>;

    /// Rows returned (SELECT) or rows affected (INSERT/UPDATE/DELETE).
    ///
    /// The count reflects the original result and is not reduced by
    /// `fetch_indexed`/`fetch_assoc` calls.
    fn row_count(&self) -> usize;

    /// Backend-reported type name of a result column, used for optional
    /// numeric/boolean coercion.
    fn column_type(&self, index: usize) -> Option<&str>;
}

/// The fixed capability set every backend must provide.
///
/// One implementation per backend; the execution engine is generic over any
/// implementer and contains no driver calls of its own. Operations that can
/// fail at the driver level return `None` and record the driver's message
/// for retrieval through [`Backend::last_error`], mirroring how C client
/// libraries report errors out-of-band.
pub trait Backend: Send {
    /// Establish the connection. Called lazily when `on_demand` is set.
    ///
    /// # Errors
    /// Returns `SqlDbdError::ConnectionError` when the backend cannot
    /// connect.
    fn connect(&mut self) -> Result<(), SqlDbdError>;

    fn is_connected(&self) -> bool;

    /// Close the connection.
    ///
    /// # Errors
    /// Returns an error if the driver-level close fails.
    fn disconnect(&mut self) -> Result<(), SqlDbdError>;

    /// Run a plain SQL string; `None` means failure (see `last_error`).
    fn raw_query(&mut self, sql: &str) -> Option<Box<dyn BackendCursor>>;

    /// Prepare `sql` under `name` server-side; `false` means failure.
    fn prepare_named(&mut self, name: &str, sql: &str) -> bool;

    /// Execute a previously prepared named statement with positional
    /// arguments; `None` means failure (see `last_error`).
    fn execute_named(&mut self, name: &str, args: &[RowValues]) -> Option<Box<dyn BackendCursor>>;

    /// Render a value as a complete SQL literal. `Null` renders as the
    /// keyword `NULL`, booleans as backend-appropriate literal keywords.
    fn escape_scalar(&self, value: &RowValues) -> String;

    /// Render binary data as a complete, quoted SQL literal.
    fn escape_binary(&self, bytes: &[u8]) -> String;

    /// Last driver error message for this connection.
    fn last_error(&self) -> String;

    /// Query the backend for its current transaction status.
    ///
    /// # Errors
    /// Returns an error when the status cannot be determined (for example
    /// on a dead connection).
    fn transaction_state(&mut self) -> Result<TransactionState, SqlDbdError>;

    /// Native positional parameter syntax, 1-based. PostgreSQL-style `$N`
    /// by default.
    fn native_placeholder(&self, position: usize) -> String {
        format!("${position}")
    }

    /// Placeholder fragment for one INSERT value, cast-aware where the
    /// backend supports it (`?::uuid` for PostgreSQL-style backends).
    fn insert_value_fragment(&self, placeholder: char, cast: Option<&str>) -> String {
        match cast {
            Some(cast) => format!("{placeholder}::{cast}"),
            None => placeholder.to_string(),
        }
    }

    /// `SET` fragment for one UPDATE column (`col = ?::uuid` where casts
    /// are supported).
    fn update_set_fragment(&self, column: &str, placeholder: char, cast: Option<&str>) -> String {
        match cast {
            Some(cast) => format!("{column} = {placeholder}::{cast}"),
            None => format!("{column} = {placeholder}"),
        }
    }

    /// Compile a full INSERT statement from pre-built argument fragments.
    fn compile_insert(
        &self,
        table: &str,
        insert: &InsertArguments,
        returning: Option<&str>,
    ) -> String {
        let mut sql = format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            insert.columns.join(", "),
            insert.values.join(", ")
        );
        if let Some(returning) = returning {
            sql.push_str(&format!(" RETURNING {returning}"));
        }
        sql
    }

    /// Compile a full UPDATE statement from pre-built argument fragments.
    fn compile_update(
        &self,
        table: &str,
        update: &UpdateArguments,
        where_clause: Option<&str>,
        returning: Option<&str>,
    ) -> String {
        let mut sql = format!("UPDATE {table} SET {}", update.columns.join(", "));
        if let Some(where_clause) = where_clause {
            sql.push_str(&format!(" WHERE {where_clause}"));
        }
        if let Some(returning) = returning {
            sql.push_str(&format!(" RETURNING {returning}"));
        }
        sql
    }
}

/// A [`BackendCursor`] over fully materialized rows.
///
/// Backends whose drivers hand back complete results (SQLite, the mock
/// backend) wrap them in this instead of re-implementing cursor mechanics.
pub struct MaterializedCursor {
    columns: Arc<Vec<String>>,
    types: Vec<String>,
    rows: VecDeque<Vec<RowValues>>,
    count: usize,
}

impl MaterializedCursor {
    /// Cursor for a row-returning statement; `row_count` reports the number
    /// of rows in the result.
    #[must_use]
    pub fn new(columns: Vec<String>, types: Vec<String>, rows: Vec<Vec<RowValues>>) -> Self {
        let count = rows.len();
        Self {
            columns: Arc::new(columns),
            types,
            rows: rows.into(),
            count,
        }
    }

    /// Cursor for a DML statement; `row_count` reports rows affected.
    #[must_use]
    pub fn for_affected(affected: usize) -> Self {
        Self {
            columns: Arc::new(Vec::new()),
            types: Vec::new(),
            rows: VecDeque::new(),
            count: affected,
        }
    }
}

impl BackendCursor for MaterializedCursor {
    fn fetch_indexed(&mut self) -> Result<Option<Vec<RowValues>>, SqlDbdError> {
        Ok(self.rows.pop_front())
    }

    fn fetch_assoc(&mut self) -> Result<Option<Row>, SqlDbdError> {
        Ok(self
            .rows
            .pop_front()
            .map(|values| Row::new(Arc::clone(&self.columns), values)))
    }

    fn row_count(&self) -> usize {
        self.count
    }

    fn column_type(&self, index: usize) -> Option<&str> {
        self.types.get(index).map(String::as_str)
    }
}

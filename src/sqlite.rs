//! SQLite backend over `rusqlite`, the bundled reference backend.
//!
//! SQLite materializes results eagerly through [`MaterializedCursor`];
//! there is no streaming cursor worth keeping open across fetch calls.
//! Named prepared statements have no server side here, so the registry's
//! names map to `rusqlite`'s statement cache instead.

use std::collections::HashMap;
use std::path::PathBuf;

use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection as SqliteConnection, params_from_iter};

use crate::backend::{Backend, BackendCursor, MaterializedCursor, TransactionState};
use crate::error::SqlDbdError;
use crate::types::RowValues;

/// Backend over a single `rusqlite` connection.
pub struct SqliteBackend {
    path: Option<PathBuf>,
    conn: Option<SqliteConnection>,
    statements: HashMap<String, String>,
    last_error: String,
}

impl SqliteBackend {
    /// Backend over a database file; the file is created on connect when
    /// missing.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            conn: None,
            statements: HashMap::new(),
            last_error: String::new(),
        }
    }

    /// Backend over a private in-memory database.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            conn: None,
            statements: HashMap::new(),
            last_error: String::new(),
        }
    }

    fn run(&mut self, sql: &str, args: &[RowValues]) -> Result<MaterializedCursor, SqlDbdError> {
        let conn = self.conn.as_ref().ok_or_else(|| {
            SqlDbdError::ConnectionError("sqlite backend is not connected".to_string())
        })?;
        let mut stmt = conn.prepare_cached(sql)?;
        let params = params_from_iter(args.iter().map(to_sqlite_value));

        if stmt.column_count() == 0 {
            let affected = stmt.execute(params)?;
            return Ok(MaterializedCursor::for_affected(affected));
        }

        let columns: Vec<String> = stmt.column_names().iter().map(ToString::to_string).collect();
        let types: Vec<String> = stmt
            .columns()
            .iter()
            .map(|c| c.decl_type().unwrap_or("").to_string())
            .collect();

        let column_count = columns.len();
        let mut rows = Vec::new();
        let mut result = stmt.query(params)?;
        while let Some(row) = result.next()? {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                values.push(from_sqlite_value(row.get_ref(i)?));
            }
            rows.push(values);
        }
        Ok(MaterializedCursor::new(columns, types, rows))
    }
}

impl Backend for SqliteBackend {
    fn connect(&mut self) -> Result<(), SqlDbdError> {
        if self.conn.is_some() {
            return Ok(());
        }
        let conn = match &self.path {
            Some(path) => SqliteConnection::open(path),
            None => SqliteConnection::open_in_memory(),
        }
        .map_err(|e| SqlDbdError::ConnectionError(format!("sqlite open: {e}")))?;
        self.conn = Some(conn);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn disconnect(&mut self) -> Result<(), SqlDbdError> {
        self.statements.clear();
        if let Some(conn) = self.conn.take() {
            conn.close()
                .map_err(|(_, e)| SqlDbdError::ConnectionError(format!("sqlite close: {e}")))?;
        }
        Ok(())
    }

    fn raw_query(&mut self, sql: &str) -> Option<Box<dyn BackendCursor>> {
        match self.run(sql, &[]) {
            Ok(cursor) => Some(Box::new(cursor)),
            Err(e) => {
                self.last_error = e.to_string();
                None
            }
        }
    }

    fn prepare_named(&mut self, name: &str, sql: &str) -> bool {
        let Some(conn) = self.conn.as_ref() else {
            self.last_error = "sqlite backend is not connected".to_string();
            return false;
        };
        // Validates the SQL now and warms the statement cache.
        if let Err(e) = conn.prepare_cached(sql) {
            self.last_error = e.to_string();
            return false;
        }
        self.statements.insert(name.to_string(), sql.to_string());
        true
    }

    fn execute_named(&mut self, name: &str, args: &[RowValues]) -> Option<Box<dyn BackendCursor>> {
        let Some(sql) = self.statements.get(name).cloned() else {
            self.last_error = format!("unknown prepared statement '{name}'");
            return None;
        };
        match self.run(&sql, args) {
            Ok(cursor) => Some(Box::new(cursor)),
            Err(e) => {
                self.last_error = e.to_string();
                None
            }
        }
    }

    fn escape_scalar(&self, value: &RowValues) -> String {
        match value {
            RowValues::Null => "NULL".to_string(),
            RowValues::Int(i) => i.to_string(),
            RowValues::Float(f) => f.to_string(),
            RowValues::Bool(true) => "1".to_string(),
            RowValues::Bool(false) => "0".to_string(),
            RowValues::Text(s) => quote(s),
            RowValues::Timestamp(ts) => quote(&ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
            RowValues::JSON(v) => quote(&v.to_string()),
            RowValues::Blob(bytes) => self.escape_binary(bytes),
        }
    }

    fn escape_binary(&self, bytes: &[u8]) -> String {
        let mut literal = String::with_capacity(bytes.len() * 2 + 3);
        literal.push_str("X'");
        for byte in bytes {
            literal.push_str(&format!("{byte:02X}"));
        }
        literal.push('\'');
        literal
    }

    fn last_error(&self) -> String {
        self.last_error.clone()
    }

    fn transaction_state(&mut self) -> Result<TransactionState, SqlDbdError> {
        let conn = self.conn.as_ref().ok_or_else(|| {
            SqlDbdError::ConnectionError("sqlite backend is not connected".to_string())
        })?;
        // SQLite aborts and auto-rolls-back a failed transaction on its
        // own, so the failed state is never observable from autocommit.
        if conn.is_autocommit() {
            Ok(TransactionState::Idle)
        } else {
            Ok(TransactionState::Active)
        }
    }

    fn native_placeholder(&self, position: usize) -> String {
        format!("?{position}")
    }

    fn insert_value_fragment(&self, placeholder: char, _cast: Option<&str>) -> String {
        // SQLite has no cast-annotated parameter syntax.
        placeholder.to_string()
    }

    fn update_set_fragment(&self, column: &str, placeholder: char, _cast: Option<&str>) -> String {
        format!("{column} = {placeholder}")
    }
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn to_sqlite_value(value: &RowValues) -> Value {
    match value {
        RowValues::Int(i) => Value::Integer(*i),
        RowValues::Float(f) => Value::Real(*f),
        RowValues::Text(s) => Value::Text(s.clone()),
        RowValues::Bool(b) => Value::Integer(i64::from(*b)),
        RowValues::Timestamp(ts) => Value::Text(ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        RowValues::Null => Value::Null,
        RowValues::JSON(v) => Value::Text(v.to_string()),
        RowValues::Blob(bytes) => Value::Blob(bytes.clone()),
    }
}

fn from_sqlite_value(value: ValueRef<'_>) -> RowValues {
    match value {
        ValueRef::Null => RowValues::Null,
        ValueRef::Integer(i) => RowValues::Int(i),
        ValueRef::Real(f) => RowValues::Float(f),
        ValueRef::Text(bytes) => RowValues::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => RowValues::Blob(bytes.to_vec()),
    }
}

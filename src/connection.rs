use std::sync::{Arc, Mutex, MutexGuard};

use crate::backend::{Backend, TransactionState};
use crate::config::{Config, Options};
use crate::error::SqlDbdError;
use crate::query_builder::{ColumnValue, compile_insert_args, compile_update_args};
use crate::registry::{ConnectionId, PreparedStatementRegistry};
use crate::statement::Statement;
use crate::types::RowValues;

/// The backend resource shared by a connection and every statement handle
/// derived from it.
///
/// The mutex guards the Rust side only; the server-side session state is
/// still a single conversation, so callers serialize full execute/fetch
/// cycles across handles sharing one connection.
pub type SharedBackend = Arc<Mutex<Box<dyn Backend>>>;

pub(crate) fn lock_backend(backend: &SharedBackend) -> MutexGuard<'_, Box<dyn Backend>> {
    match backend.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// A logical database connection: the factory for statement handles.
///
/// Handles produced by [`Connection::prepare`] share the backend resource
/// and prepared-statement registry by reference and copy the options by
/// value.
///
/// ```rust,no_run
/// use sql_dbd::prelude::*;
/// # fn backend() -> sql_dbd::sqlite::SqliteBackend { unimplemented!() }
///
/// # fn demo() -> Result<(), SqlDbdError> {
/// let conn = Connection::open(Config::new("localhost"), Options::default(), backend())?;
/// let mut sth = conn.prepare("SELECT id, name FROM banks WHERE id = ?")?;
/// sth.execute(&[RowValues::Int(1)])?;
/// while let Some(row) = sth.fetch_row()? {
///     let _ = row.get("name");
/// }
/// # Ok(())
/// # }
/// ```
pub struct Connection {
    id: ConnectionId,
    backend: SharedBackend,
    config: Arc<Config>,
    options: Options,
    registry: Arc<PreparedStatementRegistry>,
}

impl Connection {
    /// Wrap a backend into a connection. Connects immediately unless the
    /// options request on-demand connection.
    ///
    /// # Errors
    /// Returns a connection error when eager connect fails.
    pub fn open(
        config: Config,
        options: Options,
        backend: impl Backend + 'static,
    ) -> Result<Self, SqlDbdError> {
        let conn = Self {
            id: ConnectionId::next(),
            backend: Arc::new(Mutex::new(Box::new(backend))),
            config: Arc::new(config),
            options,
            registry: Arc::new(PreparedStatementRegistry::new()),
        };
        if !conn.options.on_demand() {
            lock_backend(&conn.backend).connect()?;
        }
        Ok(conn)
    }

    /// Share a prepared-statement registry with other connections (one
    /// registry per application root instead of one per connection).
    /// Prepared sets stay per connection inside it; sharing dedups the
    /// bookkeeping, not the backend-side prepares.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<PreparedStatementRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// This connection's identity inside prepared-statement registries.
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<PreparedStatementRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        lock_backend(&self.backend).is_connected()
    }

    /// Establish the backend connection now, regardless of the on-demand
    /// option.
    ///
    /// # Errors
    /// Propagates the backend's connection failure.
    pub fn connect(&self) -> Result<(), SqlDbdError> {
        let mut backend = lock_backend(&self.backend);
        if !backend.is_connected() {
            backend.connect()?;
        }
        Ok(())
    }

    /// Close the connection. Fails while a transaction is open or failed;
    /// no automatic rollback happens on close.
    ///
    /// # Errors
    /// `UncommittedTransaction` when the backend reports an open or failed
    /// transaction block.
    pub fn disconnect(&self) -> Result<(), SqlDbdError> {
        let mut backend = lock_backend(&self.backend);
        if backend.is_connected() {
            match backend.transaction_state()? {
                TransactionState::Active | TransactionState::Failed => {
                    return Err(SqlDbdError::UncommittedTransaction);
                }
                TransactionState::Idle => {}
            }
            backend.disconnect()?;
            tracing::debug!("connection closed");
        }
        Ok(())
    }

    /// Create a statement handle for later execution. The handle shares
    /// this connection's backend resource and registry.
    ///
    /// # Errors
    /// Rejects an empty statement.
    pub fn prepare(&self, statement: &str) -> Result<Statement, SqlDbdError> {
        if statement.trim().is_empty() {
            return Err(SqlDbdError::ParameterError(
                "prepare failed: statement is not set or empty".to_string(),
            ));
        }
        Ok(Statement::new(
            self.id,
            Arc::clone(&self.backend),
            Arc::clone(&self.config),
            self.options.clone(),
            Arc::clone(&self.registry),
            statement,
        ))
    }

    /// Prepare and execute in one call, returning the executed handle for
    /// fetching.
    ///
    /// # Errors
    /// Propagates compilation and execution failures.
    pub fn query(&self, statement: &str, params: &[RowValues]) -> Result<Statement, SqlDbdError> {
        let mut sth = self.prepare(statement)?;
        sth.execute(params)?;
        Ok(sth)
    }

    /// Execute a statement and return the affected/returned row count.
    ///
    /// # Errors
    /// Propagates compilation and execution failures.
    pub fn exec(&self, statement: &str, params: &[RowValues]) -> Result<usize, SqlDbdError> {
        let sth = self.query(statement, params)?;
        Ok(sth.rows())
    }

    /// Query and return the first column of the first row; handy for
    /// `count(*)`-style lookups.
    ///
    /// # Errors
    /// Propagates compilation and execution failures.
    pub fn select_value(
        &self,
        statement: &str,
        params: &[RowValues],
    ) -> Result<Option<RowValues>, SqlDbdError> {
        let mut sth = self.query(statement, params)?;
        if sth.rows() > 0 {
            return sth.fetch();
        }
        Ok(None)
    }

    /// Compile and execute an INSERT from a `(column, value)` record.
    ///
    /// # Errors
    /// Propagates compilation and execution failures.
    pub fn insert(
        &self,
        table: &str,
        record: &[(&str, ColumnValue)],
        returning: Option<&str>,
    ) -> Result<Statement, SqlDbdError> {
        let (sql, args) = {
            let backend = lock_backend(&self.backend);
            let insert = compile_insert_args(record, self.options.placeholder(), &**backend);
            let sql = backend.compile_insert(table, &insert, returning);
            (sql, insert.arguments)
        };
        self.query(&sql, &args)
    }

    /// Compile and execute an UPDATE from a `(column, value)` record plus
    /// an optional WHERE clause with its own positional arguments.
    ///
    /// # Errors
    /// Propagates compilation and execution failures.
    pub fn update(
        &self,
        table: &str,
        record: &[(&str, ColumnValue)],
        where_clause: Option<&str>,
        where_args: &[RowValues],
        returning: Option<&str>,
    ) -> Result<Statement, SqlDbdError> {
        let (sql, mut args) = {
            let backend = lock_backend(&self.backend);
            let update = compile_update_args(record, self.options.placeholder(), &**backend);
            let sql = backend.compile_update(table, &update, where_clause, returning);
            (sql, update.arguments)
        };
        args.extend_from_slice(where_args);
        self.query(&sql, &args)
    }

    pub(crate) fn backend(&self) -> &SharedBackend {
        &self.backend
    }
}

//! The statement handle: compile, execute, fetch.
//!
//! A handle is created unexecuted by [`Connection::prepare`] and keeps its
//! query template across executions, so one handle can be executed many
//! times with different positional arguments. Each execution replaces the
//! previous result storage.

use std::collections::VecDeque;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use regex::Regex;

use crate::backend::BackendCursor;
use crate::bind::{Bind, BindType, BindValue, apply_binds};
use crate::cache::CacheHolder;
use crate::config::{Config, Options};
use crate::connection::{SharedBackend, lock_backend};
use crate::conversion::ConversionMap;
use crate::error::SqlDbdError;
use crate::placeholder::{self, CompiledQuery};
use crate::registry::{ConnectionId, PreparedStatementRegistry};
use crate::results::{ResultStorage, Row, StorageOrigin};
use crate::types::{ExecMode, RowValues};

static SELECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*select").unwrap_or_else(|e| panic!("select regex: {e}")));

enum FetchMemo {
    Unfetched,
    Row(VecDeque<RowValues>),
}

/// A statement handle bound to one connection's backend resource.
pub struct Statement {
    connection: ConnectionId,
    backend: SharedBackend,
    config: Arc<Config>,
    options: Options,
    registry: Arc<PreparedStatementRegistry>,
    query: String,
    binds: Vec<Bind>,
    cache: Option<CacheHolder>,
    storage: Option<ResultStorage>,
    conversion: Option<ConversionMap>,
    fetch_memo: FetchMemo,
}

impl std::fmt::Debug for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("connection", &self.connection)
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

impl Statement {
    pub(crate) fn new(
        connection: ConnectionId,
        backend: SharedBackend,
        config: Arc<Config>,
        options: Options,
        registry: Arc<PreparedStatementRegistry>,
        query: &str,
    ) -> Self {
        Self {
            connection,
            backend,
            config,
            options,
            registry,
            query: query.to_string(),
            binds: Vec::new(),
            cache: None,
            storage: None,
            conversion: None,
            fetch_memo: FetchMemo::Unfetched,
        }
    }

    /// The query template as given to `prepare`, before placeholder
    /// compilation and bind substitution.
    #[must_use]
    pub fn query_text(&self) -> &str {
        &self.query
    }

    /// Attach a named bind. Names are literal tokens in the query text,
    /// conventionally `:name`; substitution happens at execute time.
    pub fn bind(&mut self, name: &str, value: impl Into<BindValue>) -> &mut Self {
        self.binds.push(Bind::new(name, value, BindType::Scalar, None));
        self
    }

    /// Attach a named bind with an explicit render type, e.g.
    /// [`BindType::Binary`] for blob literals or [`BindType::Numeric`] for
    /// unquoted id lists.
    pub fn bind_typed(
        &mut self,
        name: &str,
        value: impl Into<BindValue>,
        data_type: BindType,
    ) -> &mut Self {
        self.binds.push(Bind::new(name, value, data_type, None));
        self
    }

    /// Attach a fully specified [`Bind`], including its optional target
    /// column.
    pub fn add_bind(&mut self, bind: Bind) -> &mut Self {
        self.binds.push(bind);
        self
    }

    /// Route this statement's result set through the configured cache
    /// store under `key`.
    ///
    /// When the connection config carries no store this is a silent no-op,
    /// including for non-SELECT statements; the statement-type check only
    /// runs once a cache layer actually exists.
    ///
    /// # Errors
    /// `NotCacheable` for anything but a SELECT, on connections with a
    /// store.
    pub fn cache(&mut self, key: &str, ttl: Option<Duration>) -> Result<&mut Self, SqlDbdError> {
        if self.config.cache_store().is_some() {
            if !SELECT_RE.is_match(&self.query) {
                return Err(SqlDbdError::NotCacheable(self.query.clone()));
            }
            self.cache = Some(CacheHolder::new(key, ttl));
        }
        Ok(self)
    }

    /// Execute the statement with positional arguments for its
    /// placeholders. Replaces any result storage left from a previous
    /// execution.
    ///
    /// Order of work: placeholder compilation and bind substitution, then
    /// the cache store (on a hit the backend is never touched), then the
    /// backend, then write-back of a missed cacheable result.
    ///
    /// # Errors
    /// `ArgumentCountMismatch` when `params` does not match the
    /// placeholder count, `BackendExecutionFailed` when the backend
    /// rejects the statement, `CacheBackend` when the store itself fails.
    /// Cache failures are never downgraded to a miss.
    pub fn execute(&mut self, params: &[RowValues]) -> Result<&mut Self, SqlDbdError> {
        self.storage = None;
        self.conversion = None;
        self.fetch_memo = FetchMemo::Unfetched;
        let started = Instant::now();

        let mode = if self.options.prepare_execute() {
            ExecMode::Prepared
        } else {
            ExecMode::Inline
        };

        let compiled = {
            let backend = lock_backend(&self.backend);
            let compiled =
                placeholder::compile(&self.query, self.options.placeholder(), params, mode, &**backend)?;
            let text = apply_binds(compiled.text, &self.binds, &**backend)?;
            CompiledQuery { text, args: compiled.args }
        };

        if let Some(holder) = &self.cache {
            if let Some(store) = self.config.cache_store() {
                let cached = store.get(&holder.key).map_err(|e| {
                    SqlDbdError::CacheBackend(format!("cache get for key '{}': {e}", holder.key))
                })?;
                if let Some(rows) = cached {
                    self.storage = Some(ResultStorage::from_cached_rows(rows));
                }
            }
        }

        if self.storage.is_none() {
            let cursor = {
                let mut backend = lock_backend(&self.backend);
                if !backend.is_connected() {
                    backend.connect()?;
                }
                let result = if mode == ExecMode::Prepared {
                    let name =
                        self.registry
                            .ensure_prepared(&mut **backend, self.connection, &compiled.text)?;
                    backend.execute_named(&name, &compiled.args)
                } else {
                    backend.raw_query(&compiled.text)
                };
                result.ok_or_else(|| SqlDbdError::BackendExecutionFailed {
                    message: backend.last_error(),
                    query: compiled.text.clone(),
                })?
            };
            self.storage = Some(ResultStorage::Database { cursor });

            if let Some(holder) = self.cache.clone() {
                let store = self.config.cache_store().cloned();
                if let Some(store) = store {
                    let rows = self.fetch_row_set()?;
                    store.set(&holder.key, &rows, holder.ttl).map_err(|e| {
                        SqlDbdError::CacheBackend(format!("cache set for key '{}': {e}", holder.key))
                    })?;
                    self.storage = Some(ResultStorage::from_cached_rows(rows));
                }
            }
        }

        let origin = self.storage_origin();
        tracing::debug!(
            query = %compiled.text,
            origin = ?origin,
            rows = self.rows(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "statement executed"
        );
        Ok(self)
    }

    /// Fetch the next row as a named-column row, or `None` past the end.
    ///
    /// # Errors
    /// `StatementNotExecuted` before the first `execute`.
    pub fn fetch_row(&mut self) -> Result<Option<Row>, SqlDbdError> {
        let options = self.options.clone();
        match self.storage.as_mut() {
            None => Err(SqlDbdError::StatementNotExecuted),
            Some(ResultStorage::Cache { rows, .. }) => Ok(rows.pop_front()),
            Some(ResultStorage::Database { cursor }) => {
                let Some(mut row) = cursor.fetch_assoc()? else {
                    return Ok(None);
                };
                if options.convert_numeric() || options.convert_boolean() {
                    let map = self
                        .conversion
                        .get_or_insert_with(|| conversion_for(cursor.as_ref(), row.columns.len()));
                    map.convert(&mut row.values, &options);
                }
                Ok(Some(row))
            }
        }
    }

    /// Drain the remaining rows into a vector.
    ///
    /// # Errors
    /// `StatementNotExecuted` before the first `execute`.
    pub fn fetch_row_set(&mut self) -> Result<Vec<Row>, SqlDbdError> {
        let mut rows = Vec::new();
        while let Some(row) = self.fetch_row()? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Drain the remaining rows into a map keyed by the value of
    /// `unique_key` in each row. The map preserves result-set order.
    ///
    /// # Errors
    /// `ColumnNotFound` when a row lacks the key column, `DuplicateKey`
    /// when two rows carry the same key value.
    pub fn fetch_row_set_indexed(
        &mut self,
        unique_key: &str,
    ) -> Result<IndexMap<String, Row>, SqlDbdError> {
        let mut indexed = IndexMap::new();
        while let Some(row) = self.fetch_row()? {
            let key = row
                .get(unique_key)
                .ok_or_else(|| SqlDbdError::ColumnNotFound(unique_key.to_string()))?
                .to_string();
            if indexed.contains_key(&key) {
                return Err(SqlDbdError::DuplicateKey(key));
            }
            indexed.insert(key, row);
        }
        Ok(indexed)
    }

    /// Return the leading row's values one scalar per call, left to
    /// right, then `None`. The row is pulled from storage once and
    /// memoized, so interleaved `fetch_row` calls do not disturb it.
    ///
    /// # Errors
    /// `StatementNotExecuted` before the first `execute`.
    pub fn fetch(&mut self) -> Result<Option<RowValues>, SqlDbdError> {
        if matches!(self.fetch_memo, FetchMemo::Unfetched) {
            let options = self.options.clone();
            let values: VecDeque<RowValues> = match self.storage.as_mut() {
                None => return Err(SqlDbdError::StatementNotExecuted),
                Some(ResultStorage::Cache { rows, .. }) => rows
                    .pop_front()
                    .map(|row| row.values.into())
                    .unwrap_or_default(),
                Some(ResultStorage::Database { cursor }) => match cursor.fetch_indexed()? {
                    None => VecDeque::new(),
                    Some(mut values) => {
                        if options.convert_numeric() || options.convert_boolean() {
                            let map = self
                                .conversion
                                .get_or_insert_with(|| conversion_for(cursor.as_ref(), values.len()));
                            map.convert(&mut values, &options);
                        }
                        values.into()
                    }
                },
            };
            self.fetch_memo = FetchMemo::Row(values);
        }
        match &mut self.fetch_memo {
            FetchMemo::Row(values) => Ok(values.pop_front()),
            FetchMemo::Unfetched => Ok(None),
        }
    }

    /// Row count of the current result: the returned-row total for
    /// SELECTs (never decremented by fetching), the affected count for
    /// writes, zero before execution.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.storage.as_ref().map_or(0, ResultStorage::row_count)
    }

    /// Where the current result came from, or `None` before execution.
    #[must_use]
    pub fn storage_origin(&self) -> Option<StorageOrigin> {
        self.storage.as_ref().map(ResultStorage::origin)
    }
}

fn conversion_for(cursor: &dyn BackendCursor, column_count: usize) -> ConversionMap {
    ConversionMap::from_cursor(cursor, column_count)
}

use thiserror::Error;

/// Crate-wide error taxonomy.
///
/// Nothing in this layer retries automatically; every failure surfaces
/// immediately with enough context (query text, argument counts, backend
/// error text) to diagnose without re-running.
#[derive(Debug, Error)]
pub enum SqlDbdError {
    /// Placeholder count and supplied argument count must match exactly.
    #[error("execute failed, called with {supplied} bind variables when {expected} are needed; query: {query}")]
    ArgumentCountMismatch {
        expected: usize,
        supplied: usize,
        query: String,
    },

    /// A backend-side named prepare was rejected.
    #[error("statement prepare failed: {message}; query: {query}")]
    StatementPrepareFailed { message: String, query: String },

    /// `cache()` was requested on a non-SELECT statement.
    #[error("caching setup failed, current query is not of SELECT type: {0}")]
    NotCacheable(String),

    /// The external cache store failed on get or set. A broken cache is
    /// never downgraded to a miss.
    #[error("cache backend error: {0}")]
    CacheBackend(String),

    /// `fetch_row_set_indexed` met the same key value twice.
    #[error("key '{0}' not unique")]
    DuplicateKey(String),

    /// A unique-key column was absent from a fetched row.
    #[error("column '{0}' not found in result row")]
    ColumnNotFound(String),

    #[error("connection is already in a transaction block")]
    AlreadyInTransaction,

    #[error("connection is in a failed transaction block")]
    TransactionInErrorState,

    #[error("commit not possible, in a failed transaction block")]
    CommitInFailedTransaction,

    #[error("no transaction to commit")]
    NoTransactionToCommit,

    #[error("no transaction to rollback")]
    NoTransactionToRollback,

    /// Disconnect was attempted while a transaction is open or failed.
    #[error("uncommitted transaction state")]
    UncommittedTransaction,

    /// The backend reported a failure for an executed statement.
    #[error("query execution failed: {message}; query: {query}")]
    BackendExecutionFailed { message: String, query: String },

    /// A fetch operation was called before `execute`.
    #[error("statement has not been executed")]
    StatementNotExecuted,

    #[error("parameter conversion error: {0}")]
    ParameterError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("connection error: {0}")]
    ConnectionError(String),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),
}

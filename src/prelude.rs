//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::backend::{Backend, BackendCursor, TransactionState};
pub use crate::bind::{Bind, BindType, BindValue};
pub use crate::cache::{CacheHolder, CacheStore, InMemoryCacheStore};
pub use crate::config::{Config, Options};
pub use crate::connection::Connection;
pub use crate::error::SqlDbdError;
pub use crate::query_builder::ColumnValue;
pub use crate::registry::PreparedStatementRegistry;
pub use crate::results::{Row, StorageOrigin};
pub use crate::statement::Statement;
pub use crate::types::{ExecMode, RowValues};

#[cfg(feature = "sqlite")]
pub use crate::sqlite::SqliteBackend;

#[cfg(feature = "test-utils")]
pub use crate::test_utils::{MockBackend, MockHandle, ScriptedResult};

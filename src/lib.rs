//! Backend-agnostic SQL statement execution.
//!
//! The crate separates what an application says ("run this query with
//! these arguments, maybe through the result cache") from how a backend
//! says it (parameter syntax, literal escaping, transaction status). A
//! [`Connection`](connection::Connection) wraps one [`Backend`](backend::Backend)
//! implementation and hands out [`Statement`](statement::Statement) handles;
//! everything above the `Backend` trait is driver-free.
//!
//! ```rust,no_run
//! use sql_dbd::prelude::*;
//!
//! # fn main() -> Result<(), SqlDbdError> {
//! let conn = Connection::open(
//!     Config::new("localhost").with_database("app"),
//!     Options::default().with_convert_numeric(true),
//!     SqliteBackend::in_memory(),
//! )?;
//!
//! conn.exec("CREATE TABLE banks (id INTEGER PRIMARY KEY, name TEXT)", &[])?;
//! conn.exec("INSERT INTO banks (name) VALUES (?)", &[RowValues::Text("acme".into())])?;
//!
//! let mut sth = conn.prepare("SELECT id, name FROM banks WHERE id = ?")?;
//! sth.execute(&[RowValues::Int(1)])?;
//! while let Some(row) = sth.fetch_row()? {
//!     println!("{:?}", row.get("name"));
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod bind;
pub mod cache;
pub mod config;
pub mod connection;
pub mod conversion;
pub mod error;
pub mod placeholder;
pub mod prelude;
pub mod query_builder;
pub mod registry;
pub mod results;
pub mod statement;
mod transaction;
pub mod types;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use backend::{Backend, BackendCursor, MaterializedCursor, TransactionState};
pub use bind::{Bind, BindType, BindValue};
pub use cache::{CacheHolder, CacheStore, CacheStoreError, InMemoryCacheStore};
pub use config::{Config, Options};
pub use connection::Connection;
pub use error::SqlDbdError;
pub use query_builder::{ColumnValue, InsertArguments, UpdateArguments};
pub use registry::{ConnectionId, PreparedStatementRegistry};
pub use results::{ResultStorage, Row, StorageOrigin};
pub use statement::Statement;
pub use types::{ExecMode, RowValues};

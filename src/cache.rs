use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::results::Row;

/// Error type for external cache stores. The engine wraps these into
/// `SqlDbdError::CacheBackend` and re-raises; it never treats a store
/// failure as a miss.
pub type CacheStoreError = Box<dyn std::error::Error + Send + Sync>;

/// External collaborator: a key/value store holding materialized result
/// rows.
///
/// Implementations persist `Row` collections however they like (the rows
/// are `Serialize`/`Deserialize`); `get` must return `None` for both absent
/// and expired entries.
pub trait CacheStore: Send + Sync {
    /// Read the rows stored under `key`.
    ///
    /// # Errors
    /// Returns a store-specific error; the engine surfaces it as
    /// `CacheBackend` rather than falling back to the database.
    fn get(&self, key: &str) -> Result<Option<Vec<Row>>, CacheStoreError>;

    /// Store `rows` under `key` with an optional time-to-live.
    ///
    /// # Errors
    /// Returns a store-specific error; surfaced as `CacheBackend`.
    fn set(&self, key: &str, rows: &[Row], ttl: Option<Duration>) -> Result<(), CacheStoreError>;
}

/// Per-statement cache request, created by `Statement::cache`.
///
/// Only exists for SELECT statements on connections configured with a cache
/// store.
#[derive(Debug, Clone)]
pub struct CacheHolder {
    pub key: String,
    pub ttl: Option<Duration>,
}

impl CacheHolder {
    #[must_use]
    pub fn new(key: impl Into<String>, ttl: Option<Duration>) -> Self {
        Self {
            key: key.into(),
            ttl,
        }
    }
}

/// Reference in-process cache store: a mutex-guarded map with TTL
/// deadlines. Suitable for single-process deployments and tests.
#[derive(Default)]
pub struct InMemoryCacheStore {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

struct CacheEntry {
    rows: Vec<Row>,
    deadline: Option<Instant>,
}

impl InMemoryCacheStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl CacheStore for InMemoryCacheStore {
    fn get(&self, key: &str) -> Result<Option<Vec<Row>>, CacheStoreError> {
        let mut entries = self.lock();
        let expired = match entries.get(key) {
            Some(entry) => entry
                .deadline
                .is_some_and(|deadline| Instant::now() >= deadline),
            None => return Ok(None),
        };
        if expired {
            entries.remove(key);
            return Ok(None);
        }
        Ok(entries.get(key).map(|entry| entry.rows.clone()))
    }

    fn set(&self, key: &str, rows: &[Row], ttl: Option<Duration>) -> Result<(), CacheStoreError> {
        let deadline = ttl.map(|ttl| Instant::now() + ttl);
        self.lock().insert(
            key.to_string(),
            CacheEntry {
                rows: rows.to_vec(),
                deadline,
            },
        );
        Ok(())
    }
}

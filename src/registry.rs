use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::backend::Backend;
use crate::error::SqlDbdError;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of one connection's backend resource, allocated at
/// `Connection::open`. Prepared statements live on a backend session, so
/// the registry tracks them per connection even when the registry itself
/// is shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub(crate) fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Deduplicates backend-side statement preparation.
///
/// Backends that support named prepared statements error if the same name
/// is prepared twice on one connection; this registry trades a small amount
/// of memory for preparing each distinct query text exactly once per
/// connection. Entries are write-once and never evicted for the registry's
/// lifetime.
///
/// Owned explicitly (usually one per `Connection`, optionally shared across
/// an application via `Arc`) rather than hidden behind process-global
/// state. Statement names derive from the fingerprint alone, so identical
/// text gets the same name everywhere; the prepared set is keyed by
/// connection as well, so each backend session prepares its own copy.
#[derive(Debug, Default)]
pub struct PreparedStatementRegistry {
    entries: Mutex<HashMap<(ConnectionId, u64), String>>,
}

impl PreparedStatementRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fast non-cryptographic fingerprint of a final (post-bind) query
    /// text.
    #[must_use]
    pub fn fingerprint(sql: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        sql.hash(&mut hasher);
        hasher.finish()
    }

    /// Statement name used for a fingerprint on the backend side.
    #[must_use]
    pub fn statement_name(fingerprint: u64) -> String {
        format!("dbd_{fingerprint:x}")
    }

    /// Ensure `sql` is prepared on `connection`'s backend, preparing it on
    /// first sight there. A statement already prepared through one
    /// connection is still prepared again on another; server-side prepared
    /// statements do not cross sessions.
    ///
    /// The internal lock is held across the backend call so that concurrent
    /// preparation of one fingerprint issues exactly one backend-side
    /// prepare per connection.
    ///
    /// # Errors
    /// Returns `StatementPrepareFailed` (carrying the backend's last error
    /// and the attempted query text) when the backend rejects the prepare;
    /// execution must not proceed in that case.
    pub fn ensure_prepared(
        &self,
        backend: &mut dyn Backend,
        connection: ConnectionId,
        sql: &str,
    ) -> Result<String, SqlDbdError> {
        let fingerprint = Self::fingerprint(sql);
        let name = Self::statement_name(fingerprint);

        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !entries.contains_key(&(connection, fingerprint)) {
            if !backend.prepare_named(&name, sql) {
                return Err(SqlDbdError::StatementPrepareFailed {
                    message: backend.last_error(),
                    query: sql.to_string(),
                });
            }
            entries.insert((connection, fingerprint), sql.to_string());
        }
        Ok(name)
    }

    /// Number of backend-side prepares issued so far (distinct statements,
    /// summed over connections).
    #[must_use]
    pub fn len(&self) -> usize {
        match self.entries.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprints_are_deterministic_and_distinct() {
        let a = PreparedStatementRegistry::fingerprint("SELECT 1");
        let b = PreparedStatementRegistry::fingerprint("SELECT 1");
        let c = PreparedStatementRegistry::fingerprint("SELECT 2");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(PreparedStatementRegistry::statement_name(a).starts_with("dbd_"));
    }

    #[test]
    fn connection_ids_are_unique() {
        let a = ConnectionId::next();
        let b = ConnectionId::next();
        assert_ne!(a, b);
    }
}

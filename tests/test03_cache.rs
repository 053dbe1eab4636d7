use std::sync::Arc;
use std::time::Duration;

use sql_dbd::cache::CacheStoreError;
use sql_dbd::prelude::*;

fn open_with_store(store: Arc<dyn CacheStore>) -> (Connection, MockHandle) {
    let (backend, handle) = MockBackend::new();
    let conn = Connection::open(
        Config::new("localhost").with_cache_store(store),
        Options::default(),
        backend,
    )
    .expect("open connection");
    (conn, handle)
}

fn one_row_result() -> ScriptedResult {
    ScriptedResult::new(
        &["id", "name"],
        &["int4", "text"],
        vec![vec![RowValues::Int(1), RowValues::Text("acme".into())]],
    )
}

#[test]
fn miss_hits_the_backend_once_then_serves_from_cache() {
    let store = Arc::new(InMemoryCacheStore::new());
    let (conn, handle) = open_with_store(store);
    handle.push_result(one_row_result());

    let mut sth = conn.prepare("SELECT id, name FROM banks").unwrap();
    sth.cache("banks:all", None).unwrap();

    sth.execute(&[]).unwrap();
    assert_eq!(sth.storage_origin(), Some(StorageOrigin::Cache));
    assert_eq!(handle.executed().len(), 1);

    // Second execution never reaches the backend.
    sth.execute(&[]).unwrap();
    assert_eq!(sth.storage_origin(), Some(StorageOrigin::Cache));
    assert_eq!(handle.executed().len(), 1);

    let row = sth.fetch_row().unwrap().unwrap();
    assert_eq!(row.get("name"), Some(&RowValues::Text("acme".into())));
}

#[test]
fn cached_rows_fetch_like_database_rows() {
    let store = Arc::new(InMemoryCacheStore::new());
    let (conn, handle) = open_with_store(store);
    handle.push_result(ScriptedResult::new(
        &["id"],
        &["int4"],
        vec![vec![RowValues::Int(1)], vec![RowValues::Int(2)]],
    ));

    let mut sth = conn.prepare("SELECT id FROM t").unwrap();
    sth.cache("t:ids", None).unwrap();
    sth.execute(&[]).unwrap();
    assert_eq!(sth.rows(), 2);
    assert_eq!(sth.fetch_row_set().unwrap().len(), 2);
    // rows() reports the original total after draining.
    assert_eq!(sth.rows(), 2);
}

#[test]
fn non_select_statements_are_not_cacheable() {
    let store = Arc::new(InMemoryCacheStore::new());
    let (conn, _handle) = open_with_store(store);
    let mut sth = conn.prepare("INSERT INTO t (v) VALUES (?)").unwrap();
    assert!(matches!(
        sth.cache("k", None),
        Err(SqlDbdError::NotCacheable(_))
    ));
}

#[test]
fn leading_whitespace_select_is_cacheable() {
    let store = Arc::new(InMemoryCacheStore::new());
    let (conn, _handle) = open_with_store(store);
    let mut sth = conn.prepare("\n\t  select 1 ").unwrap();
    assert!(sth.cache("k", None).is_ok());
}

#[test]
fn cache_request_is_a_no_op_without_a_store() {
    let (backend, handle) = MockBackend::new();
    let conn = Connection::open(Config::new("localhost"), Options::default(), backend).unwrap();
    handle.push_result(one_row_result());
    handle.push_result(one_row_result());

    let mut sth = conn.prepare("SELECT id, name FROM banks").unwrap();
    // No store configured: accepted silently, even for non-SELECTs.
    sth.cache("banks:all", None).unwrap();
    sth.execute(&[]).unwrap();
    assert_eq!(sth.storage_origin(), Some(StorageOrigin::Database));
    sth.execute(&[]).unwrap();
    assert_eq!(handle.executed().len(), 2);
}

#[test]
fn expired_entries_go_back_to_the_backend() {
    let store = Arc::new(InMemoryCacheStore::new());
    let (conn, handle) = open_with_store(store);
    handle.push_result(one_row_result());
    handle.push_result(one_row_result());

    let mut sth = conn.prepare("SELECT id, name FROM banks").unwrap();
    sth.cache("banks:all", Some(Duration::from_millis(1))).unwrap();
    sth.execute(&[]).unwrap();
    std::thread::sleep(Duration::from_millis(5));
    sth.execute(&[]).unwrap();
    assert_eq!(handle.executed().len(), 2);
}

struct FailingStore;

impl CacheStore for FailingStore {
    fn get(&self, _key: &str) -> Result<Option<Vec<Row>>, CacheStoreError> {
        Err("store offline".into())
    }

    fn set(&self, _key: &str, _rows: &[Row], _ttl: Option<Duration>) -> Result<(), CacheStoreError> {
        Err("store offline".into())
    }
}

struct WriteFailingStore;

impl CacheStore for WriteFailingStore {
    fn get(&self, _key: &str) -> Result<Option<Vec<Row>>, CacheStoreError> {
        Ok(None)
    }

    fn set(&self, _key: &str, _rows: &[Row], _ttl: Option<Duration>) -> Result<(), CacheStoreError> {
        Err("store is read-only".into())
    }
}

#[test]
fn write_back_failure_is_an_error_not_best_effort() {
    let (conn, handle) = open_with_store(Arc::new(WriteFailingStore));
    handle.push_result(one_row_result());

    let mut sth = conn.prepare("SELECT id, name FROM banks").unwrap();
    sth.cache("banks:all", None).unwrap();
    let err = sth.execute(&[]).unwrap_err();
    assert!(matches!(err, SqlDbdError::CacheBackend(_)));
    // The miss did reach the backend before the failing write-back.
    assert_eq!(handle.executed().len(), 1);
}

#[test]
fn store_failure_is_an_error_not_a_miss() {
    let (conn, handle) = open_with_store(Arc::new(FailingStore));
    handle.push_result(one_row_result());

    let mut sth = conn.prepare("SELECT id, name FROM banks").unwrap();
    sth.cache("banks:all", None).unwrap();
    let err = sth.execute(&[]).unwrap_err();
    assert!(matches!(err, SqlDbdError::CacheBackend(_)));
    // The failing read means the backend was never consulted.
    assert!(handle.executed().is_empty());
}

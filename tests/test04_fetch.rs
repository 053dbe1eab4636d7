use sql_dbd::prelude::*;

fn open(options: Options) -> (Connection, MockHandle) {
    let (backend, handle) = MockBackend::new();
    let conn = Connection::open(Config::new("localhost"), options, backend)
        .expect("open connection");
    (conn, handle)
}

fn people() -> ScriptedResult {
    ScriptedResult::new(
        &["id", "name"],
        &["int4", "text"],
        vec![
            vec![RowValues::Int(1), RowValues::Text("ann".into())],
            vec![RowValues::Int(2), RowValues::Text("bob".into())],
            vec![RowValues::Int(3), RowValues::Text("cat".into())],
        ],
    )
}

#[test]
fn fetch_row_walks_rows_then_returns_none() {
    let (conn, handle) = open(Options::default());
    handle.push_result(people());
    let mut sth = conn.query("SELECT id, name FROM people", &[]).unwrap();

    let first = sth.fetch_row().unwrap().unwrap();
    assert_eq!(first.get("id"), Some(&RowValues::Int(1)));
    let second = sth.fetch_row().unwrap().unwrap();
    assert_eq!(second.get("name"), Some(&RowValues::Text("bob".into())));
    sth.fetch_row().unwrap().unwrap();
    assert!(sth.fetch_row().unwrap().is_none());
}

#[test]
fn rows_reports_the_original_total_throughout() {
    let (conn, handle) = open(Options::default());
    handle.push_result(people());
    let mut sth = conn.query("SELECT id, name FROM people", &[]).unwrap();
    assert_eq!(sth.rows(), 3);
    sth.fetch_row().unwrap();
    sth.fetch_row().unwrap();
    assert_eq!(sth.rows(), 3);
}

#[test]
fn fetch_row_set_drains_remaining_rows() {
    let (conn, handle) = open(Options::default());
    handle.push_result(people());
    let mut sth = conn.query("SELECT id, name FROM people", &[]).unwrap();
    sth.fetch_row().unwrap();
    let rest = sth.fetch_row_set().unwrap();
    assert_eq!(rest.len(), 2);
    assert_eq!(rest[0].get("id"), Some(&RowValues::Int(2)));
}

#[test]
fn indexed_fetch_keys_rows_by_column_value() {
    let (conn, handle) = open(Options::default());
    handle.push_result(people());
    let mut sth = conn.query("SELECT id, name FROM people", &[]).unwrap();
    let by_id = sth.fetch_row_set_indexed("id").unwrap();
    assert_eq!(by_id.len(), 3);
    assert_eq!(
        by_id["2"].get("name"),
        Some(&RowValues::Text("bob".into()))
    );
    // Keys come back in result-set order.
    assert_eq!(by_id.keys().collect::<Vec<_>>(), vec!["1", "2", "3"]);
}

#[test]
fn duplicate_index_values_are_an_error() {
    let (conn, handle) = open(Options::default());
    handle.push_result(ScriptedResult::new(
        &["id"],
        &["int4"],
        vec![vec![RowValues::Int(1)], vec![RowValues::Int(1)]],
    ));
    let mut sth = conn.query("SELECT id FROM t", &[]).unwrap();
    assert!(matches!(
        sth.fetch_row_set_indexed("id"),
        Err(SqlDbdError::DuplicateKey(_))
    ));
}

#[test]
fn missing_index_column_is_an_error() {
    let (conn, handle) = open(Options::default());
    handle.push_result(people());
    let mut sth = conn.query("SELECT id, name FROM people", &[]).unwrap();
    assert!(matches!(
        sth.fetch_row_set_indexed("nope"),
        Err(SqlDbdError::ColumnNotFound(_))
    ));
}

#[test]
fn fetch_walks_one_row_scalar_by_scalar() {
    let (conn, handle) = open(Options::default());
    handle.push_result(people());
    let mut sth = conn.query("SELECT id, name FROM people", &[]).unwrap();
    assert_eq!(sth.fetch().unwrap(), Some(RowValues::Int(1)));
    assert_eq!(sth.fetch().unwrap(), Some(RowValues::Text("ann".into())));
    assert_eq!(sth.fetch().unwrap(), None);
}

#[test]
fn fetch_on_empty_result_returns_none() {
    let (conn, handle) = open(Options::default());
    handle.push_result(ScriptedResult::new(&["id"], &["int4"], vec![]));
    let mut sth = conn.query("SELECT id FROM t WHERE 1 = 0", &[]).unwrap();
    assert_eq!(sth.fetch().unwrap(), None);
}

#[test]
fn fetching_before_execute_is_an_error() {
    let (conn, _handle) = open(Options::default());
    let mut sth = conn.prepare("SELECT 1").unwrap();
    assert!(matches!(
        sth.fetch_row(),
        Err(SqlDbdError::StatementNotExecuted)
    ));
    assert!(matches!(sth.fetch(), Err(SqlDbdError::StatementNotExecuted)));
}

#[test]
fn numeric_conversion_follows_column_types() {
    let (conn, handle) = open(Options::default().with_convert_numeric(true));
    handle.push_result(ScriptedResult::new(
        &["id", "price", "label"],
        &["int4", "numeric", "text"],
        vec![vec![
            RowValues::Text("42".into()),
            RowValues::Text("9.5".into()),
            RowValues::Text("42".into()),
        ]],
    ));
    let mut sth = conn.query("SELECT id, price, label FROM t", &[]).unwrap();
    let row = sth.fetch_row().unwrap().unwrap();
    assert_eq!(row.get("id"), Some(&RowValues::Int(42)));
    assert_eq!(row.get("price"), Some(&RowValues::Float(9.5)));
    // Text columns stay text even when the payload looks numeric.
    assert_eq!(row.get("label"), Some(&RowValues::Text("42".into())));
}

#[test]
fn boolean_conversion_reads_postgres_style_flags() {
    let (conn, handle) = open(Options::default().with_convert_boolean(true));
    handle.push_result(ScriptedResult::new(
        &["active", "hidden"],
        &["bool", "bool"],
        vec![vec![RowValues::Text("t".into()), RowValues::Text("f".into())]],
    ));
    let mut sth = conn.query("SELECT active, hidden FROM t", &[]).unwrap();
    let row = sth.fetch_row().unwrap().unwrap();
    assert_eq!(row.get("active"), Some(&RowValues::Bool(true)));
    assert_eq!(row.get("hidden"), Some(&RowValues::Bool(false)));
}

#[test]
fn conversion_stays_off_by_default() {
    let (conn, handle) = open(Options::default());
    handle.push_result(ScriptedResult::new(
        &["id"],
        &["int4"],
        vec![vec![RowValues::Text("42".into())]],
    ));
    let mut sth = conn.query("SELECT id FROM t", &[]).unwrap();
    let row = sth.fetch_row().unwrap().unwrap();
    assert_eq!(row.get("id"), Some(&RowValues::Text("42".into())));
}

#[test]
fn select_value_returns_the_leading_scalar() {
    let (conn, handle) = open(Options::default());
    handle.push_result(ScriptedResult::new(
        &["count"],
        &["int8"],
        vec![vec![RowValues::Int(12)]],
    ));
    let value = conn.select_value("SELECT count(*) FROM t", &[]).unwrap();
    assert_eq!(value, Some(RowValues::Int(12)));
}

#[test]
fn select_value_on_empty_result_is_none() {
    let (conn, handle) = open(Options::default());
    handle.push_result(ScriptedResult::new(&["count"], &["int8"], vec![]));
    let value = conn.select_value("SELECT id FROM t WHERE 1 = 0", &[]).unwrap();
    assert_eq!(value, None);
}

#[test]
fn exec_reports_affected_rows() {
    let (conn, handle) = open(Options::default());
    handle.push_result(ScriptedResult::affected(4));
    let affected = conn.exec("DELETE FROM t WHERE old", &[]).unwrap();
    assert_eq!(affected, 4);
}

#[test]
fn re_execution_replaces_the_previous_result() {
    let (conn, handle) = open(Options::default());
    handle.push_result(people());
    handle.push_result(ScriptedResult::new(
        &["id", "name"],
        &["int4", "text"],
        vec![vec![RowValues::Int(9), RowValues::Text("zed".into())]],
    ));
    let mut sth = conn.prepare("SELECT id, name FROM people").unwrap();
    sth.execute(&[]).unwrap();
    assert_eq!(sth.rows(), 3);
    sth.execute(&[]).unwrap();
    assert_eq!(sth.rows(), 1);
    let row = sth.fetch_row().unwrap().unwrap();
    assert_eq!(row.get("name"), Some(&RowValues::Text("zed".into())));
}

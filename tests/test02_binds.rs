use sql_dbd::prelude::*;

fn open() -> (Connection, MockHandle) {
    let (backend, handle) = MockBackend::new();
    let conn = Connection::open(Config::new("localhost"), Options::default(), backend)
        .expect("open connection");
    (conn, handle)
}

#[test]
fn named_bind_replaces_every_occurrence() {
    let (conn, handle) = open();
    let mut sth = conn
        .prepare("SELECT * FROM t WHERE a = :v OR b = :v ")
        .unwrap();
    sth.bind(":v", RowValues::Int(7));
    sth.execute(&[]).unwrap();
    assert_eq!(
        handle.executed(),
        vec!["SELECT * FROM t WHERE a = 7 OR b = 7 ".to_string()]
    );
}

#[test]
fn cast_suffix_and_delimiter_are_preserved() {
    let (conn, handle) = open();
    let mut sth = conn
        .prepare("SELECT * FROM t WHERE id = :id::uuid AND f(:id::uuid)")
        .unwrap();
    sth.bind(":id", RowValues::Text("abc".into()));
    sth.execute(&[]).unwrap();
    assert_eq!(
        handle.executed(),
        vec!["SELECT * FROM t WHERE id = 'abc'::uuid AND f('abc'::uuid)".to_string()]
    );
}

#[test]
fn numeric_list_expands_unquoted_for_in_clauses() {
    let (conn, handle) = open();
    let mut sth = conn.prepare("SELECT * FROM t WHERE id IN (:ids)").unwrap();
    sth.bind_typed(
        ":ids",
        vec![RowValues::Int(1), RowValues::Int(2), RowValues::Int(3)],
        BindType::Numeric,
    );
    sth.execute(&[]).unwrap();
    assert_eq!(
        handle.executed(),
        vec!["SELECT * FROM t WHERE id IN (1,2,3)".to_string()]
    );
}

#[test]
fn scalar_list_expands_with_quoting() {
    let (conn, handle) = open();
    let mut sth = conn
        .prepare("SELECT * FROM t WHERE name IN (:names)")
        .unwrap();
    sth.bind(
        ":names",
        vec![RowValues::Text("a".into()), RowValues::Text("b".into())],
    );
    sth.execute(&[]).unwrap();
    assert_eq!(
        handle.executed(),
        vec!["SELECT * FROM t WHERE name IN ('a','b')".to_string()]
    );
}

#[test]
fn binary_bind_renders_a_complete_literal() {
    let (conn, handle) = open();
    let mut sth = conn.prepare("INSERT INTO t (data) VALUES (:blob)").unwrap();
    sth.bind_typed(":blob", RowValues::Blob(vec![0xde, 0xad]), BindType::Binary);
    sth.execute(&[]).unwrap();
    assert_eq!(
        handle.executed(),
        vec!["INSERT INTO t (data) VALUES (E'\\\\xdead')".to_string()]
    );
}

#[test]
fn binary_bind_accepts_null() {
    let (conn, handle) = open();
    let mut sth = conn.prepare("INSERT INTO t (data) VALUES (:blob)").unwrap();
    sth.bind_typed(":blob", RowValues::Null, BindType::Binary);
    sth.execute(&[]).unwrap();
    assert_eq!(
        handle.executed(),
        vec!["INSERT INTO t (data) VALUES (NULL)".to_string()]
    );
}

#[test]
fn numeric_bind_rejects_text_values() {
    let (conn, _handle) = open();
    let mut sth = conn.prepare("SELECT * FROM t WHERE id = :id ").unwrap();
    sth.bind_typed(":id", RowValues::Text("1; DROP TABLE t".into()), BindType::Numeric);
    assert!(matches!(
        sth.execute(&[]),
        Err(SqlDbdError::ParameterError(_))
    ));
}

#[test]
fn token_at_end_of_template_does_not_match() {
    // The token grammar requires a trailing delimiter, so a bind at the
    // very end of the template is left untouched.
    let (conn, handle) = open();
    let mut sth = conn.prepare("SELECT * FROM t WHERE id = :id").unwrap();
    sth.bind(":id", RowValues::Int(1));
    sth.execute(&[]).unwrap();
    assert_eq!(
        handle.executed(),
        vec!["SELECT * FROM t WHERE id = :id".to_string()]
    );
}

#[test]
fn binds_combine_with_positional_placeholders() {
    let (conn, handle) = open();
    let mut sth = conn
        .prepare("UPDATE t SET v = ? WHERE id IN (:ids)")
        .unwrap();
    sth.bind_typed(":ids", vec![RowValues::Int(4), RowValues::Int(5)], BindType::Numeric);
    sth.execute(&[RowValues::Text("x".into())]).unwrap();
    assert_eq!(
        handle.executed(),
        vec!["UPDATE t SET v = 'x' WHERE id IN (4,5)".to_string()]
    );
}

//! A scripted mock backend for engine tests.
//!
//! The mock speaks a PostgreSQL-ish dialect (quoted text, bare integers,
//! `TRUE`/`FALSE`, `E'\\x…'` binary literals) and records every statement
//! the engine sends, so tests can assert on the exact compiled SQL. Results
//! are scripted: push them in the order the statements under test will
//! consume them.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::backend::{Backend, BackendCursor, MaterializedCursor, TransactionState};
use crate::error::SqlDbdError;
use crate::types::RowValues;

/// One scripted result, consumed by the next non-control statement.
pub struct ScriptedResult {
    pub columns: Vec<String>,
    pub types: Vec<String>,
    pub rows: Vec<Vec<RowValues>>,
    affected: Option<usize>,
}

impl ScriptedResult {
    #[must_use]
    pub fn new(columns: &[&str], types: &[&str], rows: Vec<Vec<RowValues>>) -> Self {
        Self {
            columns: columns.iter().map(ToString::to_string).collect(),
            types: types.iter().map(ToString::to_string).collect(),
            rows,
            affected: None,
        }
    }

    /// An empty result with no columns, reporting `affected` rows.
    #[must_use]
    pub fn affected(affected: usize) -> Self {
        Self {
            columns: Vec::new(),
            types: Vec::new(),
            rows: Vec::new(),
            affected: Some(affected),
        }
    }

    fn into_cursor(self) -> MaterializedCursor {
        match self.affected {
            Some(affected) => MaterializedCursor::for_affected(affected),
            None => MaterializedCursor::new(self.columns, self.types, self.rows),
        }
    }
}

#[derive(Default)]
struct MockState {
    connected: bool,
    results: VecDeque<ScriptedResult>,
    executed: Vec<String>,
    prepared: Vec<(String, String)>,
    executed_named: Vec<(String, Vec<RowValues>)>,
    fail_next: Option<String>,
    fail_connect: bool,
    transaction: TransactionState,
    last_error: String,
    connect_count: usize,
}

/// The engine-facing half of the mock. Create through [`MockBackend::new`]
/// and hand to `Connection::open`; keep the paired [`MockHandle`] for
/// scripting and assertions.
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

/// The test-facing half: scripts results, injects failures, inspects what
/// the engine sent.
#[derive(Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    #[must_use]
    pub fn new() -> (Self, MockHandle) {
        let state = Arc::new(Mutex::new(MockState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockHandle { state },
        )
    }
}

fn lock(state: &Arc<Mutex<MockState>>) -> MutexGuard<'_, MockState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl MockHandle {
    /// Queue a result for the next non-control statement.
    pub fn push_result(&self, result: ScriptedResult) {
        lock(&self.state).results.push_back(result);
    }

    /// Make the next statement fail with this driver message.
    pub fn fail_next(&self, message: &str) {
        lock(&self.state).fail_next = Some(message.to_string());
    }

    /// Make connection attempts fail.
    pub fn fail_connect(&self) {
        lock(&self.state).fail_connect = true;
    }

    /// Force the reported transaction status, for states the control
    /// statements alone cannot reach (a failed block).
    pub fn set_transaction_state(&self, state: TransactionState) {
        lock(&self.state).transaction = state;
    }

    #[must_use]
    pub fn transaction_state(&self) -> TransactionState {
        lock(&self.state).transaction
    }

    /// Every raw statement the engine sent, in order, control statements
    /// included.
    #[must_use]
    pub fn executed(&self) -> Vec<String> {
        lock(&self.state).executed.clone()
    }

    /// Every `(name, sql)` pair prepared server-side.
    #[must_use]
    pub fn prepared(&self) -> Vec<(String, String)> {
        lock(&self.state).prepared.clone()
    }

    /// Every named execution with its arguments.
    #[must_use]
    pub fn executed_named(&self) -> Vec<(String, Vec<RowValues>)> {
        lock(&self.state).executed_named.clone()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        lock(&self.state).connected
    }

    #[must_use]
    pub fn connect_count(&self) -> usize {
        lock(&self.state).connect_count
    }
}

impl Backend for MockBackend {
    fn connect(&mut self) -> Result<(), SqlDbdError> {
        let mut state = lock(&self.state);
        if state.fail_connect {
            return Err(SqlDbdError::ConnectionError(
                "mock connect refused".to_string(),
            ));
        }
        state.connected = true;
        state.connect_count += 1;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        lock(&self.state).connected
    }

    fn disconnect(&mut self) -> Result<(), SqlDbdError> {
        lock(&self.state).connected = false;
        Ok(())
    }

    fn raw_query(&mut self, sql: &str) -> Option<Box<dyn BackendCursor>> {
        let mut state = lock(&self.state);
        state.executed.push(sql.to_string());
        if let Some(message) = state.fail_next.take() {
            state.last_error = message;
            if state.transaction == TransactionState::Active {
                state.transaction = TransactionState::Failed;
            }
            return None;
        }
        match sql.trim().to_ascii_uppercase().as_str() {
            "BEGIN" => {
                state.transaction = TransactionState::Active;
                Some(Box::new(MaterializedCursor::for_affected(0)))
            }
            "COMMIT" | "ROLLBACK" => {
                state.transaction = TransactionState::Idle;
                Some(Box::new(MaterializedCursor::for_affected(0)))
            }
            _ => {
                let result = state.results.pop_front().unwrap_or_else(|| {
                    ScriptedResult::affected(0)
                });
                Some(Box::new(result.into_cursor()))
            }
        }
    }

    fn prepare_named(&mut self, name: &str, sql: &str) -> bool {
        let mut state = lock(&self.state);
        if let Some(message) = state.fail_next.take() {
            state.last_error = message;
            return false;
        }
        state.prepared.push((name.to_string(), sql.to_string()));
        true
    }

    fn execute_named(&mut self, name: &str, args: &[RowValues]) -> Option<Box<dyn BackendCursor>> {
        let mut state = lock(&self.state);
        state.executed_named.push((name.to_string(), args.to_vec()));
        if let Some(message) = state.fail_next.take() {
            state.last_error = message;
            return None;
        }
        let result = state
            .results
            .pop_front()
            .unwrap_or_else(|| ScriptedResult::affected(0));
        Some(Box::new(result.into_cursor()))
    }

    fn escape_scalar(&self, value: &RowValues) -> String {
        match value {
            RowValues::Null => "NULL".to_string(),
            RowValues::Int(i) => i.to_string(),
            RowValues::Float(f) => f.to_string(),
            RowValues::Bool(true) => "TRUE".to_string(),
            RowValues::Bool(false) => "FALSE".to_string(),
            RowValues::Text(s) => format!("'{}'", s.replace('\'', "''")),
            RowValues::Timestamp(ts) => {
                format!("'{}'", ts.format("%Y-%m-%d %H:%M:%S%.f"))
            }
            RowValues::JSON(v) => format!("'{}'", v.to_string().replace('\'', "''")),
            RowValues::Blob(bytes) => self.escape_binary(bytes),
        }
    }

    fn escape_binary(&self, bytes: &[u8]) -> String {
        let mut literal = String::from("E'\\\\x");
        for byte in bytes {
            literal.push_str(&format!("{byte:02x}"));
        }
        literal.push('\'');
        literal
    }

    fn last_error(&self) -> String {
        lock(&self.state).last_error.clone()
    }

    fn transaction_state(&mut self) -> Result<TransactionState, SqlDbdError> {
        let state = lock(&self.state);
        if !state.connected {
            return Err(SqlDbdError::ConnectionError(
                "mock backend is not connected".to_string(),
            ));
        }
        Ok(state.transaction)
    }
}

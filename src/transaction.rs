//! Transaction control on top of the backend's own notion of transaction
//! status.
//!
//! No local boolean shadows the server: every decision re-derives the
//! state from [`Backend::transaction_state`], so a transaction opened by a
//! raw `BEGIN` sent through [`Connection::query`] is still visible here.

use crate::backend::{Backend, TransactionState};
use crate::connection::{Connection, lock_backend};
use crate::error::SqlDbdError;

impl Connection {
    /// Open a transaction block.
    ///
    /// # Errors
    /// `AlreadyInTransaction` when a block is already open,
    /// `TransactionInErrorState` when the open block has already failed.
    pub fn begin(&self) -> Result<(), SqlDbdError> {
        let mut backend = lock_backend(self.backend());
        if !backend.is_connected() {
            backend.connect()?;
        }
        match backend.transaction_state()? {
            TransactionState::Active => return Err(SqlDbdError::AlreadyInTransaction),
            TransactionState::Failed => return Err(SqlDbdError::TransactionInErrorState),
            TransactionState::Idle => {}
        }
        run_control(&mut **backend, "BEGIN")?;
        tracing::debug!("transaction started");
        Ok(())
    }

    /// Commit the open transaction block.
    ///
    /// # Errors
    /// `CommitInFailedTransaction` when the block has failed,
    /// `NoTransactionToCommit` when no block is open, a connection error
    /// when the connection was never established.
    pub fn commit(&self) -> Result<(), SqlDbdError> {
        let mut backend = lock_backend(self.backend());
        if !backend.is_connected() {
            return Err(SqlDbdError::ConnectionError(
                "commit failed: no connection established yet".to_string(),
            ));
        }
        match backend.transaction_state()? {
            TransactionState::Failed => return Err(SqlDbdError::CommitInFailedTransaction),
            TransactionState::Idle => return Err(SqlDbdError::NoTransactionToCommit),
            TransactionState::Active => {}
        }
        run_control(&mut **backend, "COMMIT")?;
        tracing::debug!("transaction committed");
        Ok(())
    }

    /// Roll back the open transaction block; valid from both the active
    /// and the failed state.
    ///
    /// # Errors
    /// `NoTransactionToRollback` when no block is open.
    pub fn rollback(&self) -> Result<(), SqlDbdError> {
        let mut backend = lock_backend(self.backend());
        if !backend.is_connected() {
            backend.connect()?;
        }
        match backend.transaction_state()? {
            TransactionState::Idle => return Err(SqlDbdError::NoTransactionToRollback),
            TransactionState::Active | TransactionState::Failed => {}
        }
        run_control(&mut **backend, "ROLLBACK")?;
        tracing::debug!("transaction rolled back");
        Ok(())
    }

    /// Whether a transaction block is open, failed or not.
    ///
    /// # Errors
    /// Propagates backend status failures.
    pub fn in_transaction(&self) -> Result<bool, SqlDbdError> {
        let mut backend = lock_backend(self.backend());
        if !backend.is_connected() {
            backend.connect()?;
        }
        Ok(backend.transaction_state()? != TransactionState::Idle)
    }
}

fn run_control(backend: &mut dyn Backend, command: &str) -> Result<(), SqlDbdError> {
    match backend.raw_query(command) {
        Some(_) => Ok(()),
        None => Err(SqlDbdError::BackendExecutionFailed {
            message: backend.last_error(),
            query: command.to_string(),
        }),
    }
}

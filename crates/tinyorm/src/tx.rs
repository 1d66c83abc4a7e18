//! Nested transaction scopes.
//!
//! Transactions nest by counting: only the outermost scope commits or rolls
//! back, inner scopes just raise and lower the depth. A scope opened on a
//! thread with no connection scope opens one for the duration.

use crate::ctx;
use tinyorm_core::error::TransactionError;
use tinyorm_core::{Error, Result};
use tracing::{debug, warn};

/// Run `body` inside a transaction scope.
///
/// At the outermost scope, `Ok` commits and `Err` rolls back; nested calls
/// only propagate the result. A commit failure triggers a rollback attempt,
/// and the returned error carries both failures when the rollback also
/// fails. If `body` panics, the transaction is rolled back during unwinding.
pub fn transaction<T>(body: impl FnOnce() -> Result<T>) -> Result<T> {
    let mut scope = TxScope::enter();
    let result = body();
    scope.finish(result)
}

struct TxScope {
    owns_scope: bool,
    finished: bool,
}

impl TxScope {
    fn enter() -> Self {
        let owns_scope = ctx::begin_scope();
        let depth = ctx::inc_depth();
        debug!(depth, "transaction scope entered");
        Self {
            owns_scope,
            finished: false,
        }
    }

    fn finish<T>(&mut self, result: Result<T>) -> Result<T> {
        self.finished = true;
        let depth = ctx::dec_depth();
        if depth > 0 {
            debug!(depth, "nested transaction scope left");
            return result;
        }

        match result {
            Ok(value) => match ctx::commit_if_connected() {
                Ok(()) => {
                    debug!("transaction committed");
                    Ok(value)
                }
                Err(commit_err) => {
                    warn!(error = %commit_err, "commit failed, rolling back");
                    let rollback_err = ctx::rollback_if_connected().err();
                    Err(Error::Transaction(TransactionError::new(
                        commit_err,
                        rollback_err,
                    )))
                }
            },
            Err(err) => {
                if let Err(rollback_err) = ctx::rollback_if_connected() {
                    warn!(error = %rollback_err, "rollback failed");
                } else {
                    debug!("transaction rolled back");
                }
                Err(err)
            }
        }
    }
}

impl Drop for TxScope {
    fn drop(&mut self) {
        if !self.finished {
            // Unwinding out of the body: roll back at the outermost scope.
            let depth = ctx::dec_depth();
            if depth == 0 {
                if let Err(err) = ctx::rollback_if_connected() {
                    warn!(error = %err, "rollback failed during unwinding");
                }
            }
        }
        if self.owns_scope {
            ctx::end_scope();
        }
    }
}

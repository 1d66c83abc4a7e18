//! Thread-scoped connection context.
//!
//! Each thread carries one context holding at most one open connection and
//! the current transaction nesting depth. Opening a scope only marks the
//! thread; the physical connection is established lazily, on the first
//! statement that actually needs one. Threads never share connections.

use crate::engine::engine;
use std::cell::RefCell;
use tinyorm_core::error::{ConnectionError, ConnectionErrorKind};
use tinyorm_core::{DriverConnection, Error, Result};
use tracing::debug;

struct DbCtx {
    /// A connection scope is open on this thread
    active: bool,
    /// The lazily opened physical connection
    conn: Option<Box<dyn DriverConnection>>,
    /// Transaction nesting depth
    depth: u32,
}

thread_local! {
    static DB_CTX: RefCell<DbCtx> = RefCell::new(DbCtx {
        active: false,
        conn: None,
        depth: 0,
    });
}

/// Mark a connection scope open on this thread.
///
/// Returns true if this call opened the scope (the caller owns the release),
/// false if a scope was already open.
pub(crate) fn begin_scope() -> bool {
    DB_CTX.with(|c| {
        let mut ctx = c.borrow_mut();
        if ctx.active {
            false
        } else {
            ctx.active = true;
            true
        }
    })
}

/// Close the scope and drop the physical connection, if one was opened.
pub(crate) fn end_scope() {
    DB_CTX.with(|c| {
        let mut ctx = c.borrow_mut();
        ctx.active = false;
        if ctx.conn.take().is_some() {
            debug!("released connection");
        }
    });
}

/// Run `f` against this thread's connection, opening it lazily.
pub(crate) fn with_conn<T>(f: impl FnOnce(&mut dyn DriverConnection) -> Result<T>) -> Result<T> {
    DB_CTX.with(|c| {
        let mut ctx = c.borrow_mut();
        if !ctx.active {
            return Err(not_open());
        }
        if ctx.conn.is_none() {
            let conn = engine()?.connect()?;
            debug!("opened lazy connection");
            ctx.conn = Some(conn);
        }
        let Some(conn) = ctx.conn.as_deref_mut() else {
            return Err(not_open());
        };
        f(conn)
    })
}

/// Commit on the physical connection, if one was ever opened.
///
/// A scope that executed no statements has nothing to commit.
pub(crate) fn commit_if_connected() -> Result<()> {
    DB_CTX.with(|c| {
        let mut ctx = c.borrow_mut();
        match ctx.conn.as_deref_mut() {
            Some(conn) => conn.commit(),
            None => Ok(()),
        }
    })
}

/// Roll back on the physical connection, if one was ever opened.
pub(crate) fn rollback_if_connected() -> Result<()> {
    DB_CTX.with(|c| {
        let mut ctx = c.borrow_mut();
        match ctx.conn.as_deref_mut() {
            Some(conn) => conn.rollback(),
            None => Ok(()),
        }
    })
}

/// Current transaction nesting depth on this thread.
pub(crate) fn depth() -> u32 {
    DB_CTX.with(|c| c.borrow().depth)
}

/// Enter one transaction nesting level, returning the new depth.
pub(crate) fn inc_depth() -> u32 {
    DB_CTX.with(|c| {
        let mut ctx = c.borrow_mut();
        ctx.depth += 1;
        ctx.depth
    })
}

/// Leave one transaction nesting level, returning the new depth.
pub(crate) fn dec_depth() -> u32 {
    DB_CTX.with(|c| {
        let mut ctx = c.borrow_mut();
        debug_assert!(ctx.depth > 0, "transaction depth underflow");
        ctx.depth = ctx.depth.saturating_sub(1);
        ctx.depth
    })
}

fn not_open() -> Error {
    Error::Connection(ConnectionError {
        kind: ConnectionErrorKind::NotOpen,
        message: "no connection scope is open on this thread".to_string(),
        source: None,
    })
}

/// RAII guard for a thread connection scope.
///
/// The outermost scope owns the release; nested scopes are no-ops, so the
/// same physical connection serves every statement in between.
pub struct ConnectionScope {
    owns: bool,
}

impl ConnectionScope {
    /// Open a scope on the current thread.
    pub fn open() -> Self {
        Self {
            owns: begin_scope(),
        }
    }
}

impl Drop for ConnectionScope {
    fn drop(&mut self) {
        if self.owns {
            end_scope();
        }
    }
}

/// Run `body` inside a connection scope.
///
/// Statements inside share one lazily opened connection, released when the
/// outermost scope ends.
pub fn with_connection<T>(body: impl FnOnce() -> Result<T>) -> Result<T> {
    let _scope = ConnectionScope::open();
    body()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_pairs_up() {
        assert_eq!(depth(), 0);
        assert_eq!(inc_depth(), 1);
        assert_eq!(inc_depth(), 2);
        assert_eq!(dec_depth(), 1);
        assert_eq!(dec_depth(), 0);
    }

    #[test]
    #[should_panic(expected = "transaction depth underflow")]
    fn unbalanced_depth_decrement_is_caught() {
        dec_depth();
    }

    #[test]
    fn outermost_scope_owns_the_release() {
        assert!(begin_scope());
        assert!(!begin_scope());
        end_scope();
    }
}

//! Statement execution against the thread's connection.
//!
//! Every function opens a connection scope for its own duration when the
//! calling thread has none, so one-off statements work without explicit
//! scope management. Writes issued outside any transaction scope are
//! committed immediately.

use crate::ctx::{self, with_connection};
use std::time::Instant;
use tinyorm_core::error::MultiColumnError;
use tinyorm_core::{Error, FromValue, Result, Row, Value, translate_placeholders};
use tracing::{debug, warn};

// Statements slower than this get logged at warn level.
const SLOW_STATEMENT_MS: u128 = 100;

fn profile(sql: &str, start: Instant) {
    let elapsed = start.elapsed().as_millis();
    if elapsed > SLOW_STATEMENT_MS {
        warn!(sql, elapsed_ms = elapsed, "slow statement");
    } else {
        debug!(sql, elapsed_ms = elapsed, "statement executed");
    }
}

/// Run a SELECT and return all rows.
pub fn select(sql: &str, params: &[Value]) -> Result<Vec<Row>> {
    with_connection(|| {
        let start = Instant::now();
        let rows = ctx::with_conn(|conn| {
            let sql = translate_placeholders(sql, conn);
            conn.query(&sql, params)
        })?;
        profile(sql, start);
        Ok(rows)
    })
}

/// Run a SELECT and return the first row, if any.
pub fn select_one(sql: &str, params: &[Value]) -> Result<Option<Row>> {
    Ok(select(sql, params)?.into_iter().next())
}

/// Run a SELECT expected to produce a single one-column row and return the
/// value, converted to `T`.
///
/// A row with any other column count is a `MultiColumnError`; an empty
/// result set is a query error.
pub fn select_scalar<T: FromValue>(sql: &str, params: &[Value]) -> Result<T> {
    let row = select_one(sql, params)?
        .ok_or_else(|| Error::query(format!("scalar query returned no rows: '{sql}'")))?;
    if row.len() != 1 {
        return Err(Error::MultiColumn(MultiColumnError { columns: row.len() }));
    }
    row.get_as(0)
}

/// Run a write statement (INSERT, UPDATE, DELETE, DDL) and return the
/// affected-row count.
///
/// Outside a transaction scope the write is committed immediately; inside
/// one, the outermost scope decides.
pub fn execute(sql: &str, params: &[Value]) -> Result<u64> {
    with_connection(|| {
        let start = Instant::now();
        let affected = ctx::with_conn(|conn| {
            let sql = translate_placeholders(sql, conn);
            conn.execute(&sql, params)
        })?;
        profile(sql, start);
        if ctx::depth() == 0 {
            ctx::commit_if_connected()?;
            debug!(affected, "auto-committed");
        }
        Ok(affected)
    })
}

/// Run an UPDATE statement and return the affected-row count.
pub fn update(sql: &str, params: &[Value]) -> Result<u64> {
    execute(sql, params)
}

/// Insert one row built from (column, value) pairs.
pub fn insert_row(table: &str, values: &[(&str, Value)]) -> Result<u64> {
    let columns: Vec<&str> = values.iter().map(|(c, _)| *c).collect();
    let markers = vec!["?"; values.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        markers
    );
    let params: Vec<Value> = values.iter().map(|(_, v)| v.clone()).collect();
    execute(&sql, &params)
}

//! SQLite connection implementation.
//!
//! Safe wrappers around SQLite's C API implementing the driver traits from
//! tinyorm-core.
//!
//! Transactions are deferred: a connection stays in autocommit mode until
//! the first write statement, which implicitly issues BEGIN. `commit` and
//! `rollback` are no-ops when no transaction is open, so callers can pair
//! every unit of work with a commit-or-rollback without tracking whether a
//! write actually happened.

// Allow casts in FFI code where we need to match C types exactly
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_lossless)]

use crate::types;
use libsqlite3_sys as ffi;
use std::ffi::{CStr, CString, c_int};
use std::ptr;
use std::sync::Arc;
use tinyorm_core::error::{ConnectionError, ConnectionErrorKind, ConstraintError, QueryError};
use tinyorm_core::row::ColumnInfo;
use tinyorm_core::{Driver, DriverConnection, EngineConfig, Error, Result, Row, Value};
use tracing::{debug, trace};

// Present in the bundled SQLite library but missing from libsqlite3-sys's
// prebuilt bindings.
unsafe extern "C" {
    fn sqlite3_close_v2(db: *mut ffi::sqlite3) -> c_int;
}

/// Configuration for opening SQLite connections.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Path to the database file, or ":memory:" for an in-memory database.
    pub path: String,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: ":memory:".to_string(),
            busy_timeout_ms: 5000,
        }
    }
}

impl SqliteConfig {
    /// Create a new config for a file-based database.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Create a new config for an in-memory database.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Set busy timeout.
    pub fn busy_timeout(mut self, ms: u32) -> Self {
        self.busy_timeout_ms = ms;
        self
    }
}

/// The SQLite backend driver.
///
/// Holds the connection settings and opens one physical connection per
/// `connect` call.
#[derive(Debug, Clone)]
pub struct SqliteDriver {
    config: SqliteConfig,
}

impl SqliteDriver {
    /// Create a driver from a configuration.
    pub fn new(config: SqliteConfig) -> Self {
        Self { config }
    }

    /// Driver for an in-memory database.
    pub fn memory() -> Self {
        Self::new(SqliteConfig::memory())
    }

    /// Driver for a file-based database.
    pub fn file(path: impl Into<String>) -> Self {
        Self::new(SqliteConfig::file(path))
    }

    /// Build a driver from generic engine settings.
    ///
    /// SQLite is embedded, so only `database` (the file path) and the
    /// `busy_timeout_ms` option are read. Credentials and host settings
    /// are ignored.
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut sqlite = SqliteConfig::file(config.database.clone());
        if let Some(ms) = config
            .options
            .get("busy_timeout_ms")
            .and_then(|v| v.parse().ok())
        {
            sqlite.busy_timeout_ms = ms;
        }
        Self::new(sqlite)
    }
}

impl Driver for SqliteDriver {
    fn connect(&self) -> Result<Box<dyn DriverConnection>> {
        Ok(Box::new(SqliteConnection::open(&self.config)?))
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}

/// One open connection to a SQLite database.
pub struct SqliteConnection {
    db: *mut ffi::sqlite3,
    in_tx: bool,
    path: String,
}

// SAFETY: the handle is owned by exactly one thread at a time (the driver
// trait hands out owned boxes and takes &mut self), and SQLite handles may
// move between threads as long as they are not used concurrently.
unsafe impl Send for SqliteConnection {}

impl SqliteConnection {
    /// Open a new SQLite connection with the given configuration.
    pub fn open(config: &SqliteConfig) -> Result<Self> {
        let c_path = CString::new(config.path.as_str()).map_err(|_| {
            Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Connect,
                message: "invalid path: contains null byte".to_string(),
                source: None,
            })
        })?;

        let mut db: *mut ffi::sqlite3 = ptr::null_mut();
        let flags = ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE;

        // SAFETY: we pass valid pointers and check the return value
        let rc = unsafe { ffi::sqlite3_open_v2(c_path.as_ptr(), &mut db, flags, ptr::null()) };

        if rc != ffi::SQLITE_OK {
            let msg = if db.is_null() {
                error_string(rc)
            } else {
                // SAFETY: db is valid, errmsg returns a valid C string
                unsafe {
                    let msg = CStr::from_ptr(ffi::sqlite3_errmsg(db))
                        .to_string_lossy()
                        .into_owned();
                    ffi::sqlite3_close(db);
                    msg
                }
            };

            return Err(Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Connect,
                message: format!("failed to open database '{}': {}", config.path, msg),
                source: None,
            }));
        }

        if config.busy_timeout_ms > 0 {
            // SAFETY: db is valid
            unsafe {
                ffi::sqlite3_busy_timeout(db, config.busy_timeout_ms as c_int);
            }
        }

        debug!(path = %config.path, "opened sqlite connection");

        Ok(Self {
            db,
            in_tx: false,
            path: config.path.clone(),
        })
    }

    /// Get the database path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get the last insert rowid.
    pub fn last_insert_rowid(&self) -> i64 {
        // SAFETY: db is valid
        unsafe { ffi::sqlite3_last_insert_rowid(self.db) }
    }

    /// Execute SQL directly without preparing (transaction control, DDL).
    fn exec_raw(&mut self, sql: &str) -> Result<()> {
        let c_sql = CString::new(sql).map_err(|_| nul_byte_error(sql))?;

        let mut errmsg: *mut std::ffi::c_char = ptr::null_mut();

        // SAFETY: all pointers are valid
        let rc = unsafe {
            ffi::sqlite3_exec(self.db, c_sql.as_ptr(), None, ptr::null_mut(), &mut errmsg)
        };

        if rc != ffi::SQLITE_OK {
            let msg = if errmsg.is_null() {
                error_string(rc)
            } else {
                // SAFETY: errmsg is a valid C string allocated by sqlite
                let msg = unsafe { CStr::from_ptr(errmsg).to_string_lossy().into_owned() };
                unsafe { ffi::sqlite3_free(errmsg.cast()) };
                msg
            };
            return Err(sqlite_error(rc, msg, Some(sql)));
        }

        Ok(())
    }

    fn prepare(&self, sql: &str) -> Result<*mut ffi::sqlite3_stmt> {
        let c_sql = CString::new(sql).map_err(|_| nul_byte_error(sql))?;

        let mut stmt: *mut ffi::sqlite3_stmt = ptr::null_mut();

        // SAFETY: db is valid, c_sql outlives the call
        let rc = unsafe {
            ffi::sqlite3_prepare_v2(self.db, c_sql.as_ptr(), -1, &mut stmt, ptr::null_mut())
        };

        if rc != ffi::SQLITE_OK {
            return Err(self.db_error(rc, sql));
        }
        if stmt.is_null() {
            return Err(Error::query(format!("empty statement: '{sql}'")));
        }
        Ok(stmt)
    }

    fn bind_params(&self, stmt: *mut ffi::sqlite3_stmt, sql: &str, params: &[Value]) -> Result<()> {
        for (i, param) in params.iter().enumerate() {
            // SAFETY: stmt is valid, index is 1-based
            let rc = unsafe { types::bind_value(stmt, (i + 1) as c_int, param) };
            if rc != ffi::SQLITE_OK {
                // SAFETY: stmt is valid
                unsafe { ffi::sqlite3_finalize(stmt) };
                return Err(self.db_error(rc, sql));
            }
        }
        Ok(())
    }

    /// Open the deferred transaction before the first write.
    fn begin_if_needed(&mut self) -> Result<()> {
        if !self.in_tx {
            self.exec_raw("BEGIN DEFERRED")?;
            self.in_tx = true;
            trace!("implicit BEGIN");
        }
        Ok(())
    }

    /// Build an error from the connection's current error state.
    fn db_error(&self, rc: c_int, sql: &str) -> Error {
        // SAFETY: db is valid, errmsg returns a valid C string
        let msg = unsafe {
            CStr::from_ptr(ffi::sqlite3_errmsg(self.db))
                .to_string_lossy()
                .into_owned()
        };
        sqlite_error(rc, msg, Some(sql))
    }
}

impl DriverConnection for SqliteConnection {
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let stmt = self.prepare(sql)?;
        self.bind_params(stmt, sql, params)?;

        // SAFETY: stmt is valid
        let col_count = unsafe { ffi::sqlite3_column_count(stmt) };
        let mut col_names = Vec::with_capacity(col_count as usize);
        for i in 0..col_count {
            let name =
                unsafe { types::column_name(stmt, i) }.unwrap_or_else(|| format!("col{i}"));
            col_names.push(name);
        }
        let columns = Arc::new(ColumnInfo::new(col_names));

        let mut rows = Vec::new();
        loop {
            // SAFETY: stmt is valid
            let rc = unsafe { ffi::sqlite3_step(stmt) };
            match rc {
                ffi::SQLITE_ROW => {
                    let mut values = Vec::with_capacity(col_count as usize);
                    for i in 0..col_count {
                        // SAFETY: stmt is valid, we just got SQLITE_ROW
                        values.push(unsafe { types::read_column(stmt, i) });
                    }
                    rows.push(Row::with_columns(Arc::clone(&columns), values));
                }
                ffi::SQLITE_DONE => break,
                _ => {
                    let err = self.db_error(rc, sql);
                    // SAFETY: stmt is valid
                    unsafe { ffi::sqlite3_finalize(stmt) };
                    return Err(err);
                }
            }
        }

        // SAFETY: stmt is valid
        unsafe { ffi::sqlite3_finalize(stmt) };

        Ok(rows)
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        self.begin_if_needed()?;

        let stmt = self.prepare(sql)?;
        self.bind_params(stmt, sql, params)?;

        // SAFETY: stmt is valid
        let rc = unsafe { ffi::sqlite3_step(stmt) };

        // SAFETY: stmt is valid
        unsafe { ffi::sqlite3_finalize(stmt) };

        match rc {
            ffi::SQLITE_DONE | ffi::SQLITE_ROW => {
                // SAFETY: db is valid
                let changes = unsafe { ffi::sqlite3_changes(self.db) };
                Ok(changes as u64)
            }
            _ => Err(self.db_error(rc, sql)),
        }
    }

    fn commit(&mut self) -> Result<()> {
        if !self.in_tx {
            return Ok(());
        }
        self.exec_raw("COMMIT")?;
        self.in_tx = false;
        trace!("COMMIT");
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if !self.in_tx {
            return Ok(());
        }
        self.exec_raw("ROLLBACK")?;
        self.in_tx = false;
        trace!("ROLLBACK");
        Ok(())
    }
}

impl Drop for SqliteConnection {
    fn drop(&mut self) {
        if !self.db.is_null() {
            // SAFETY: db is valid and no statements are outstanding
            unsafe {
                sqlite3_close_v2(self.db);
            }
            debug!(path = %self.path, "closed sqlite connection");
        }
    }
}

fn nul_byte_error(sql: &str) -> Error {
    Error::Query(QueryError {
        sql: Some(sql.to_string()),
        message: "SQL contains null byte".to_string(),
        source: None,
    })
}

fn error_string(rc: c_int) -> String {
    // SAFETY: errstr returns a static C string for any code
    unsafe {
        CStr::from_ptr(ffi::sqlite3_errstr(rc))
            .to_string_lossy()
            .into_owned()
    }
}

/// Map a SQLite result code to the error taxonomy.
///
/// Constraint violations (the primary code, ignoring extended bits) get
/// their own variant so callers can react to duplicate keys.
fn sqlite_error(rc: c_int, message: String, sql: Option<&str>) -> Error {
    if rc & 0xff == ffi::SQLITE_CONSTRAINT {
        Error::Constraint(ConstraintError {
            message,
            sql: sql.map(String::from),
        })
    } else {
        Error::Query(QueryError {
            sql: sql.map(String::from),
            message,
            source: None,
        })
    }
}

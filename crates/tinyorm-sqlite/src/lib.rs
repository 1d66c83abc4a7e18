//! SQLite backend for TinyORM.
//!
//! Implements the `Driver` and `DriverConnection` traits from tinyorm-core
//! on top of the bundled SQLite amalgamation.

// FFI wrappers need raw pointer work
#![allow(unsafe_code)]

pub mod connection;
pub mod types;

pub use connection::{SqliteConfig, SqliteConnection, SqliteDriver};

//! Core types and traits for TinyORM.
//!
//! This crate provides the foundational abstractions shared by the engine
//! facade and the backend drivers:
//!
//! - `Value` and `Row` for dynamically-typed query data
//! - `FieldDef` and `TableMapping` for declarative entity metadata
//! - the process-wide mapping registry
//! - `Driver` / `DriverConnection` backend traits
//! - the error taxonomy used across all crates

pub mod config;
pub mod ddl;
pub mod driver;
pub mod error;
pub mod field;
pub mod mapping;
pub mod row;
pub mod types;
pub mod value;

pub use config::EngineConfig;
pub use ddl::create_table;
pub use driver::{Driver, DriverConnection, translate_placeholders};
pub use error::{
    ConfigError, ConnectionError, ConnectionErrorKind, ConstraintError, Error, MultiColumnError,
    QueryError, Result, SchemaError, SchemaErrorKind, TransactionError, ValidationError,
};
pub use field::{FieldDef, FieldDefault};
pub use mapping::{Mapping, TableMapping, lookup};
pub use row::{ColumnInfo, FromValue, Row};
pub use types::SqlType;
pub use value::Value;

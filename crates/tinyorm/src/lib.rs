//! TinyORM - a minimal thread-scoped database layer and declarative ORM.
//!
//! The crate is organized around three layers:
//!
//! - a process-wide [`engine`](crate::engine::Engine) holding the backend
//!   driver, initialized once with [`create_engine`]
//! - a thread-scoped connection context: each thread lazily opens at most
//!   one connection, scoped with [`with_connection`] and [`transaction`]
//! - a declarative entity layer: register a [`Mapping`] per type, implement
//!   [`Entity`], and use the provided CRUD methods
//!
//! # Quick Start
//!
//! ```ignore
//! use tinyorm::prelude::*;
//! use tinyorm_sqlite::SqliteDriver;
//!
//! struct Account {
//!     rec: Record,
//! }
//!
//! impl Entity for Account {
//!     fn mapping() -> Arc<TableMapping> {
//!         static MAPPING: OnceLock<Arc<TableMapping>> = OnceLock::new();
//!         Arc::clone(MAPPING.get_or_init(|| {
//!             Mapping::of("Account")
//!                 .field(FieldDef::string("id").primary_key())
//!                 .field(FieldDef::integer("balance"))
//!                 .register()
//!                 .unwrap()
//!         }))
//!     }
//!     fn record(&self) -> &Record { &self.rec }
//!     fn record_mut(&mut self) -> &mut Record { &mut self.rec }
//!     fn from_record(rec: Record) -> Self { Self { rec } }
//! }
//!
//! fn main() -> tinyorm::Result<()> {
//!     create_engine(SqliteDriver::file("app.db"))?;
//!     execute(&Account::create_table_sql(), &[])?;
//!
//!     transaction(|| {
//!         let mut account = Account::from_record(Record::new());
//!         account.record_mut().set("id", "a-1");
//!         account.insert()?;
//!         Ok(())
//!     })
//! }
//! ```

pub mod ctx;
pub mod engine;
pub mod entity;
pub mod executor;
pub mod ids;
pub mod tx;

pub use ctx::{ConnectionScope, with_connection};
pub use engine::{Engine, create_engine, engine};
pub use entity::{Entity, Record};
pub use executor::{execute, insert_row, select, select_one, select_scalar, update};
pub use ids::next_id;
pub use tx::transaction;

// Re-export the core vocabulary so callers need only this crate.
pub use tinyorm_core::{
    Driver, DriverConnection, EngineConfig, Error, FieldDef, FieldDefault, FromValue, Mapping,
    Result, Row, SqlType, TableMapping, Value, create_table,
};

/// Convenience imports for entity declarations and queries.
pub mod prelude {
    pub use crate::entity::{Entity, Record};
    pub use crate::executor::{execute, insert_row, select, select_one, select_scalar, update};
    pub use crate::{create_engine, next_id, transaction, with_connection};
    pub use std::sync::{Arc, OnceLock};
    pub use tinyorm_core::{FieldDef, Mapping, TableMapping, Value};
}

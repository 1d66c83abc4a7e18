//! Entity persistence: dynamic records and the `Entity` trait.
//!
//! An entity type couples a registered table mapping with a [`Record`] of
//! column values. The trait's provided methods cover the usual CRUD
//! operations; implementors only wire up the mapping and record storage,
//! and may override the `before_*` hooks to fill values ahead of a write.

use crate::executor;
use std::collections::BTreeMap;
use std::sync::Arc;
use tinyorm_core::error::ValidationError;
use tinyorm_core::{Error, FromValue, Result, Row, TableMapping, Value, create_table};

/// A dynamic bag of column values backing one entity instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    values: BTreeMap<String, Value>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from a query row.
    pub fn from_row(row: &Row) -> Self {
        let values = row
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        Self { values }
    }

    /// Get a column value.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    /// Get a column value converted to `T`.
    pub fn get_as<T: FromValue>(&self, column: &str) -> Result<T> {
        let value = self
            .get(column)
            .ok_or_else(|| Error::query(format!("record has no column '{column}'")))?;
        T::from_value(value)
    }

    /// Set a column value.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(column.into(), value.into());
    }

    /// Remove a column value.
    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.values.remove(column)
    }

    /// Whether the record carries a value for the column.
    pub fn contains(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    /// Number of columns with values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the record is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over (column, value) pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// A persistent entity type.
///
/// Implementors provide the registered mapping and access to the backing
/// record; everything else comes as provided methods. Missing values on
/// writes fall back to the field's default (suppliers are evaluated fresh
/// per call), then to NULL for nullable fields; a required field with no
/// value and no default is a validation error.
pub trait Entity: Sized {
    /// The registered table mapping for this type.
    fn mapping() -> Arc<TableMapping>;

    /// The backing record.
    fn record(&self) -> &Record;

    /// The backing record, mutably.
    fn record_mut(&mut self) -> &mut Record;

    /// Build an instance from a record.
    fn from_record(record: Record) -> Self;

    /// Hook invoked before `insert`.
    fn before_insert(&mut self) -> Result<()> {
        Ok(())
    }

    /// Hook invoked before `update`.
    fn before_update(&mut self) -> Result<()> {
        Ok(())
    }

    /// Hook invoked before `delete`.
    fn before_delete(&mut self) -> Result<()> {
        Ok(())
    }

    /// Fetch one instance by primary key.
    fn get(pk: impl Into<Value>) -> Result<Option<Self>> {
        let mapping = Self::mapping();
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ?",
            mapping.table(),
            mapping.primary_key().name
        );
        let row = executor::select_one(&sql, &[pk.into()])?;
        Ok(row.map(|r| Self::from_record(Record::from_row(&r))))
    }

    /// Fetch the first instance matching `criteria`.
    ///
    /// `criteria` is appended to the statement verbatim, e.g.
    /// `"WHERE balance > ? ORDER BY id"`.
    fn find_first(criteria: &str, params: &[Value]) -> Result<Option<Self>> {
        let sql = format!("SELECT * FROM {} {}", Self::mapping().table(), criteria);
        let row = executor::select_one(&sql, params)?;
        Ok(row.map(|r| Self::from_record(Record::from_row(&r))))
    }

    /// Fetch all instances matching `criteria`.
    fn find_by(criteria: &str, params: &[Value]) -> Result<Vec<Self>> {
        let sql = format!("SELECT * FROM {} {}", Self::mapping().table(), criteria);
        let rows = executor::select(&sql, params)?;
        Ok(rows
            .iter()
            .map(|r| Self::from_record(Record::from_row(r)))
            .collect())
    }

    /// Fetch all instances.
    fn find_all() -> Result<Vec<Self>> {
        Self::find_by("", &[])
    }

    /// Count all rows of this entity's table.
    fn count_all() -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", Self::mapping().table());
        executor::select_scalar(&sql, &[])
    }

    /// Count rows matching `criteria`.
    fn count_by(criteria: &str, params: &[Value]) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} {}",
            Self::mapping().table(),
            criteria
        );
        executor::select_scalar(&sql, params)
    }

    /// Insert this instance.
    ///
    /// Fills missing insertable columns from defaults first, mutating the
    /// record, so the instance reflects what was stored.
    fn insert(&mut self) -> Result<u64> {
        self.before_insert()?;
        let mapping = Self::mapping();

        for field in mapping.insertable_fields() {
            if !self.record().contains(&field.name) {
                let value = substitute_default(field.default_now(), field.nullable, &field.name)?;
                self.record_mut().set(field.name.clone(), value);
            }
        }

        let mut columns = Vec::new();
        let mut params = Vec::new();
        for field in mapping.insertable_fields() {
            if let Some(value) = self.record().get(&field.name) {
                columns.push(field.name.as_str());
                params.push(value.clone());
            }
        }

        let markers = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            mapping.table(),
            columns.join(", "),
            markers
        );
        executor::execute(&sql, &params)
    }

    /// Update this instance's row, matched by primary key.
    fn update(&mut self) -> Result<u64> {
        self.before_update()?;
        let mapping = Self::mapping();
        let pk = mapping.primary_key();
        let pk_value = self
            .record()
            .get(&pk.name)
            .cloned()
            .ok_or_else(|| Error::Validation(ValidationError::missing(&pk.name)))?;

        let mut assignments = Vec::new();
        let mut params = Vec::new();
        for field in mapping.updatable_fields() {
            let value = match self.record().get(&field.name).cloned() {
                Some(v) => v,
                None => {
                    let v = substitute_default(field.default_now(), field.nullable, &field.name)?;
                    self.record_mut().set(field.name.clone(), v.clone());
                    v
                }
            };
            assignments.push(format!("{} = ?", field.name));
            params.push(value);
        }
        params.push(pk_value);

        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?",
            mapping.table(),
            assignments.join(", "),
            pk.name
        );
        executor::execute(&sql, &params)
    }

    /// Delete this instance's row, matched by primary key.
    fn delete(&mut self) -> Result<u64> {
        self.before_delete()?;
        let mapping = Self::mapping();
        let pk = mapping.primary_key();
        let pk_value = self
            .record()
            .get(&pk.name)
            .cloned()
            .ok_or_else(|| Error::Validation(ValidationError::missing(&pk.name)))?;

        let sql = format!(
            "DELETE FROM {} WHERE {} = ?",
            mapping.table(),
            pk.name
        );
        executor::execute(&sql, &[pk_value])
    }

    /// The CREATE TABLE statement for this entity's table.
    fn create_table_sql() -> String {
        create_table(&Self::mapping())
    }
}

fn substitute_default(default: Option<Value>, nullable: bool, field: &str) -> Result<Value> {
    match default {
        Some(v) => Ok(v),
        None if nullable => Ok(Value::Null),
        None => Err(Error::Validation(ValidationError::missing(field))),
    }
}

//! Field (column) descriptors.

use crate::types::SqlType;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-lifetime declaration counter.
///
/// Every `FieldDef` is stamped with the next value at creation, and table
/// mappings sort their columns by it. The counter never resets, so column
/// order is stable across all entity types declared in one process.
static DECLARATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Default value for a field, substituted when a record carries no value.
#[derive(Clone)]
pub enum FieldDefault {
    /// No default; a missing value on a non-nullable field is a caller error.
    None,
    /// A constant value.
    Value(Value),
    /// A supplier evaluated at each call, so identifiers and timestamps get
    /// a fresh value per insert.
    Supplier(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldDefault::None => write!(f, "None"),
            FieldDefault::Value(v) => write!(f, "Value({v:?})"),
            FieldDefault::Supplier(_) => write!(f, "Supplier(..)"),
        }
    }
}

/// Metadata about one column of an entity type.
///
/// Created once at entity-type registration and immutable thereafter; the
/// mapping registry shares it between all instances of the type.
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// Column name
    pub name: String,
    /// SQL type for DDL generation
    pub sql_type: SqlType,
    /// Explicit DDL override (e.g. "DECIMAL(10,2)"); takes precedence
    /// over `sql_type` when set.
    pub ddl_override: Option<String>,
    /// Whether this is the primary key
    pub primary_key: bool,
    /// Whether this column accepts NULL
    pub nullable: bool,
    /// Whether UPDATE statements cover this column
    pub updatable: bool,
    /// Whether INSERT statements cover this column
    pub insertable: bool,
    /// Default substituted for missing values
    pub default: FieldDefault,
    order: u64,
}

impl FieldDef {
    /// Create a new field with the given name and SQL type.
    ///
    /// Defaults: not a primary key, not nullable, updatable, insertable,
    /// no default value.
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            ddl_override: None,
            primary_key: false,
            nullable: false,
            updatable: true,
            insertable: true,
            default: FieldDefault::None,
            order: DECLARATION_COUNTER.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// A `VARCHAR(255)` field defaulting to the empty string.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, SqlType::VarChar(255)).default_value("")
    }

    /// An unbounded text field defaulting to the empty string.
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, SqlType::Text).default_value("")
    }

    /// A `BIGINT` field defaulting to zero.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, SqlType::BigInt).default_value(0_i64)
    }

    /// A `REAL` field defaulting to zero.
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, SqlType::Real).default_value(0.0_f64)
    }

    /// A `BOOLEAN` field defaulting to false.
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, SqlType::Boolean).default_value(false)
    }

    /// A `BLOB` field with no default.
    pub fn blob(name: impl Into<String>) -> Self {
        Self::new(name, SqlType::Blob)
    }

    /// Mark this field as the primary key.
    ///
    /// Primary keys are forced non-updatable and non-nullable when the
    /// mapping is built.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Set the nullable flag.
    pub fn nullable(mut self, value: bool) -> Self {
        self.nullable = value;
        self
    }

    /// Set the updatable flag.
    pub fn updatable(mut self, value: bool) -> Self {
        self.updatable = value;
        self
    }

    /// Set the insertable flag.
    pub fn insertable(mut self, value: bool) -> Self {
        self.insertable = value;
        self
    }

    /// Set a constant default value.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = FieldDefault::Value(value.into());
        self
    }

    /// Set a default supplier, evaluated freshly at each call.
    pub fn default_with(mut self, supplier: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.default = FieldDefault::Supplier(Arc::new(supplier));
        self
    }

    /// Override the DDL type text.
    pub fn ddl(mut self, ddl: impl Into<String>) -> Self {
        self.ddl_override = Some(ddl.into());
        self
    }

    /// Declaration order of this field (process-lifetime monotonic).
    pub fn order(&self) -> u64 {
        self.order
    }

    /// The effective DDL type text for this column.
    pub fn ddl_text(&self) -> String {
        self.ddl_override
            .clone()
            .unwrap_or_else(|| self.sql_type.sql_name())
    }

    /// Evaluate the default for this field, if one exists.
    ///
    /// Suppliers produce a fresh value on every call.
    pub fn default_now(&self) -> Option<Value> {
        match &self.default {
            FieldDefault::None => None,
            FieldDefault::Value(v) => Some(v.clone()),
            FieldDefault::Supplier(f) => Some(f()),
        }
    }

    pub(crate) fn force_primary_key_flags(&mut self) {
        self.updatable = false;
        self.nullable = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaration_order_is_monotonic() {
        let a = FieldDef::new("a", SqlType::Text);
        let b = FieldDef::new("b", SqlType::Text);
        let c = FieldDef::new("c", SqlType::Text);
        assert!(a.order() < b.order());
        assert!(b.order() < c.order());
    }

    #[test]
    fn typed_constructors_carry_defaults() {
        let f = FieldDef::string("name");
        assert_eq!(f.ddl_text(), "VARCHAR(255)");
        assert_eq!(f.default_now(), Some(Value::Text(String::new())));

        let f = FieldDef::integer("balance");
        assert_eq!(f.ddl_text(), "BIGINT");
        assert_eq!(f.default_now(), Some(Value::BigInt(0)));

        let f = FieldDef::blob("payload");
        assert_eq!(f.default_now(), None);
    }

    #[test]
    fn supplier_defaults_are_fresh_per_call() {
        use std::sync::atomic::{AtomicI64, Ordering};
        static TICKS: AtomicI64 = AtomicI64::new(0);

        let f = FieldDef::new("id", SqlType::VarChar(50))
            .default_with(|| Value::BigInt(TICKS.fetch_add(1, Ordering::Relaxed)));

        assert_eq!(f.default_now(), Some(Value::BigInt(0)));
        assert_eq!(f.default_now(), Some(Value::BigInt(1)));
    }

    #[test]
    fn ddl_override_wins() {
        let f = FieldDef::new("price", SqlType::Real).ddl("DECIMAL(10,2)");
        assert_eq!(f.ddl_text(), "DECIMAL(10,2)");
    }
}

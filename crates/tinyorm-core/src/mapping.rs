//! Per-entity-type table mappings and the process-wide mapping registry.

use crate::error::{Error, Result, SchemaError, SchemaErrorKind};
use crate::field::FieldDef;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{debug, warn};

/// Static metadata for one entity type: table name, ordered fields, and the
/// designated primary key.
///
/// Built once at registration, never mutated afterwards, and shared by all
/// instances of the type via `Arc`.
#[derive(Debug)]
pub struct TableMapping {
    table: String,
    fields: Vec<FieldDef>,
    pk: usize,
}

impl TableMapping {
    /// Build a mapping from a table name and field declarations.
    ///
    /// Fields are ordered by their declaration counter. Fails with a
    /// `SchemaError` unless exactly one field is marked primary key. The
    /// primary-key field is forced non-updatable and non-nullable.
    pub fn new(table: impl Into<String>, mut fields: Vec<FieldDef>) -> Result<Self> {
        let table = table.into();
        fields.sort_by_key(FieldDef::order);

        let mut pk = None;
        for (i, field) in fields.iter().enumerate() {
            if field.primary_key {
                if pk.is_some() {
                    return Err(Error::Schema(SchemaError {
                        kind: SchemaErrorKind::MultiplePrimaryKeys,
                        message: format!(
                            "more than one primary key declared for table '{}'",
                            table
                        ),
                    }));
                }
                pk = Some(i);
            }
        }
        let pk = pk.ok_or_else(|| {
            Error::Schema(SchemaError {
                kind: SchemaErrorKind::NoPrimaryKey,
                message: format!("no primary key declared for table '{}'", table),
            })
        })?;

        let pk_field = &mut fields[pk];
        if pk_field.updatable || pk_field.nullable {
            debug!(
                table = %table,
                field = %pk_field.name,
                "forcing primary key to non-updatable, non-nullable"
            );
            pk_field.force_primary_key_flags();
        }

        Ok(Self { table, fields, pk })
    }

    /// The table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// All fields in declaration order.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// The primary-key field.
    pub fn primary_key(&self) -> &FieldDef {
        &self.fields[self.pk]
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields covered by INSERT statements.
    pub fn insertable_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.insertable)
    }

    /// Fields covered by UPDATE statements.
    pub fn updatable_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.updatable)
    }
}

/// Declarative builder for registering an entity type.
///
/// ```
/// use tinyorm_core::mapping::Mapping;
/// use tinyorm_core::field::FieldDef;
///
/// let mapping = Mapping::of("Account")
///     .field(FieldDef::string("id").primary_key())
///     .field(FieldDef::integer("balance"))
///     .register()
///     .unwrap();
/// assert_eq!(mapping.table(), "account");
/// ```
#[derive(Debug)]
pub struct Mapping {
    entity: String,
    table: Option<String>,
    fields: Vec<FieldDef>,
}

impl Mapping {
    /// Start declaring the mapping for the named entity type.
    pub fn of(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            table: None,
            fields: Vec::new(),
        }
    }

    /// Override the table name. Defaults to the lower-cased entity name.
    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.table = Some(name.into());
        self
    }

    /// Add a field declaration.
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Build the mapping without registering it (for offline DDL work).
    pub fn build(self) -> Result<TableMapping> {
        let table = self
            .table
            .unwrap_or_else(|| self.entity.to_lowercase());
        TableMapping::new(table, self.fields)
    }

    /// Register this mapping in the process-wide registry.
    ///
    /// Registration happens exactly once per entity name: a second
    /// registration logs a warning, discards the new declaration, and
    /// returns the existing mapping.
    pub fn register(self) -> Result<Arc<TableMapping>> {
        let mut reg = registry().lock().map_err(|_| {
            Error::Schema(SchemaError {
                kind: SchemaErrorKind::Invalid,
                message: "mapping registry poisoned".to_string(),
            })
        })?;

        if let Some(existing) = reg.get(&self.entity) {
            warn!(entity = %self.entity, "entity already registered, keeping existing mapping");
            return Ok(Arc::clone(existing));
        }

        let entity = self.entity.clone();
        let mapping = Arc::new(self.build()?);
        debug!(entity = %entity, table = %mapping.table(), "registered entity mapping");
        reg.insert(entity, Arc::clone(&mapping));
        Ok(mapping)
    }
}

/// Look up a previously registered mapping by entity name.
pub fn lookup(entity: &str) -> Option<Arc<TableMapping>> {
    registry()
        .lock()
        .ok()
        .and_then(|reg| reg.get(entity).map(Arc::clone))
}

fn registry() -> &'static Mutex<HashMap<String, Arc<TableMapping>>> {
    static REGISTRY: OnceLock<Mutex<HashMap<String, Arc<TableMapping>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::SqlType;

    #[test]
    fn duplicate_primary_key_is_a_schema_error() {
        let result = Mapping::of("Broken")
            .field(FieldDef::string("a").primary_key())
            .field(FieldDef::string("b").primary_key())
            .build();

        match result {
            Err(Error::Schema(e)) => assert_eq!(e.kind, SchemaErrorKind::MultiplePrimaryKeys),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn missing_primary_key_is_a_schema_error() {
        let result = Mapping::of("NoPk")
            .field(FieldDef::string("a"))
            .build();

        match result {
            Err(Error::Schema(e)) => assert_eq!(e.kind, SchemaErrorKind::NoPrimaryKey),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn primary_key_forced_non_updatable_non_nullable() {
        let mapping = Mapping::of("Forced")
            .field(
                FieldDef::new("id", SqlType::VarChar(50))
                    .primary_key()
                    .nullable(true)
                    .updatable(true),
            )
            .field(FieldDef::string("name"))
            .build()
            .unwrap();

        let pk = mapping.primary_key();
        assert!(!pk.updatable);
        assert!(!pk.nullable);
        assert_eq!(pk.name, "id");
    }

    #[test]
    fn table_name_defaults_to_lowercased_entity() {
        let mapping = Mapping::of("UserProfile")
            .field(FieldDef::string("id").primary_key())
            .build()
            .unwrap();
        assert_eq!(mapping.table(), "userprofile");

        let mapping = Mapping::of("UserProfile")
            .table("profiles")
            .field(FieldDef::string("id").primary_key())
            .build()
            .unwrap();
        assert_eq!(mapping.table(), "profiles");
    }

    #[test]
    fn reregistration_returns_existing_mapping() {
        let first = Mapping::of("ReRegistered")
            .field(FieldDef::string("id").primary_key())
            .field(FieldDef::string("name"))
            .register()
            .unwrap();

        // Different declaration, same entity name: the original wins.
        let second = Mapping::of("ReRegistered")
            .table("something_else")
            .field(FieldDef::string("id").primary_key())
            .register()
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.table(), "reregistered");
        assert!(lookup("ReRegistered").is_some());
    }

    #[test]
    fn fields_keep_declaration_order() {
        let mapping = Mapping::of("Ordered")
            .field(FieldDef::string("first").primary_key())
            .field(FieldDef::string("second"))
            .field(FieldDef::string("third"))
            .build()
            .unwrap();

        let names: Vec<_> = mapping.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }
}

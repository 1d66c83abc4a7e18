//! CREATE TABLE generation from a table mapping.
//!
//! Pure text generation, used offline to build schema. The query hot path
//! never calls into this module.

use crate::mapping::TableMapping;

/// Build the CREATE TABLE statement for a mapping.
///
/// Columns appear in declaration order; nullable columns omit NOT NULL; the
/// primary key is emitted as a trailing table constraint.
pub fn create_table(mapping: &TableMapping) -> String {
    let mut sql = format!("CREATE TABLE {} (", mapping.table());

    for field in mapping.fields() {
        sql.push_str(&field.name);
        sql.push(' ');
        sql.push_str(&field.ddl_text());
        if !field.nullable {
            sql.push_str(" NOT NULL");
        }
        sql.push_str(", ");
    }

    sql.push_str(&format!("PRIMARY KEY({}));", mapping.primary_key().name));
    sql
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldDef;
    use crate::mapping::Mapping;
    use crate::types::SqlType;

    #[test]
    fn emits_columns_in_declaration_order() {
        let mapping = Mapping::of("User")
            .field(FieldDef::new("id", SqlType::VarChar(50)).primary_key())
            .field(FieldDef::string("name"))
            .field(FieldDef::string("email").updatable(false))
            .field(FieldDef::float("last_modified"))
            .build()
            .unwrap();

        assert_eq!(
            create_table(&mapping),
            "CREATE TABLE user (\
             id VARCHAR(50) NOT NULL, \
             name VARCHAR(255) NOT NULL, \
             email VARCHAR(255) NOT NULL, \
             last_modified REAL NOT NULL, \
             PRIMARY KEY(id));"
        );
    }

    #[test]
    fn nullable_columns_omit_not_null() {
        let mapping = Mapping::of("Note")
            .field(FieldDef::new("id", SqlType::BigInt).primary_key())
            .field(FieldDef::new("body", SqlType::Text).nullable(true))
            .build()
            .unwrap();

        assert_eq!(
            create_table(&mapping),
            "CREATE TABLE note (id BIGINT NOT NULL, body TEXT, PRIMARY KEY(id));"
        );
    }
}

//! SQL column types for DDL generation.

/// The SQL type of a column.
///
/// Covers the storage classes of the single SQL backend. For anything more
/// exotic, use [`crate::field::FieldDef::ddl`] to override the DDL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    /// BOOLEAN (stored as integer by the backend)
    Boolean,
    /// 32-bit integer
    Integer,
    /// 64-bit integer
    BigInt,
    /// 8-byte IEEE floating point
    Real,
    /// Unbounded text
    Text,
    /// Bounded text, `VARCHAR(n)`
    VarChar(u16),
    /// Binary data
    Blob,
}

impl SqlType {
    /// Get the DDL spelling of this type.
    pub fn sql_name(&self) -> String {
        match self {
            SqlType::Boolean => "BOOLEAN".to_string(),
            SqlType::Integer => "INTEGER".to_string(),
            SqlType::BigInt => "BIGINT".to_string(),
            SqlType::Real => "REAL".to_string(),
            SqlType::Text => "TEXT".to_string(),
            SqlType::VarChar(n) => format!("VARCHAR({})", n),
            SqlType::Blob => "BLOB".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_names() {
        assert_eq!(SqlType::BigInt.sql_name(), "BIGINT");
        assert_eq!(SqlType::VarChar(255).sql_name(), "VARCHAR(255)");
        assert_eq!(SqlType::Blob.sql_name(), "BLOB");
    }
}

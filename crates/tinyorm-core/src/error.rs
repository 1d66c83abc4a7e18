//! Error types for TinyORM operations.

use std::fmt;

/// The primary error type for all TinyORM operations.
#[derive(Debug)]
pub enum Error {
    /// Engine configuration errors (re-initialization, bad settings)
    Config(ConfigError),
    /// Connection-related errors (no open connection, driver connect failure)
    Connection(ConnectionError),
    /// Invalid entity mapping declarations
    Schema(SchemaError),
    /// Missing value with no default for a required field
    Validation(ValidationError),
    /// Backend-rejected write (uniqueness or other constraint violation)
    Constraint(ConstraintError),
    /// Scalar query returned a row with more than one column
    MultiColumn(MultiColumnError),
    /// Commit failed at the outermost transaction scope
    Transaction(TransactionError),
    /// Other backend query failures
    Query(QueryError),
    /// I/O errors
    Io(std::io::Error),
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
}

#[derive(Debug)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Failed to establish the physical connection
    Connect,
    /// An operation required an open connection but none exists
    NotOpen,
    /// The process-wide engine singleton was never initialized
    NoEngine,
}

#[derive(Debug)]
pub struct SchemaError {
    pub kind: SchemaErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorKind {
    /// No field was marked as primary key
    NoPrimaryKey,
    /// More than one field was marked as primary key
    MultiplePrimaryKeys,
    /// Other invalid mapping declaration
    Invalid,
}

/// A field on a record has no value and no default to fall back on.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ConstraintError {
    pub message: String,
    pub sql: Option<String>,
}

/// A scalar query produced a row with a column count other than one.
#[derive(Debug, Clone)]
pub struct MultiColumnError {
    pub columns: usize,
}

/// A commit at the outermost transaction scope failed.
///
/// Carries the commit failure and, when the recovery rollback also failed,
/// the rollback failure as well. Neither is masked.
#[derive(Debug)]
pub struct TransactionError {
    pub commit: Box<Error>,
    pub rollback: Option<Box<Error>>,
}

#[derive(Debug)]
pub struct QueryError {
    pub sql: Option<String>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ValidationError {
    pub fn missing(field: impl Into<String>) -> Self {
        let field = field.into();
        let message = format!("no value and no default for required field '{field}'");
        Self { field, message }
    }
}

impl TransactionError {
    pub fn new(commit: Error, rollback: Option<Error>) -> Self {
        Self {
            commit: Box::new(commit),
            rollback: rollback.map(Box::new),
        }
    }
}

impl Error {
    /// Build a query error with no SQL context.
    pub fn query(message: impl Into<String>) -> Self {
        Error::Query(QueryError {
            sql: None,
            message: message.into(),
            source: None,
        })
    }

    /// Is this a constraint violation from the backend?
    pub fn is_constraint(&self) -> bool {
        matches!(self, Error::Constraint(_))
    }

    /// Get the SQL that caused this error, if available.
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.sql.as_deref(),
            Error::Constraint(c) => c.sql.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
            Error::Connection(e) => write!(f, "Connection error: {}", e.message),
            Error::Schema(e) => write!(f, "Schema error: {}", e.message),
            Error::Validation(e) => write!(f, "Validation error: {}", e.message),
            Error::Constraint(e) => write!(f, "Constraint violation: {}", e.message),
            Error::MultiColumn(e) => write!(
                f,
                "Scalar query expected exactly one column, got {}",
                e.columns
            ),
            Error::Transaction(e) => match &e.rollback {
                Some(rb) => write!(
                    f,
                    "Transaction error: commit failed ({}) and rollback failed ({})",
                    e.commit, rb
                ),
                None => write!(
                    f,
                    "Transaction error: commit failed ({}), rolled back",
                    e.commit
                ),
            },
            Error::Query(e) => write!(f, "Query error: {}", e.message),
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connection(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Query(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Transaction(e) => Some(e.commit.as_ref()),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<ConnectionError> for Error {
    fn from(err: ConnectionError) -> Self {
        Error::Connection(err)
    }
}

impl From<SchemaError> for Error {
    fn from(err: SchemaError) -> Self {
        Error::Schema(err)
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Error::Validation(err)
    }
}

impl From<ConstraintError> for Error {
    fn from(err: ConstraintError) -> Self {
        Error::Constraint(err)
    }
}

impl From<MultiColumnError> for Error {
    fn from(err: MultiColumnError) -> Self {
        Error::MultiColumn(err)
    }
}

impl From<TransactionError> for Error {
    fn from(err: TransactionError) -> Self {
        Error::Transaction(err)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

/// Result type alias for TinyORM operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_helpers() {
        let err = Error::Constraint(ConstraintError {
            message: "UNIQUE constraint failed: account.id".to_string(),
            sql: Some("INSERT INTO account (id) VALUES (?)".to_string()),
        });

        assert!(err.is_constraint());
        assert_eq!(err.sql(), Some("INSERT INTO account (id) VALUES (?)"));
    }

    #[test]
    fn transaction_error_carries_both_failures() {
        let commit = Error::query("disk full");
        let rollback = Error::query("connection lost");
        let err = Error::Transaction(TransactionError::new(commit, Some(rollback)));

        let text = err.to_string();
        assert!(text.contains("disk full"));
        assert!(text.contains("connection lost"));
    }

    #[test]
    fn validation_missing_names_the_field() {
        let err = ValidationError::missing("balance");
        assert_eq!(err.field, "balance");
        assert!(err.message.contains("balance"));
    }
}

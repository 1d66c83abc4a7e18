//! Backend driver abstraction.
//!
//! Callers write SQL with `?` placeholders. Before a statement reaches the
//! backend, [`translate_placeholders`] rewrites each `?` to the marker the
//! driver reports, so the same SQL text works against backends with
//! positional (`$1`) or named markers.

use crate::Result;
use crate::row::Row;
use crate::value::Value;

/// A database backend, able to open physical connections.
///
/// The process-wide engine holds exactly one driver. Implementations carry
/// their own connection settings.
pub trait Driver: Send + Sync {
    /// Open a new physical connection.
    fn connect(&self) -> Result<Box<dyn DriverConnection>>;

    /// Short backend name for log messages.
    fn name(&self) -> &'static str;
}

/// One open physical connection to the backend.
///
/// Connections are owned by exactly one thread at a time, so the methods
/// take `&mut self` and the trait does not require `Sync`.
pub trait DriverConnection: Send {
    /// Run a statement that returns rows.
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Run a statement that returns an affected-row count.
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Commit the current transaction, if one is open.
    fn commit(&mut self) -> Result<()>;

    /// Roll back the current transaction, if one is open.
    fn rollback(&mut self) -> Result<()>;

    /// The parameter marker for the 1-based parameter `index`.
    fn param_marker(&self, index: usize) -> String {
        let _ = index;
        "?".to_string()
    }
}

/// Rewrite `?` placeholders to the connection's parameter markers.
///
/// Question marks inside single-quoted or double-quoted literals are left
/// alone. Returns the input unchanged (no allocation churn) when the marker
/// for every position is already `?`.
pub fn translate_placeholders(sql: &str, conn: &dyn DriverConnection) -> String {
    if conn.param_marker(1) == "?" {
        return sql.to_string();
    }

    let mut out = String::with_capacity(sql.len() + 8);
    let mut index = 0;
    let mut quote: Option<char> = None;
    for ch in sql.chars() {
        match quote {
            Some(q) => {
                out.push(ch);
                if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '\'' | '"' => {
                    quote = Some(ch);
                    out.push(ch);
                }
                '?' => {
                    index += 1;
                    out.push_str(&conn.param_marker(index));
                }
                _ => out.push(ch),
            },
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DollarConn;

    impl DriverConnection for DollarConn {
        fn query(&mut self, _sql: &str, _params: &[Value]) -> Result<Vec<Row>> {
            Ok(Vec::new())
        }

        fn execute(&mut self, _sql: &str, _params: &[Value]) -> Result<u64> {
            Ok(0)
        }

        fn commit(&mut self) -> Result<()> {
            Ok(())
        }

        fn rollback(&mut self) -> Result<()> {
            Ok(())
        }

        fn param_marker(&self, index: usize) -> String {
            format!("${index}")
        }
    }

    struct QuestionConn;

    impl DriverConnection for QuestionConn {
        fn query(&mut self, _sql: &str, _params: &[Value]) -> Result<Vec<Row>> {
            Ok(Vec::new())
        }

        fn execute(&mut self, _sql: &str, _params: &[Value]) -> Result<u64> {
            Ok(0)
        }

        fn commit(&mut self) -> Result<()> {
            Ok(())
        }

        fn rollback(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn rewrites_positional_markers() {
        let sql = "INSERT INTO user (id, name) VALUES (?, ?)";
        assert_eq!(
            translate_placeholders(sql, &DollarConn),
            "INSERT INTO user (id, name) VALUES ($1, $2)"
        );
    }

    #[test]
    fn leaves_quoted_question_marks_alone() {
        let sql = "SELECT * FROM note WHERE body = '?' AND id = ?";
        assert_eq!(
            translate_placeholders(sql, &DollarConn),
            "SELECT * FROM note WHERE body = '?' AND id = $1"
        );

        let sql = r#"SELECT "odd?col" FROM t WHERE x = ?"#;
        assert_eq!(
            translate_placeholders(sql, &DollarConn),
            r#"SELECT "odd?col" FROM t WHERE x = $1"#
        );
    }

    #[test]
    fn question_marker_passes_through() {
        let sql = "SELECT * FROM user WHERE id = ?";
        assert_eq!(translate_placeholders(sql, &QuestionConn), sql);
    }
}

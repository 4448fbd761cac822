//! The boundary between this crate and a wire-level database driver.
//!
//! A driver only has to provide two primitives: value escaping and execution of
//! an already compiled statement.

use std::fmt::Write as _;
use std::sync::Arc;

use thiserror::Error;

use crate::types::{DatabaseType, RowValues};

/// One raw tuple as returned by a driver: column name to scalar, in column order.
pub type RawTuple = Vec<(String, RowValues)>;

/// Escaping primitive exposed by a driver.
pub trait Escape: Send + Sync {
    /// Render `value` as a safely quoted SQL literal.
    fn escape(&self, value: &RowValues) -> String;

    /// The quote character wrapped around escaped text literals.
    fn escape_character(&self) -> char {
        '\''
    }

    /// Dialect the escaper renders for, when it is tied to one.
    fn database_type(&self) -> Option<DatabaseType> {
        None
    }
}

/// A synchronous driver able to run a final statement.
pub trait Driver {
    /// Escaper used to compile statements for this driver.
    fn escaper(&self) -> Arc<dyn Escape>;

    /// Execute a compiled statement.
    ///
    /// # Errors
    /// Returns the driver's error code and message when execution fails.
    fn execute(&mut self, sql: &str) -> Result<DriverResponse, DriverError>;
}

/// Rows and affected-row count returned by a successful execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriverResponse {
    pub rows: Vec<RawTuple>,
    pub affected_rows: usize,
}

impl DriverResponse {
    #[must_use]
    pub fn rows(rows: Vec<RawTuple>) -> Self {
        Self {
            rows,
            affected_rows: 0,
        }
    }

    #[must_use]
    pub fn affected(affected_rows: usize) -> Self {
        Self {
            rows: Vec::new(),
            affected_rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("driver error {code}: {message}")]
pub struct DriverError {
    pub code: i64,
    pub message: String,
}

impl DriverError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Built-in escaper selected by [`DatabaseType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DialectEscaper {
    pub database_type: DatabaseType,
}

impl DialectEscaper {
    #[must_use]
    pub fn new(database_type: DatabaseType) -> Self {
        Self { database_type }
    }

    fn escape_text(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len() + 2);
        out.push('\'');
        match self.database_type {
            DatabaseType::Mysql => {
                for ch in text.chars() {
                    match ch {
                        '\\' => out.push_str("\\\\"),
                        '\'' => out.push_str("\\'"),
                        '"' => out.push_str("\\\""),
                        '\0' => out.push_str("\\0"),
                        '\n' => out.push_str("\\n"),
                        '\r' => out.push_str("\\r"),
                        '\x1a' => out.push_str("\\Z"),
                        _ => out.push(ch),
                    }
                }
            }
            DatabaseType::Postgres | DatabaseType::Sqlite | DatabaseType::Mssql => {
                for ch in text.chars() {
                    if ch == '\'' {
                        out.push('\'');
                    }
                    out.push(ch);
                }
            }
        }
        out.push('\'');
        out
    }

    fn escape_blob(&self, bytes: &[u8]) -> String {
        let mut hex = String::with_capacity(bytes.len() * 2);
        for b in bytes {
            let _ = write!(hex, "{b:02X}");
        }
        match self.database_type {
            DatabaseType::Postgres => format!("'\\x{hex}'"),
            DatabaseType::Mssql => format!("0x{hex}"),
            DatabaseType::Sqlite | DatabaseType::Mysql => format!("X'{hex}'"),
        }
    }
}

impl Escape for DialectEscaper {
    fn database_type(&self) -> Option<DatabaseType> {
        Some(self.database_type)
    }

    fn escape(&self, value: &RowValues) -> String {
        match value {
            RowValues::Int(i) => i.to_string(),
            RowValues::Float(f) if f.is_finite() => f.to_string(),
            RowValues::Float(_) | RowValues::Null => "NULL".to_string(),
            RowValues::Bool(b) => match (self.database_type, b) {
                (DatabaseType::Postgres, true) => "TRUE".to_string(),
                (DatabaseType::Postgres, false) => "FALSE".to_string(),
                (_, true) => "1".to_string(),
                (_, false) => "0".to_string(),
            },
            RowValues::Text(s) => self.escape_text(s),
            RowValues::Timestamp(ts) => {
                self.escape_text(&ts.format("%Y-%m-%d %H:%M:%S%.f").to_string())
            }
            RowValues::JSON(json) => self.escape_text(&json.to_string()),
            RowValues::Blob(bytes) => self.escape_blob(bytes),
            RowValues::List(items) => escape_list(self, items),
        }
    }
}

/// Escape every element individually and join them as `(a,b,c)`.
pub(crate) fn escape_list(escaper: &(impl Escape + ?Sized), items: &[RowValues]) -> String {
    let parts: Vec<String> = items.iter().map(|item| escaper.escape(item)).collect();
    format!("({})", parts.join(","))
}

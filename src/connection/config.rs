use std::path::Path;

use serde::Deserialize;

use super::Connection;
use crate::driver::Driver;
use crate::error::SqlComposeError;
use crate::types::DatabaseType;

/// Table prefix rename applied to every statement before compilation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SwapPrefix {
    pub search: String,
    pub replace: String,
}

/// Options for a [`Connection`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectionOptions {
    pub database_type: DatabaseType,
    /// Positional marker; `None` disables bind substitution.
    pub bind_marker: Option<char>,
    /// Prepended to table names by the table builder.
    pub table_prefix: String,
    pub swap_prefix: Option<SwapPrefix>,
    /// Keep every executed query in memory.
    pub save_queries: bool,
    /// Decimal places used when logging execution time.
    pub duration_decimals: usize,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            database_type: DatabaseType::default(),
            bind_marker: Some('?'),
            table_prefix: String::new(),
            swap_prefix: None,
            save_queries: false,
            duration_decimals: 6,
        }
    }
}

impl ConnectionOptions {
    #[must_use]
    pub fn new(database_type: DatabaseType) -> Self {
        Self {
            database_type,
            ..Self::default()
        }
    }

    /// Parse options from JSON text. Missing fields take their defaults.
    ///
    /// # Errors
    /// Returns `SqlComposeError::ConfigError` if the text is not valid options JSON.
    pub fn from_json_str(text: &str) -> Result<Self, SqlComposeError> {
        serde_json::from_str(text)
            .map_err(|e| SqlComposeError::ConfigError(format!("invalid connection options: {e}")))
    }

    /// Read options from a JSON file.
    ///
    /// # Errors
    /// Returns `SqlComposeError::Io` if the file cannot be read and
    /// `SqlComposeError::ConfigError` if it cannot be parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SqlComposeError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    #[must_use]
    pub fn with_bind_marker(mut self, bind_marker: Option<char>) -> Self {
        self.bind_marker = bind_marker;
        self
    }

    #[must_use]
    pub fn with_table_prefix(mut self, table_prefix: impl Into<String>) -> Self {
        self.table_prefix = table_prefix.into();
        self
    }

    #[must_use]
    pub fn with_swap_prefix(mut self, search: impl Into<String>, replace: impl Into<String>) -> Self {
        self.swap_prefix = Some(SwapPrefix {
            search: search.into(),
            replace: replace.into(),
        });
        self
    }

    #[must_use]
    pub fn with_save_queries(mut self, save_queries: bool) -> Self {
        self.save_queries = save_queries;
        self
    }

    #[must_use]
    pub fn with_duration_decimals(mut self, duration_decimals: usize) -> Self {
        self.duration_decimals = duration_decimals;
        self
    }
}

/// Fluent builder for connection options.
#[derive(Debug, Clone, Default)]
pub struct ConnectionOptionsBuilder {
    opts: ConnectionOptions,
}

impl ConnectionOptionsBuilder {
    #[must_use]
    pub fn new(database_type: DatabaseType) -> Self {
        Self {
            opts: ConnectionOptions::new(database_type),
        }
    }

    #[must_use]
    pub fn bind_marker(mut self, bind_marker: Option<char>) -> Self {
        self.opts.bind_marker = bind_marker;
        self
    }

    #[must_use]
    pub fn table_prefix(mut self, table_prefix: impl Into<String>) -> Self {
        self.opts.table_prefix = table_prefix.into();
        self
    }

    #[must_use]
    pub fn swap_prefix(mut self, search: impl Into<String>, replace: impl Into<String>) -> Self {
        self.opts = self.opts.with_swap_prefix(search, replace);
        self
    }

    #[must_use]
    pub fn save_queries(mut self, save_queries: bool) -> Self {
        self.opts.save_queries = save_queries;
        self
    }

    #[must_use]
    pub fn duration_decimals(mut self, duration_decimals: usize) -> Self {
        self.opts.duration_decimals = duration_decimals;
        self
    }

    #[must_use]
    pub fn finish(self) -> ConnectionOptions {
        self.opts
    }

    /// Build a connection around `driver`.
    #[must_use]
    pub fn build<D: Driver>(self, driver: D) -> Connection<D> {
        Connection::new(driver, self.finish())
    }
}

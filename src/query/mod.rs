//! Statement compiler: a raw template plus bind values, compiled on demand into
//! the final escaped statement handed to a driver.

use std::fmt;
use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::driver::{DialectEscaper, Escape};
use crate::types::DatabaseType;

mod binds;

pub use binds::Binds;

static WRITE_SYNTAX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)^\s*"?(SET|INSERT|UPDATE|DELETE|REPLACE|CREATE|DROP|TRUNCATE|LOAD|COPY|ALTER|RENAME|GRANT|REVOKE|LOCK|UNLOCK|REINDEX)\s"#,
    )
    .expect("valid write syntax pattern")
});

/// One statement on its way to (and back from) the driver.
///
/// ```rust
/// use sql_compose::prelude::*;
///
/// let mut query = Query::with_dialect("SELECT * FROM t WHERE id = ?", DatabaseType::Postgres);
/// query.set_binds(vec![RowValues::Int(5)]);
/// assert_eq!(query.get_final_statement(), "SELECT * FROM t WHERE id = 5");
/// ```
#[derive(Clone)]
pub struct Query {
    original: String,
    binds: Binds,
    bind_marker: Option<char>,
    final_statement: Option<String>,
    escaper: Arc<dyn Escape>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    affected_rows: usize,
    // keyed by error code, in insertion order
    errors: Vec<(i64, String)>,
}

impl Query {
    pub fn new(template: impl Into<String>, escaper: Arc<dyn Escape>) -> Self {
        Self {
            original: template.into(),
            binds: Binds::default(),
            bind_marker: Some('?'),
            final_statement: None,
            escaper,
            start_time: None,
            end_time: None,
            affected_rows: 0,
            errors: Vec::new(),
        }
    }

    /// A query escaped with the built-in rules for `database_type`.
    pub fn with_dialect(template: impl Into<String>, database_type: DatabaseType) -> Self {
        Self::new(template, Arc::new(DialectEscaper::new(database_type)))
    }

    /// Replace the template and its binds.
    pub fn set_statement(&mut self, template: impl Into<String>, binds: impl Into<Binds>) -> &mut Self {
        self.original = template.into();
        self.set_binds(binds)
    }

    /// Replace the binds; the final statement is recompiled on next access.
    pub fn set_binds(&mut self, binds: impl Into<Binds>) -> &mut Self {
        self.binds = binds.into();
        self.final_statement = None;
        self
    }

    /// Positional marker character; `None` disables bind substitution.
    pub fn set_bind_marker(&mut self, marker: Option<char>) -> &mut Self {
        self.bind_marker = marker;
        self.final_statement = None;
        self
    }

    #[must_use]
    pub fn get_binds(&self) -> &Binds {
        &self.binds
    }

    #[must_use]
    pub fn get_original_statement(&self) -> &str {
        &self.original
    }

    /// The escaped, fully substituted statement. Compiled once per bind set.
    pub fn get_final_statement(&mut self) -> &str {
        if self.final_statement.is_none() {
            let compiled = binds::compile(
                &self.original,
                &self.binds,
                self.bind_marker,
                self.escaper.as_ref(),
            )
            .into_owned();
            tracing::debug!(statement = %compiled, "compiled statement");
            self.final_statement = Some(compiled);
        }
        self.final_statement.as_deref().unwrap_or(&self.original)
    }

    /// True when the template starts with a data- or schema-modifying keyword.
    #[must_use]
    pub fn is_write_syntax(&self) -> bool {
        WRITE_SYNTAX.is_match(&self.original)
    }

    /// Rename a table prefix wherever it follows a non-word character.
    ///
    /// Works on the final statement when it has been compiled, otherwise on the
    /// template, and stores the result as the final statement.
    pub fn swap_table_prefix(&mut self, search: &str, replace: &str) -> &mut Self {
        if search.is_empty() {
            return self;
        }
        let source = self.final_statement.as_deref().unwrap_or(&self.original);
        let pattern = format!(r"(\W){}(\S)", regex::escape(search));
        let swapped = match Regex::new(&pattern) {
            Ok(re) => re
                .replace_all(source, |caps: &regex::Captures<'_>| {
                    format!("{}{replace}{}", &caps[1], &caps[2])
                })
                .into_owned(),
            Err(err) => {
                tracing::warn!(%err, "table prefix pattern rejected");
                return self;
            }
        };
        self.final_statement = Some(swapped);
        self
    }

    /// Record when execution started and ended (`None` means now).
    pub fn set_duration(&mut self, start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> &mut Self {
        self.start_time = Some(start);
        self.end_time = Some(end.unwrap_or_else(Utc::now));
        self
    }

    #[must_use]
    pub fn get_start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    /// Elapsed seconds between start and end, formatted with `decimals` places.
    #[must_use]
    pub fn get_execution_duration(&self, decimals: usize) -> String {
        let seconds = match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => (end - start)
                .to_std()
                .map_or(0.0, |elapsed| elapsed.as_secs_f64()),
            _ => 0.0,
        };
        format!("{seconds:.decimals$}")
    }

    pub fn add_affected_rows(&mut self, rows: usize) -> &mut Self {
        self.affected_rows += rows;
        self
    }

    #[must_use]
    pub fn affected_rows(&self) -> usize {
        self.affected_rows
    }

    /// Record an error. A code seen before keeps its position and takes the
    /// new message.
    pub fn set_error(&mut self, code: i64, message: impl Into<String>) -> &mut Self {
        let message = message.into();
        if let Some(entry) = self.errors.iter_mut().find(|(c, _)| *c == code) {
            entry.1 = message;
        } else {
            self.errors.push((code, message));
        }
        self
    }

    #[must_use]
    pub fn has_error(&self) -> bool {
        !self.errors.is_empty()
    }

    /// The first recorded error code.
    #[must_use]
    pub fn get_error_code(&self) -> Option<i64> {
        self.errors.first().map(|(code, _)| *code)
    }

    /// The first recorded error message.
    #[must_use]
    pub fn get_error_message(&self) -> Option<&str> {
        self.errors.first().map(|(_, message)| message.as_str())
    }

    #[must_use]
    pub fn errors(&self) -> &[(i64, String)] {
        &self.errors
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("original", &self.original)
            .field("binds", &self.binds)
            .field("bind_marker", &self.bind_marker)
            .field("final_statement", &self.final_statement)
            .field("affected_rows", &self.affected_rows)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.final_statement.as_deref().unwrap_or(&self.original))
    }
}

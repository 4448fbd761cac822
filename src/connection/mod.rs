//! Runs compiled statements through a [`Driver`] and wraps what comes back.

use std::sync::Arc;

use chrono::Utc;

use crate::driver::{Driver, Escape};
use crate::query::{Binds, Query};
use crate::query_builder::TableBuilder;
use crate::results::ResultSet;
use crate::types::RowValues;

pub mod config;

pub use config::{ConnectionOptions, ConnectionOptionsBuilder, SwapPrefix};

/// The executed query together with the rows it produced.
///
/// Driver failures do not surface as `Err`: check [`QueryResult::has_error`].
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub query: Query,
    pub result_set: ResultSet,
}

impl QueryResult {
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.query.has_error()
    }

    #[must_use]
    pub fn error_code(&self) -> Option<i64> {
        self.query.get_error_code()
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.query.get_error_message()
    }

    #[must_use]
    pub fn affected_rows(&self) -> usize {
        self.query.affected_rows()
    }

    #[must_use]
    pub fn rows(&self) -> &ResultSet {
        &self.result_set
    }

    #[must_use]
    pub fn into_result_set(self) -> ResultSet {
        self.result_set
    }
}

/// A driver plus the options used to compile statements for it.
pub struct Connection<D: Driver> {
    driver: D,
    escaper: Arc<dyn Escape>,
    options: ConnectionOptions,
    last_query: Option<Query>,
    history: Vec<Query>,
}

impl<D: Driver> Connection<D> {
    /// Paging and builder rendering follow the escaper's dialect when it reports
    /// one, overriding `options.database_type`.
    #[must_use]
    pub fn new(driver: D, mut options: ConnectionOptions) -> Self {
        let escaper = driver.escaper();
        if let Some(dialect) = escaper.database_type()
            && dialect != options.database_type
        {
            tracing::warn!(
                configured = ?options.database_type,
                driver = ?dialect,
                "database type differs from the driver's dialect, using the driver's"
            );
            options.database_type = dialect;
        }
        Self {
            driver,
            escaper,
            options,
            last_query: None,
            history: Vec::new(),
        }
    }

    /// A query compiled with this connection's escaper and marker, not yet run.
    #[must_use]
    pub fn prepare(&self, sql: &str, binds: impl Into<Binds>) -> Query {
        let mut query = Query::new(sql, Arc::clone(&self.escaper));
        query
            .set_bind_marker(self.options.bind_marker)
            .set_binds(binds);
        query
    }

    /// Compile `sql` with `binds` and run it.
    pub fn query(&mut self, sql: &str, binds: impl Into<Binds>) -> QueryResult {
        let query = self.prepare(sql, binds);
        self.execute(query)
    }

    /// Run an already prepared query.
    pub fn execute(&mut self, mut query: Query) -> QueryResult {
        query.get_final_statement();
        if let Some(swap) = &self.options.swap_prefix {
            query.swap_table_prefix(&swap.search, &swap.replace);
        }
        let sql = query.get_final_statement().to_string();

        let start = Utc::now();
        let outcome = self.driver.execute(&sql);
        query.set_duration(start, None);

        let result_set = match outcome {
            Ok(response) => {
                query.add_affected_rows(response.affected_rows);
                ResultSet::from_tuples(response.rows)
            }
            Err(err) => {
                tracing::warn!(code = err.code, message = %err.message, statement = %sql, "query failed");
                query.set_error(err.code, err.message);
                ResultSet::default()
            }
        };

        tracing::debug!(
            statement = %sql,
            rows = result_set.count(),
            affected = query.affected_rows(),
            duration = %query.get_execution_duration(self.options.duration_decimals),
            "executed query"
        );

        if self.options.save_queries {
            self.history.push(query.clone());
        }
        self.last_query = Some(query.clone());
        QueryResult { query, result_set }
    }

    /// Fluent builder over `table`.
    pub fn table(&mut self, table: &str) -> TableBuilder<'_, D> {
        TableBuilder::new(self, table)
    }

    /// `table` with the configured prefix, applied once.
    #[must_use]
    pub fn prefix_table(&self, table: &str) -> String {
        let prefix = &self.options.table_prefix;
        if prefix.is_empty() || table.starts_with(prefix.as_str()) {
            table.to_string()
        } else {
            format!("{prefix}{table}")
        }
    }

    #[must_use]
    pub fn escape(&self, value: &RowValues) -> String {
        self.escaper.escape(value)
    }

    #[must_use]
    pub fn escaper(&self) -> Arc<dyn Escape> {
        Arc::clone(&self.escaper)
    }

    #[must_use]
    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    #[must_use]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// The most recently executed query.
    #[must_use]
    pub fn last_query(&self) -> Option<&Query> {
        self.last_query.as_ref()
    }

    /// Every executed query, oldest first. Empty unless `save_queries` is set.
    #[must_use]
    pub fn query_history(&self) -> &[Query] {
        &self.history
    }
}

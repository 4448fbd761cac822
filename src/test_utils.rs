//! In-memory driver for tests and benches.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::driver::{DialectEscaper, Driver, DriverError, DriverResponse, Escape, RawTuple};
use crate::types::{DatabaseType, RowValues};

/// Build a raw tuple from `(column, value)` pairs.
#[must_use]
pub fn tuple(pairs: &[(&str, RowValues)]) -> RawTuple {
    pairs
        .iter()
        .map(|(name, value)| ((*name).to_string(), value.clone()))
        .collect()
}

/// A driver that replays queued responses and records every statement it is
/// asked to run. With nothing queued it answers with an empty success.
#[derive(Debug, Clone)]
pub struct ScriptedDriver {
    escaper: Arc<DialectEscaper>,
    responses: VecDeque<Result<DriverResponse, DriverError>>,
    executed: Vec<String>,
}

impl Default for ScriptedDriver {
    fn default() -> Self {
        Self::new(DatabaseType::default())
    }
}

impl ScriptedDriver {
    #[must_use]
    pub fn new(database_type: DatabaseType) -> Self {
        Self {
            escaper: Arc::new(DialectEscaper::new(database_type)),
            responses: VecDeque::new(),
            executed: Vec::new(),
        }
    }

    pub fn push_rows(&mut self, rows: Vec<RawTuple>) -> &mut Self {
        self.responses.push_back(Ok(DriverResponse::rows(rows)));
        self
    }

    pub fn push_affected(&mut self, affected_rows: usize) -> &mut Self {
        self.responses
            .push_back(Ok(DriverResponse::affected(affected_rows)));
        self
    }

    pub fn push_error(&mut self, code: i64, message: impl Into<String>) -> &mut Self {
        self.responses.push_back(Err(DriverError::new(code, message)));
        self
    }

    /// Statements seen so far, oldest first.
    #[must_use]
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    /// Responses queued but not consumed yet.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.responses.len()
    }
}

impl Driver for ScriptedDriver {
    fn escaper(&self) -> Arc<dyn Escape> {
        self.escaper.clone()
    }

    fn execute(&mut self, sql: &str) -> Result<DriverResponse, DriverError> {
        self.executed.push(sql.to_string());
        self.responses
            .pop_front()
            .unwrap_or_else(|| Ok(DriverResponse::default()))
    }
}

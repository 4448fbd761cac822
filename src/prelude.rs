//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and traits
//! to make it easier to get started with the library.

pub use crate::builder::{BuilderCache, CacheValue, Clause, MergePolicy};
pub use crate::connection::{
    Connection, ConnectionOptions, ConnectionOptionsBuilder, QueryResult, SwapPrefix,
};
pub use crate::driver::{DialectEscaper, Driver, DriverError, DriverResponse, Escape, RawTuple};
pub use crate::error::SqlComposeError;
pub use crate::query::{Binds, Query};
pub use crate::query_builder::{Direction, JoinKind, TableBuilder};
pub use crate::results::{
    ByteSerializable, Countable, ResultSet, Row, Seekable, SettableFields,
};
pub use crate::types::{DatabaseType, RowValues};

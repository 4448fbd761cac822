//! Client-side SQL construction and result decoding.
//!
//! A [`Query`] compiles a statement template plus bind values into the final
//! escaped SQL handed to a [`Driver`]. [`TableBuilder`] accumulates clauses in a
//! [`BuilderCache`] and renders them into statements. Raw driver tuples come back
//! as a [`ResultSet`] of [`Row`]s whose text payloads are classified (JSON,
//! legacy-serialized, raw) on every read.
//!
//! ```rust
//! use sql_compose::prelude::*;
//!
//! let mut query = Query::with_dialect(
//!     "SELECT * FROM t WHERE id = ? AND name = ?",
//!     DatabaseType::Sqlite,
//! );
//! query.set_binds(vec![RowValues::Int(5), RowValues::from("O'Brien")]);
//! assert_eq!(
//!     query.get_final_statement(),
//!     "SELECT * FROM t WHERE id = 5 AND name = 'O''Brien'"
//! );
//! ```

pub mod builder;
pub mod connection;
pub mod driver;
pub mod error;
pub mod legacy;
pub mod prelude;
pub mod query;
pub mod query_builder;
pub mod results;
pub mod scan;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use builder::{BuilderCache, CacheValue, Clause, MergePolicy};
pub use connection::{Connection, ConnectionOptions, ConnectionOptionsBuilder, QueryResult};
pub use driver::{DialectEscaper, Driver, DriverError, DriverResponse, Escape, RawTuple};
pub use error::SqlComposeError;
pub use query::{Binds, Query};
pub use query_builder::{Direction, JoinKind, TableBuilder};
pub use results::{ResultSet, Row};
pub use types::{DatabaseType, RowValues};

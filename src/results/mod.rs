//! Rows and result sets produced by one query execution.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::SqlComposeError;
use crate::types::RowValues;

mod result_set;
mod row;

pub use result_set::ResultSet;
pub use row::Row;

/// Something with a number of elements.
pub trait Countable {
    fn count(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// Stateful cursor with clamping seeks.
///
/// `seek` never fails: positions below zero land on the first element, positions
/// past the end land on the last one.
pub trait Seekable {
    type Item;

    fn seek(&mut self, position: isize);
    fn current(&self) -> &Self::Item;
    fn key(&self) -> usize;
    fn valid(&self) -> bool;
    fn rewind(&mut self);
    fn move_next(&mut self);
    fn move_previous(&mut self);
}

/// Opaque byte form for caching or shipping a value elsewhere.
pub trait ByteSerializable: Sized {
    /// # Errors
    /// Returns `SqlComposeError::Serialization` if encoding fails.
    fn to_bytes(&self) -> Result<Vec<u8>, SqlComposeError>;

    /// # Errors
    /// Returns `SqlComposeError::Serialization` if `bytes` is not a valid encoding.
    fn from_bytes(bytes: &[u8]) -> Result<Self, SqlComposeError>;
}

impl<T: Serialize + DeserializeOwned> ByteSerializable for T {
    fn to_bytes(&self) -> Result<Vec<u8>, SqlComposeError> {
        Ok(serde_json::to_vec(self)?)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, SqlComposeError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Target of explicit row mapping: receives every column by name.
///
/// ```rust
/// use sql_compose::prelude::*;
///
/// #[derive(Default)]
/// struct User {
///     id: i64,
///     name: String,
/// }
///
/// impl SettableFields for User {
///     fn set_field(&mut self, name: &str, value: RowValues) {
///         match name {
///             "id" => self.id = value.as_int().copied().unwrap_or_default(),
///             "name" => self.name = value.as_text().unwrap_or_default().to_string(),
///             _ => {}
///         }
///     }
/// }
///
/// let row = Row::from_tuple(vec![
///     ("id".to_string(), RowValues::Int(7)),
///     ("name".to_string(), RowValues::Text("ana".into())),
/// ]);
/// let user: User = row.fetch_into();
/// assert_eq!(user.id, 7);
/// ```
pub trait SettableFields {
    fn set_field(&mut self, name: &str, value: RowValues);
}

use std::fmt;
use std::ops::Index;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::row::empty_row;
use super::{Countable, Row, Seekable, SettableFields};
use crate::driver::RawTuple;
use crate::error::SqlComposeError;
use crate::types::RowValues;

/// A result set from one query execution
///
/// Holds the rows returned ("found rows") and, separately, the number of rows
/// the query would match without pagination ("total rows"). The stateful cursor
/// (see [`Seekable`]) is not part of the data: it is not serialized and does not
/// take part in equality. [`ResultSet::iter`] hands out independent cursors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultSet {
    /// The rows returned by the query
    rows: Vec<Row>,
    /// Rows available ignoring pagination, when known
    total_rows: Option<usize>,
    #[serde(skip)]
    position: usize,
}

impl PartialEq for ResultSet {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows && self.total_rows == other.total_rows
    }
}

impl ResultSet {
    #[must_use]
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            total_rows: None,
            position: 0,
        }
    }

    /// Wrap raw driver tuples. Consecutive tuples with identical columns share
    /// one column list.
    #[must_use]
    pub fn from_tuples(tuples: Vec<RawTuple>) -> Self {
        let mut rows = Vec::with_capacity(tuples.len());
        let mut shared: Option<Arc<Vec<String>>> = None;

        for tuple in tuples {
            let (names, values): (Vec<String>, Vec<RowValues>) = tuple.into_iter().unzip();
            let column_names = match shared.take() {
                Some(prev) if *prev == names => prev,
                _ => Arc::new(names),
            };
            shared = Some(column_names.clone());
            rows.push(Row::new(column_names, values));
        }

        Self::new(rows)
    }

    /// Number of rows present ("found rows").
    #[must_use]
    pub fn count(&self) -> usize {
        self.rows.len()
    }

    /// Rows available ignoring pagination. Defaults to [`ResultSet::count`].
    #[must_use]
    pub fn count_all(&self) -> usize {
        self.total_rows.unwrap_or(self.rows.len())
    }

    /// Record the unpaginated total, typically from a separate `COUNT(*)`.
    pub fn set_total_rows(&mut self, total_rows: usize) -> &mut Self {
        self.total_rows = Some(total_rows);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// First row, or an empty row when there is none.
    #[must_use]
    pub fn first(&self) -> &Row {
        self.rows.first().unwrap_or(empty_row())
    }

    /// Last row, or an empty row when there is none.
    #[must_use]
    pub fn last(&self) -> &Row {
        self.rows.last().unwrap_or(empty_row())
    }

    /// Independent iterator; does not touch the stateful cursor.
    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    #[must_use]
    pub fn to_array(&self) -> Vec<Vec<(String, RowValues)>> {
        self.rows.iter().map(Row::to_pairs).collect()
    }

    #[must_use]
    pub fn to_json_value(&self) -> JsonValue {
        JsonValue::Array(self.rows.iter().map(Row::to_json_value).collect())
    }

    /// JSON array of row objects.
    ///
    /// # Errors
    /// Returns `SqlComposeError::Serialization` if rendering fails.
    pub fn to_json(&self, pretty: bool) -> Result<String, SqlComposeError> {
        let value = self.to_json_value();
        if pretty {
            Ok(serde_json::to_string_pretty(&value)?)
        } else {
            Ok(serde_json::to_string(&value)?)
        }
    }

    /// Map every row onto a fresh `T`.
    #[must_use]
    pub fn fetch_all_into<T: SettableFields + Default>(&self) -> Vec<T> {
        self.rows.iter().map(Row::fetch_into).collect()
    }

    fn clamp_to(&mut self, position: usize) {
        if let Some(last) = self.rows.len().checked_sub(1) {
            self.position = position.min(last);
        }
    }
}

impl Countable for ResultSet {
    fn count(&self) -> usize {
        ResultSet::count(self)
    }
}

impl Seekable for ResultSet {
    type Item = Row;

    fn seek(&mut self, position: isize) {
        self.clamp_to(usize::try_from(position).unwrap_or(0));
    }

    fn current(&self) -> &Row {
        self.rows.get(self.position).unwrap_or(empty_row())
    }

    fn key(&self) -> usize {
        self.position
    }

    fn valid(&self) -> bool {
        self.position < self.rows.len()
    }

    fn rewind(&mut self) {
        self.position = 0;
    }

    /// Steps one row forward; stepping off the end leaves the cursor invalid.
    fn move_next(&mut self) {
        self.position = (self.position + 1).min(self.rows.len());
    }

    fn move_previous(&mut self) {
        self.clamp_to(self.position.saturating_sub(1));
    }
}

/// Out-of-range indexes yield the shared empty row instead of panicking.
impl Index<usize> for ResultSet {
    type Output = Row;

    fn index(&self, index: usize) -> &Row {
        self.rows.get(index).unwrap_or(empty_row())
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl IntoIterator for ResultSet {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl fmt::Display for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::ByteSerializable;

    fn tuples(n: i64) -> Vec<RawTuple> {
        (1..=n)
            .map(|i| {
                vec![
                    ("id".to_string(), RowValues::Int(i)),
                    ("name".to_string(), RowValues::Text(format!("user-{i}"))),
                ]
            })
            .collect()
    }

    #[test]
    fn counts_found_and_total_rows() {
        let mut rs = ResultSet::from_tuples(tuples(3));
        assert_eq!(rs.count(), 3);
        assert_eq!(rs.count_all(), 3);
        rs.set_total_rows(42);
        assert_eq!(rs.count_all(), 42);
        assert_eq!(rs.count(), 3);
    }

    #[test]
    fn seek_clamps_into_range() {
        let mut rs = ResultSet::from_tuples(tuples(3));
        rs.seek(-1);
        assert_eq!(rs.key(), 0);
        rs.seek(3);
        assert_eq!(rs.key(), 2);
        assert_eq!(rs.current().get("id"), RowValues::Int(3));
        rs.move_previous();
        assert_eq!(rs.key(), 1);
    }

    #[test]
    fn next_past_last_invalidates_cursor() {
        let mut rs = ResultSet::from_tuples(tuples(2));
        assert!(rs.valid());
        rs.move_next();
        assert!(rs.valid());
        rs.move_next();
        assert!(!rs.valid());
        assert!(rs.current().is_empty());
        rs.move_previous();
        assert_eq!(rs.key(), 1);
    }

    #[test]
    fn empty_set_returns_sentinel_rows() {
        let mut rs = ResultSet::default();
        rs.seek(5);
        assert_eq!(rs.key(), 0);
        assert!(rs.is_empty());
        assert!(rs.first().is_empty());
        assert!(rs.last().is_empty());
        assert_eq!(rs.current().get("id"), RowValues::Null);
    }

    #[test]
    fn indexing_past_the_end_yields_empty_row() {
        let rs = ResultSet::from_tuples(tuples(2));
        assert_eq!(rs[1].get("id"), RowValues::Int(2));
        assert!(rs[2].is_empty());
        assert!(ResultSet::default()[0].is_empty());
    }

    #[test]
    fn rows_with_same_columns_share_names() {
        let rs = ResultSet::from_tuples(tuples(2));
        assert!(std::ptr::eq(rs[0].fields(), rs[1].fields()));
    }

    #[test]
    fn byte_form_restores_rows_and_total() {
        let mut rs = ResultSet::from_tuples(tuples(3));
        rs.set_total_rows(10);
        rs.seek(2);
        let restored = ResultSet::from_bytes(&rs.to_bytes().expect("encodes")).expect("decodes");
        assert_eq!(restored, rs);
        assert_eq!(restored.key(), 0);
        assert_eq!(restored[1].get("name"), RowValues::Text("user-2".into()));
    }

    #[test]
    fn byte_form_keeps_non_finite_floats() {
        let rs = ResultSet::from_tuples(vec![vec![
            ("hi".to_string(), RowValues::Float(f64::INFINITY)),
            ("lo".to_string(), RowValues::Float(f64::NEG_INFINITY)),
            ("x".to_string(), RowValues::Float(0.5)),
        ]]);
        let restored = ResultSet::from_bytes(&rs.to_bytes().expect("encodes")).expect("decodes");
        assert_eq!(restored, rs);

        let nan = ResultSet::from_tuples(vec![vec![("v".to_string(), RowValues::Float(f64::NAN))]]);
        let restored = ResultSet::from_bytes(&nan.to_bytes().expect("encodes")).expect("decodes");
        assert!(matches!(restored[0].raw("v"), Some(RowValues::Float(f)) if f.is_nan()));
    }

    #[test]
    fn iteration_is_independent_of_cursor() {
        let mut rs = ResultSet::from_tuples(tuples(3));
        rs.seek(2);
        let ids: Vec<RowValues> = rs.iter().map(|r| r.get("id")).collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(rs.key(), 2);
    }

    #[test]
    fn renders_json_array() {
        let rs = ResultSet::from_tuples(tuples(1));
        assert_eq!(rs.to_string(), r#"[{"id":1,"name":"user-1"}]"#);
    }
}

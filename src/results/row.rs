use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::SettableFields;
use crate::driver::RawTuple;
use crate::error::SqlComposeError;
use crate::legacy;
use crate::types::RowValues;

static EMPTY_ROW: LazyLock<Row> = LazyLock::new(Row::empty);

pub(crate) fn empty_row() -> &'static Row {
    &EMPTY_ROW
}

/// A row from a query result
///
/// Column names keep the order the driver returned them in. Values are stored
/// raw; [`Row::get`] classifies text payloads (JSON, legacy-serialized) on every
/// read without caching the decoded form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "RowRepr", into = "RowRepr")]
pub struct Row {
    /// The column names for this row (shared across rows of a result set)
    column_names: Arc<Vec<String>>,
    /// The values for this row
    values: Vec<RowValues>,
    // Internal cache for faster column lookups (to avoid repeated string comparisons)
    column_index_cache: Arc<HashMap<String, usize>>,
}

#[derive(Serialize, Deserialize)]
struct RowRepr {
    columns: Vec<String>,
    values: Vec<RowValues>,
}

impl From<RowRepr> for Row {
    fn from(repr: RowRepr) -> Self {
        Row::new(Arc::new(repr.columns), repr.values)
    }
}

impl From<Row> for RowRepr {
    fn from(row: Row) -> Self {
        RowRepr {
            columns: Arc::unwrap_or_clone(row.column_names),
            values: row.values,
        }
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.column_names == other.column_names && self.values == other.values
    }
}

impl Row {
    /// Create a new row
    ///
    /// # Arguments
    ///
    /// * `column_names` - The column names
    /// * `values` - The values for this row, in column order
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<RowValues>) -> Self {
        let cache = Arc::new(build_index(&column_names));
        Self {
            column_names,
            values,
            column_index_cache: cache,
        }
    }

    /// Build a row from a raw driver tuple.
    #[must_use]
    pub fn from_tuple(tuple: RawTuple) -> Self {
        let (names, values): (Vec<String>, Vec<RowValues>) = tuple.into_iter().unzip();
        Self::new(Arc::new(names), values)
    }

    /// A row without columns, returned when a result set has nothing to show.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Arc::new(Vec::new()), Vec::new())
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        self.column_index_cache.get(column_name).copied()
    }

    /// Read a column, decoding JSON-like and legacy-serialized text.
    ///
    /// Absent columns read as [`RowValues::Null`].
    #[must_use]
    pub fn get(&self, column_name: &str) -> RowValues {
        self.raw(column_name).map_or(RowValues::Null, classify)
    }

    /// Read a column exactly as stored, without classification.
    #[must_use]
    pub fn raw(&self, column_name: &str) -> Option<&RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a raw value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }

    /// Assign a column, appending it when the row does not have it yet.
    pub fn set(&mut self, column_name: &str, value: impl Into<RowValues>) {
        let value = value.into();
        if let Some(idx) = self.get_column_index(column_name) {
            self.values[idx] = value;
            return;
        }
        let idx = self.values.len();
        Arc::make_mut(&mut self.column_names).push(column_name.to_string());
        Arc::make_mut(&mut self.column_index_cache).insert(column_name.to_string(), idx);
        self.values.push(value);
    }

    #[must_use]
    pub fn has(&self, column_name: &str) -> bool {
        self.column_index_cache.contains_key(column_name)
    }

    /// Remove a column. Unknown names are ignored.
    pub fn unset(&mut self, column_name: &str) {
        let Some(idx) = self.get_column_index(column_name) else {
            return;
        };
        Arc::make_mut(&mut self.column_names).remove(idx);
        self.values.remove(idx);
        self.column_index_cache = Arc::new(build_index(&self.column_names));
    }

    /// Column names in order.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.column_names
    }

    /// Raw values in column order.
    #[must_use]
    pub fn values(&self) -> &[RowValues] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Column/raw-value pairs in order.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(String, RowValues)> {
        self.column_names
            .iter()
            .cloned()
            .zip(self.values.iter().cloned())
            .collect()
    }

    #[must_use]
    pub fn to_json_value(&self) -> JsonValue {
        let map: Map<String, JsonValue> = self
            .column_names
            .iter()
            .zip(&self.values)
            .map(|(name, value)| (name.clone(), value.to_json_value()))
            .collect();
        JsonValue::Object(map)
    }

    /// JSON object of all fields.
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

    /// All fields written in the legacy serialization format.
    #[must_use]
    pub fn to_serialized_form(&self) -> String {
        legacy::encode(&self.to_json_value())
    }

    /// Hand every column, classified as by [`Row::get`], to `f`.
    pub fn apply<F>(&self, mut f: F)
    where
        F: FnMut(&str, RowValues),
    {
        for (name, value) in self.column_names.iter().zip(&self.values) {
            f(name, classify(value));
        }
    }

    /// Map this row onto a fresh `T`.
    #[must_use]
    pub fn fetch_into<T: SettableFields + Default>(&self) -> T {
        let mut target = T::default();
        self.apply(|name, value| target.set_field(name, value));
        target
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json_value())
    }
}

fn build_index(column_names: &[String]) -> HashMap<String, usize> {
    column_names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), i))
        .collect()
}

/// Read-time classification of a stored value.
fn classify(value: &RowValues) -> RowValues {
    let RowValues::Text(text) = value else {
        return value.clone();
    };
    let trimmed = text.trim();

    if looks_like_json(trimmed)
        && let Ok(decoded) = serde_json::from_str::<JsonValue>(trimmed)
    {
        return from_decoded(decoded);
    }

    if legacy::is_serialized(trimmed)
        && let Ok(decoded) = legacy::decode(trimmed)
    {
        return from_decoded(decoded);
    }

    value.clone()
}

fn looks_like_json(text: &str) -> bool {
    matches!(
        (text.as_bytes().first(), text.as_bytes().last()),
        (Some(b'{'), Some(b'}')) | (Some(b'['), Some(b']'))
    )
}

fn from_decoded(decoded: JsonValue) -> RowValues {
    match decoded {
        JsonValue::Null => RowValues::Null,
        JsonValue::Bool(b) => RowValues::Bool(b),
        JsonValue::String(s) => RowValues::Text(s),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => RowValues::Int(i),
            None => n.as_f64().map_or(RowValues::Null, RowValues::Float),
        },
        container => RowValues::JSON(container),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Row {
        Row::from_tuple(vec![
            ("id".to_string(), RowValues::Int(1)),
            ("meta".to_string(), RowValues::Text(r#" {"a":1,"b":[1,2]} "#.into())),
            ("prefs".to_string(), RowValues::Text("a:1:{s:4:\"dark\";b:1;}".into())),
            ("note".to_string(), RowValues::Text("not json {".into())),
        ])
    }

    #[test]
    fn json_text_decodes_on_read() {
        let row = sample();
        let meta = row.get("meta");
        assert_eq!(meta.as_json().and_then(|m| m.get("a")), Some(&json!(1)));
        // storage is untouched
        assert!(matches!(row.raw("meta"), Some(RowValues::Text(_))));
    }

    #[test]
    fn legacy_text_decodes_on_read() {
        let row = sample();
        assert_eq!(row.get("prefs"), RowValues::JSON(json!({"dark": true})));
    }

    #[test]
    fn near_misses_come_back_raw() {
        let row = sample();
        assert_eq!(row.get("note"), RowValues::Text("not json {".into()));

        let mut row = Row::empty();
        row.set("broken", "{\"a\":}");
        row.set("fake", "s:9:\"abc\";");
        assert_eq!(row.get("broken"), RowValues::Text("{\"a\":}".into()));
        assert_eq!(row.get("fake"), RowValues::Text("s:9:\"abc\";".into()));
    }

    #[test]
    fn malformed_legacy_lengths_come_back_raw() {
        let mut row = sample();
        let text = "s:18446744073709551615:\"x\";";
        row.set("blob", text);
        assert_eq!(row.get("blob"), RowValues::Text(text.into()));
    }

    #[test]
    fn deeply_nested_legacy_text_comes_back_raw() {
        let mut row = sample();
        let text = format!("{}N;{}", "a:1:{i:0;".repeat(200_000), "}".repeat(200_000));
        row.set("tree", text.as_str());
        assert_eq!(row.get("tree"), RowValues::Text(text));
    }

    #[test]
    fn absent_column_is_null() {
        assert_eq!(sample().get("missing"), RowValues::Null);
        assert!(sample().raw("missing").is_none());
    }

    #[test]
    fn set_has_unset_keep_order() {
        let mut row = sample();
        row.set("extra", 5);
        row.set("id", 2);
        assert!(row.has("extra"));
        assert_eq!(row.fields(), ["id", "meta", "prefs", "note", "extra"]);
        assert_eq!(row.get("id"), RowValues::Int(2));

        row.unset("meta");
        assert!(!row.has("meta"));
        assert_eq!(row.fields(), ["id", "prefs", "note", "extra"]);
        assert_eq!(row.get("extra"), RowValues::Int(5));
    }

    #[test]
    fn set_on_shared_columns_does_not_leak() {
        let names = Arc::new(vec!["a".to_string()]);
        let mut first = Row::new(names.clone(), vec![RowValues::Int(1)]);
        let second = Row::new(names, vec![RowValues::Int(2)]);
        first.set("b", 3);
        assert_eq!(second.fields(), ["a"]);
    }

    #[test]
    fn renders_json_and_legacy() {
        let row = Row::from_tuple(vec![
            ("id".to_string(), RowValues::Int(3)),
            ("name".to_string(), RowValues::Text("x".into())),
        ]);
        assert_eq!(row.to_string(), r#"{"id":3,"name":"x"}"#);
        assert_eq!(
            row.to_serialized_form(),
            "a:2:{s:2:\"id\";i:3;s:4:\"name\";s:1:\"x\";}"
        );
    }
}

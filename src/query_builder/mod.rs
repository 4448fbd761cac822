use crate::builder::{BuilderCache, Clause, set_entry};
use crate::connection::Connection;
use crate::driver::Driver;
use crate::types::{DatabaseType, RowValues};

mod dml;
mod select;

/// Join flavour for [`TableBuilder::join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL OUTER JOIN",
        }
    }
}

/// Sort direction for [`TableBuilder::order_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// Fluent builder over one table of a [`Connection`].
///
/// Clause methods accumulate fragments in a [`BuilderCache`]; values are
/// escaped through the connection's escaper as they are stored. Reads
/// (`get`, `count_all_results`) clear the read-path clauses afterwards, writes
/// (`insert`, `update`, `delete`) clear the write-path clauses.
///
/// ```rust
/// use std::sync::Arc;
/// use sql_compose::prelude::*;
///
/// struct Offline;
///
/// impl Driver for Offline {
///     fn escaper(&self) -> Arc<dyn Escape> {
///         Arc::new(DialectEscaper::new(DatabaseType::Sqlite))
///     }
///
///     fn execute(&mut self, _sql: &str) -> Result<DriverResponse, DriverError> {
///         Ok(DriverResponse::default())
///     }
/// }
///
/// let mut conn = Connection::new(Offline, ConnectionOptions::default());
/// let mut users = conn.table("users");
/// users
///     .select("id, name")
///     .where_eq("active", true)
///     .order_by("name", Direction::Asc)
///     .limit(10);
/// assert_eq!(
///     users.compile_select(),
///     "SELECT id, name FROM users WHERE active = 1 ORDER BY name ASC LIMIT 10"
/// );
/// ```
pub struct TableBuilder<'conn, D: Driver> {
    conn: &'conn mut Connection<D>,
    table: String,
    cache: BuilderCache,
}

impl<'conn, D: Driver> TableBuilder<'conn, D> {
    pub(crate) fn new(conn: &'conn mut Connection<D>, table: &str) -> Self {
        Self {
            conn,
            table: table.to_string(),
            cache: BuilderCache::new(),
        }
    }

    /// Comma-separated column list; repeated calls add columns.
    pub fn select(&mut self, columns: &str) -> &mut Self {
        let columns: Vec<RowValues> = split_columns(columns)
            .into_iter()
            .map(RowValues::from)
            .collect();
        self.cache.store_clause(Clause::Select, RowValues::List(columns));
        self
    }

    pub fn distinct(&mut self, distinct: bool) -> &mut Self {
        self.cache.store_clause(Clause::Distinct, distinct);
        self
    }

    /// Read from an additional table.
    pub fn from(&mut self, table: &str) -> &mut Self {
        let table = self.conn.prefix_table(table);
        self.cache.store_clause(Clause::From, table);
        self
    }

    pub fn join(&mut self, table: &str, on: &str, kind: JoinKind) -> &mut Self {
        let fragment = format!("{} {} ON {on}", kind.keyword(), self.conn.prefix_table(table));
        self.cache.store_clause(Clause::Join, fragment);
        self
    }

    /// `column = value`, or `column IS NULL` for a null value.
    pub fn where_eq(&mut self, column: &str, value: impl Into<RowValues>) -> &mut Self {
        self.where_op(column, "=", value)
    }

    pub fn where_op(&mut self, column: &str, op: &str, value: impl Into<RowValues>) -> &mut Self {
        let fragment = self.comparison(column, op, &value.into());
        self.cache.store_clause(Clause::Where, fragment);
        self
    }

    /// A filter fragment used verbatim.
    pub fn where_raw(&mut self, fragment: &str) -> &mut Self {
        self.cache.store_clause(Clause::Where, fragment);
        self
    }

    pub fn or_where(&mut self, column: &str, value: impl Into<RowValues>) -> &mut Self {
        let fragment = self.comparison(column, "=", &value.into());
        self.cache.store_clause(Clause::OrWhere, fragment);
        self
    }

    pub fn where_in(&mut self, column: &str, values: Vec<RowValues>) -> &mut Self {
        let fragment = self.membership(column, &values);
        self.cache.store_clause(Clause::WhereIn, fragment);
        self
    }

    pub fn or_where_in(&mut self, column: &str, values: Vec<RowValues>) -> &mut Self {
        let fragment = self.membership(column, &values);
        self.cache.store_clause(Clause::OrWhereIn, fragment);
        self
    }

    pub fn group_by(&mut self, column: &str) -> &mut Self {
        self.cache.store_clause(Clause::GroupBy, column);
        self
    }

    /// A `HAVING` fragment used verbatim; repeated calls are joined with `AND`.
    pub fn having(&mut self, fragment: &str) -> &mut Self {
        self.cache.store_clause(Clause::Having, fragment);
        self
    }

    pub fn order_by(&mut self, column: &str, direction: Direction) -> &mut Self {
        let suffix = match direction {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        };
        self.cache
            .store_clause(Clause::OrderBy, format!("{column} {suffix}"));
        self
    }

    pub fn limit(&mut self, limit: usize) -> &mut Self {
        self.cache.store_clause(Clause::Limit, to_int(limit));
        self
    }

    pub fn offset(&mut self, offset: usize) -> &mut Self {
        self.cache.store_clause(Clause::Offset, to_int(offset));
        self
    }

    /// Queue a column assignment for `insert`/`update`.
    pub fn set(&mut self, column: &str, value: impl Into<RowValues>) -> &mut Self {
        let escaped = self.conn.escape(&value.into());
        self.cache.store_clause(Clause::Sets, set_entry(column, escaped));
        self
    }

    /// The table name as written into SQL.
    #[must_use]
    pub fn table(&self) -> String {
        self.conn.prefix_table(&self.table)
    }

    #[must_use]
    pub fn cache(&self) -> &BuilderCache {
        &self.cache
    }

    /// The last statement this builder ran.
    #[must_use]
    pub fn last_statement(&self) -> &str {
        self.cache.get_statement()
    }

    /// Drop every pending clause.
    pub fn reset(&mut self) -> &mut Self {
        self.cache.reset();
        self
    }

    fn database_type(&self) -> DatabaseType {
        self.conn.options().database_type
    }

    fn comparison(&self, column: &str, op: &str, value: &RowValues) -> String {
        match (value, op.trim()) {
            (RowValues::Null, "=") => format!("{column} IS NULL"),
            (RowValues::Null, "!=" | "<>") => format!("{column} IS NOT NULL"),
            (value, op) => format!("{column} {op} {}", self.conn.escape(value)),
        }
    }

    fn membership(&self, column: &str, values: &[RowValues]) -> String {
        if values.is_empty() {
            // an empty IN list is a syntax error on most backends
            return "0 = 1".to_string();
        }
        let list = self.conn.escape(&RowValues::List(values.to_vec()));
        format!("{column} IN {list}")
    }

    fn texts(&self, clause: Clause) -> Vec<&str> {
        self.cache
            .list(clause)
            .iter()
            .filter_map(RowValues::as_text)
            .collect()
    }

    /// ` WHERE ...`: AND-ed filters first, then each OR filter.
    fn where_clause(&self) -> String {
        let mut filter = self.texts(Clause::Where);
        filter.extend(self.texts(Clause::WhereIn));
        let mut rendered = filter.join(" AND ");

        for alternative in self
            .texts(Clause::OrWhere)
            .into_iter()
            .chain(self.texts(Clause::OrWhereIn))
        {
            if rendered.is_empty() {
                rendered.push_str(alternative);
            } else {
                rendered.push_str(" OR ");
                rendered.push_str(alternative);
            }
        }

        if rendered.is_empty() {
            rendered
        } else {
            format!(" WHERE {rendered}")
        }
    }

    fn has_filter(&self) -> bool {
        [
            Clause::Where,
            Clause::OrWhere,
            Clause::WhereIn,
            Clause::OrWhereIn,
        ]
        .into_iter()
        .any(|clause| !self.cache.clause(clause).is_unset())
    }

    fn limit_value(&self) -> Option<i64> {
        self.cache
            .clause(Clause::Limit)
            .as_value()
            .and_then(RowValues::as_int)
            .copied()
    }

    fn offset_value(&self) -> Option<i64> {
        self.cache
            .clause(Clause::Offset)
            .as_value()
            .and_then(RowValues::as_int)
            .copied()
    }
}

/// Split on commas outside parentheses.
fn split_columns(columns: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, b) in columns.bytes().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                parts.push(columns[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(columns[start..].trim());
    parts.retain(|part| !part.is_empty());
    parts
}

fn to_int(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

//! Clause accumulator behind the table builder.
//!
//! Every clause has a fixed [`MergePolicy`]: sequence clauses append in
//! insertion order (that order is the emission order in SQL), flag clauses
//! take the boolean coercion of the last write, value clauses are replaced.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::SqlComposeError;
use crate::types::RowValues;

/// How a write merges into the current clause value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Push onto the list; a list payload is appended element-wise.
    Append,
    /// Overwrite with the new value.
    Replace,
    /// Overwrite with the truthiness of the new value.
    Boolean,
}

/// The known clause names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Clause {
    Select,
    From,
    Join,
    Where,
    OrWhere,
    WhereIn,
    OrWhereIn,
    Having,
    GroupBy,
    OrderBy,
    Limit,
    Offset,
    Sets,
    Distinct,
}

impl Clause {
    pub const ALL: [Clause; 14] = [
        Clause::Select,
        Clause::From,
        Clause::Join,
        Clause::Where,
        Clause::OrWhere,
        Clause::WhereIn,
        Clause::OrWhereIn,
        Clause::Having,
        Clause::GroupBy,
        Clause::OrderBy,
        Clause::Limit,
        Clause::Offset,
        Clause::Sets,
        Clause::Distinct,
    ];

    /// Clauses cleared after a read.
    const GETTER: [Clause; 13] = [
        Clause::Select,
        Clause::From,
        Clause::Join,
        Clause::Where,
        Clause::OrWhere,
        Clause::WhereIn,
        Clause::OrWhereIn,
        Clause::Having,
        Clause::GroupBy,
        Clause::OrderBy,
        Clause::Limit,
        Clause::Offset,
        Clause::Distinct,
    ];

    /// Clauses cleared after a write.
    const MODIFIER: [Clause; 6] = [
        Clause::Sets,
        Clause::Where,
        Clause::OrWhere,
        Clause::WhereIn,
        Clause::OrWhereIn,
        Clause::Limit,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Clause::Select => "select",
            Clause::From => "from",
            Clause::Join => "join",
            Clause::Where => "where",
            Clause::OrWhere => "orWhere",
            Clause::WhereIn => "whereIn",
            Clause::OrWhereIn => "orWhereIn",
            Clause::Having => "having",
            Clause::GroupBy => "groupBy",
            Clause::OrderBy => "orderBy",
            Clause::Limit => "limit",
            Clause::Offset => "offset",
            Clause::Sets => "sets",
            Clause::Distinct => "distinct",
        }
    }

    #[must_use]
    pub fn merge_policy(self) -> MergePolicy {
        match self {
            Clause::Limit | Clause::Offset => MergePolicy::Replace,
            Clause::Distinct => MergePolicy::Boolean,
            _ => MergePolicy::Append,
        }
    }

    #[must_use]
    pub fn default_value(self) -> CacheValue {
        match self.merge_policy() {
            MergePolicy::Append => CacheValue::List(Vec::new()),
            MergePolicy::Boolean => CacheValue::Flag(false),
            MergePolicy::Replace => CacheValue::Value(RowValues::Null),
        }
    }
}

impl FromStr for Clause {
    type Err = SqlComposeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Clause::ALL
            .into_iter()
            .find(|clause| clause.name() == s)
            .ok_or_else(|| SqlComposeError::Builder(format!("unknown clause `{s}`")))
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Current value of one clause.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    List(Vec<RowValues>),
    Flag(bool),
    Value(RowValues),
}

impl CacheValue {
    /// List items; empty for flag and value clauses.
    #[must_use]
    pub fn as_list(&self) -> &[RowValues] {
        match self {
            CacheValue::List(items) => items,
            _ => &[],
        }
    }

    #[must_use]
    pub fn as_flag(&self) -> bool {
        match self {
            CacheValue::Flag(flag) => *flag,
            CacheValue::List(items) => !items.is_empty(),
            CacheValue::Value(value) => value.is_truthy(),
        }
    }

    #[must_use]
    pub fn as_value(&self) -> Option<&RowValues> {
        match self {
            CacheValue::Value(RowValues::Null) => None,
            CacheValue::Value(value) => Some(value),
            _ => None,
        }
    }

    /// True when the clause holds its default.
    #[must_use]
    pub fn is_unset(&self) -> bool {
        match self {
            CacheValue::List(items) => items.is_empty(),
            CacheValue::Flag(flag) => !flag,
            CacheValue::Value(value) => value.is_null(),
        }
    }
}

/// Accumulated clause fragments for one statement under construction.
#[derive(Debug, Clone, PartialEq)]
pub struct BuilderCache {
    clauses: HashMap<Clause, CacheValue>,
    statement: Option<String>,
}

impl Default for BuilderCache {
    fn default() -> Self {
        Self::new()
    }
}

impl BuilderCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            clauses: Clause::ALL
                .into_iter()
                .map(|clause| (clause, clause.default_value()))
                .collect(),
            statement: None,
        }
    }

    /// Store into a clause by name. Unknown names are ignored.
    pub fn store(&mut self, name: &str, value: impl Into<RowValues>) -> &mut Self {
        match name.parse::<Clause>() {
            Ok(clause) => self.store_clause(clause, value),
            Err(_) => {
                tracing::trace!(clause = name, "ignoring write to unknown clause");
                self
            }
        }
    }

    /// Store into a clause following its merge policy.
    pub fn store_clause(&mut self, clause: Clause, value: impl Into<RowValues>) -> &mut Self {
        let value = value.into();
        let slot = self
            .clauses
            .entry(clause)
            .or_insert_with(|| clause.default_value());

        match clause.merge_policy() {
            MergePolicy::Append => {
                if !matches!(slot, CacheValue::List(_)) {
                    *slot = clause.default_value();
                }
                if let CacheValue::List(items) = slot {
                    match value {
                        RowValues::List(values) => items.extend(values),
                        value => items.push(value),
                    }
                }
            }
            MergePolicy::Boolean => *slot = CacheValue::Flag(value.is_truthy()),
            MergePolicy::Replace => *slot = CacheValue::Value(value),
        }
        self
    }

    /// Clause value by name; `None` for unknown names.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CacheValue> {
        name.parse::<Clause>().ok().map(|clause| self.clause(clause))
    }

    #[must_use]
    pub fn clause(&self, clause: Clause) -> &CacheValue {
        // every clause is seeded in `new`
        &self.clauses[&clause]
    }

    #[must_use]
    pub fn list(&self, clause: Clause) -> &[RowValues] {
        self.clause(clause).as_list()
    }

    /// Pending `(column, escaped value)` pairs for insert/update.
    #[must_use]
    pub fn sets(&self) -> Vec<(&str, &str)> {
        self.list(Clause::Sets)
            .iter()
            .filter_map(|entry| match entry.as_list()? {
                [column, value] => Some((column.as_text()?, value.as_text()?)),
                _ => None,
            })
            .collect()
    }

    /// Clear everything, the recorded statement included.
    pub fn reset(&mut self) {
        self.reset_clauses(&Clause::ALL);
        self.statement = None;
    }

    /// Clear the read-path clauses.
    pub fn reset_getter(&mut self) {
        self.reset_clauses(&Clause::GETTER);
    }

    /// Clear the write-path clauses.
    pub fn reset_modifier(&mut self) {
        self.reset_clauses(&Clause::MODIFIER);
    }

    pub fn set_statement(&mut self, statement: impl Into<String>) -> &mut Self {
        self.statement = Some(statement.into());
        self
    }

    /// The last recorded statement, empty if none.
    #[must_use]
    pub fn get_statement(&self) -> &str {
        self.statement.as_deref().unwrap_or("")
    }

    fn reset_clauses(&mut self, clauses: &[Clause]) {
        for clause in clauses {
            self.clauses.insert(*clause, clause.default_value());
        }
    }
}

/// Encode a `sets` entry so that appending keeps the pair together.
pub(crate) fn set_entry(column: &str, escaped: String) -> RowValues {
    RowValues::List(vec![RowValues::List(vec![
        RowValues::Text(column.to_string()),
        RowValues::Text(escaped),
    ])])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_clauses_append_in_order() {
        let mut cache = BuilderCache::new();
        cache
            .store("select", "id")
            .store("select", RowValues::List(vec!["name".into(), "email".into()]))
            .store("orderBy", "id ASC");
        assert_eq!(
            cache.list(Clause::Select),
            [
                RowValues::Text("id".into()),
                RowValues::Text("name".into()),
                RowValues::Text("email".into()),
            ]
        );
        assert_eq!(cache.list(Clause::OrderBy).len(), 1);
    }

    #[test]
    fn unknown_clause_is_a_no_op() {
        let mut cache = BuilderCache::new();
        let before = cache.clone();
        cache.store("whereNotIn", "x").store("Select", "y");
        assert_eq!(cache, before);
        assert!(cache.get("whereNotIn").is_none());
    }

    #[test]
    fn flags_coerce_and_values_replace() {
        let mut cache = BuilderCache::new();
        cache.store("distinct", 1);
        assert_eq!(cache.get("distinct"), Some(&CacheValue::Flag(true)));
        cache.store("distinct", "");
        assert_eq!(cache.get("distinct"), Some(&CacheValue::Flag(false)));

        cache.store("limit", 10).store("limit", 20);
        assert_eq!(cache.clause(Clause::Limit).as_value(), Some(&RowValues::Int(20)));
    }

    #[test]
    fn getter_reset_keeps_sets() {
        let mut cache = BuilderCache::new();
        cache
            .store("where", "id = 1")
            .store("limit", 1)
            .store("orderBy", "id")
            .store_clause(Clause::Sets, set_entry("name", "'x'".into()));
        cache.reset_getter();
        assert!(cache.clause(Clause::Where).is_unset());
        assert!(cache.clause(Clause::OrderBy).is_unset());
        assert!(cache.clause(Clause::Limit).is_unset());
        assert_eq!(cache.sets(), [("name", "'x'")]);
    }

    #[test]
    fn modifier_reset_keeps_read_clauses() {
        let mut cache = BuilderCache::new();
        cache
            .store("select", "id")
            .store("orderBy", "id")
            .store("whereIn", "id IN (1,2)")
            .store("limit", 5)
            .store_clause(Clause::Sets, set_entry("name", "'x'".into()));
        cache.reset_modifier();
        assert!(cache.sets().is_empty());
        assert!(cache.clause(Clause::WhereIn).is_unset());
        assert!(cache.clause(Clause::Limit).is_unset());
        assert_eq!(cache.list(Clause::Select).len(), 1);
        assert_eq!(cache.list(Clause::OrderBy).len(), 1);
    }

    #[test]
    fn full_reset_clears_statement() {
        let mut cache = BuilderCache::new();
        cache.set_statement("SELECT 1").store("from", "t");
        assert_eq!(cache.get_statement(), "SELECT 1");
        cache.reset_getter();
        assert_eq!(cache.get_statement(), "SELECT 1");
        cache.reset();
        assert_eq!(cache.get_statement(), "");
        assert_eq!(cache, BuilderCache::new());
    }

    #[test]
    fn sets_keep_pairs_together() {
        let mut cache = BuilderCache::new();
        cache
            .store_clause(Clause::Sets, set_entry("a", "1".into()))
            .store_clause(Clause::Sets, set_entry("b", "'two'".into()));
        assert_eq!(cache.sets(), [("a", "1"), ("b", "'two'")]);
    }

    #[test]
    fn clause_names_round_trip() {
        for clause in Clause::ALL {
            assert_eq!(clause.name().parse::<Clause>().ok(), Some(clause));
        }
    }
}

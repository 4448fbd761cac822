use crate::connection::QueryResult;
use crate::driver::Driver;
use crate::error::SqlComposeError;
use crate::query::Binds;
use crate::types::DatabaseType;

use super::TableBuilder;

impl<D: Driver> TableBuilder<'_, D> {
    /// Render an `INSERT` of the queued sets.
    ///
    /// # Errors
    /// Returns `SqlComposeError::Builder` when no column was set.
    pub fn compile_insert(&self) -> Result<String, SqlComposeError> {
        let sets = self.cache.sets();
        if sets.is_empty() {
            return Err(SqlComposeError::Builder(
                "insert needs at least one set column".into(),
            ));
        }
        let (columns, values): (Vec<&str>, Vec<&str>) = sets.into_iter().unzip();
        Ok(format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table(),
            columns.join(", "),
            values.join(", ")
        ))
    }

    /// Render an `UPDATE` of the queued sets under the pending filters.
    ///
    /// # Errors
    /// Returns `SqlComposeError::Builder` when no column was set.
    pub fn compile_update(&self) -> Result<String, SqlComposeError> {
        let sets = self.cache.sets();
        if sets.is_empty() {
            return Err(SqlComposeError::Builder(
                "update needs at least one set column".into(),
            ));
        }
        let assignments: Vec<String> = sets
            .into_iter()
            .map(|(column, value)| format!("{column} = {value}"))
            .collect();
        Ok(format!(
            "UPDATE {} SET {}{}{}",
            self.table(),
            assignments.join(", "),
            self.where_clause(),
            self.write_limit()
        ))
    }

    /// Render a `DELETE` under the pending filters.
    ///
    /// # Errors
    /// Returns `SqlComposeError::Builder` when there is no filter, rather than
    /// emptying the table.
    pub fn compile_delete(&self) -> Result<String, SqlComposeError> {
        if !self.has_filter() {
            return Err(SqlComposeError::Builder(
                "delete needs a filter; use a raw query to empty a table".into(),
            ));
        }
        Ok(format!(
            "DELETE FROM {}{}{}",
            self.table(),
            self.where_clause(),
            self.write_limit()
        ))
    }

    /// Run the insert, then clear the write-path clauses.
    ///
    /// # Errors
    /// Returns `SqlComposeError::Builder` when no column was set. Driver
    /// failures are reported on the returned [`QueryResult`].
    pub fn insert(&mut self) -> Result<QueryResult, SqlComposeError> {
        let sql = self.compile_insert()?;
        Ok(self.run_write(sql))
    }

    /// Run the update, then clear the write-path clauses.
    ///
    /// # Errors
    /// Returns `SqlComposeError::Builder` when no column was set.
    pub fn update(&mut self) -> Result<QueryResult, SqlComposeError> {
        let sql = self.compile_update()?;
        Ok(self.run_write(sql))
    }

    /// Run the delete, then clear the write-path clauses.
    ///
    /// # Errors
    /// Returns `SqlComposeError::Builder` when there is no filter.
    pub fn delete(&mut self) -> Result<QueryResult, SqlComposeError> {
        let sql = self.compile_delete()?;
        Ok(self.run_write(sql))
    }

    fn run_write(&mut self, sql: String) -> QueryResult {
        self.cache.reset_modifier();
        let result = self.conn.query(&sql, Binds::default());
        self.cache.set_statement(sql);
        result
    }

    // only MySQL accepts LIMIT on UPDATE/DELETE without extra build options
    fn write_limit(&self) -> String {
        match (self.database_type(), self.limit_value()) {
            (DatabaseType::Mysql, Some(limit)) => format!(" LIMIT {limit}"),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::Clause;
    use crate::connection::{Connection, ConnectionOptions};
    use crate::error::SqlComposeError;
    use crate::test_utils::ScriptedDriver;
    use crate::types::{DatabaseType, RowValues};

    fn conn(database_type: DatabaseType) -> Connection<ScriptedDriver> {
        Connection::new(
            ScriptedDriver::new(database_type),
            ConnectionOptions::new(database_type),
        )
    }

    #[test]
    fn insert_renders_sets_in_order() {
        let mut conn = conn(DatabaseType::Sqlite);
        conn.driver_mut().push_affected(1);
        let mut b = conn.table("users");
        b.set("name", "O'Brien").set("age", 40).set("nick", RowValues::Null);
        let result = b.insert().unwrap();
        assert_eq!(result.affected_rows(), 1);
        assert_eq!(
            b.last_statement(),
            "INSERT INTO users (name, age, nick) VALUES ('O''Brien', 40, NULL)"
        );
        assert!(b.cache().sets().is_empty());
    }

    #[test]
    fn update_keeps_read_clauses_but_clears_filters() {
        let mut conn = conn(DatabaseType::Mysql);
        let mut b = conn.table("users");
        b.select("id")
            .set("active", false)
            .where_eq("id", 3)
            .limit(1);
        b.update().unwrap();
        assert_eq!(
            b.last_statement(),
            "UPDATE users SET active = 0 WHERE id = 3 LIMIT 1"
        );
        assert!(b.cache().clause(Clause::Where).is_unset());
        assert_eq!(b.cache().list(Clause::Select).len(), 1);
    }

    #[test]
    fn update_without_sets_is_refused() {
        let mut conn = conn(DatabaseType::Sqlite);
        let mut b = conn.table("users");
        b.where_eq("id", 1);
        assert!(matches!(b.update(), Err(SqlComposeError::Builder(_))));
        drop(b);
        assert!(conn.driver().executed().is_empty());
    }

    #[test]
    fn delete_requires_a_filter() {
        let mut conn = conn(DatabaseType::Postgres);
        let mut b = conn.table("sessions");
        assert!(matches!(b.delete(), Err(SqlComposeError::Builder(_))));

        b.where_op("expires_at", "<", "2024-01-01").limit(10);
        b.delete().unwrap();
        assert_eq!(
            b.last_statement(),
            "DELETE FROM sessions WHERE expires_at < '2024-01-01'"
        );
    }

    #[test]
    fn driver_failure_stays_on_the_result() {
        let mut conn = conn(DatabaseType::Sqlite);
        conn.driver_mut().push_error(19, "UNIQUE constraint failed");
        let mut b = conn.table("users");
        b.set("id", 1);
        let result = b.insert().unwrap();
        assert_eq!(result.error_code(), Some(19));
        assert!(b.cache().sets().is_empty());
    }
}

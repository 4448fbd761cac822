use crate::builder::Clause;
use crate::connection::QueryResult;
use crate::driver::Driver;
use crate::query::Binds;
use crate::types::{DatabaseType, RowValues};

use super::TableBuilder;

const COUNT_COLUMN: &str = "numrows";

impl<D: Driver> TableBuilder<'_, D> {
    /// Render the pending read as SQL without running it.
    #[must_use]
    pub fn compile_select(&self) -> String {
        self.render_select(true)
    }

    /// Render an unpaginated `COUNT(*)` over the same filters.
    #[must_use]
    pub fn compile_count(&self) -> String {
        let grouped = !self.cache.list(Clause::GroupBy).is_empty();
        if grouped || self.cache.clause(Clause::Distinct).as_flag() {
            format!(
                "SELECT COUNT(*) AS {COUNT_COLUMN} FROM ({}) count_subquery",
                self.render_select(false)
            )
        } else {
            format!(
                "SELECT COUNT(*) AS {COUNT_COLUMN}{}{}",
                self.from_clause(),
                self.where_clause()
            )
        }
    }

    /// Run the pending read, then clear the read-path clauses.
    pub fn get(&mut self) -> QueryResult {
        let sql = self.compile_select();
        self.run_read(sql)
    }

    /// Like [`TableBuilder::get`], additionally setting the result's total row
    /// count from a `COUNT(*)` without limit and offset.
    pub fn get_with_total(&mut self) -> QueryResult {
        let count_sql = self.compile_count();
        let mut result = self.get();
        if result.has_error() {
            return result;
        }

        let counted = self.conn.query(&count_sql, Binds::default());
        match counted.error_code() {
            Some(code) => {
                let message = counted.error_message().unwrap_or_default().to_string();
                result.query.set_error(code, message);
            }
            None => {
                result.result_set.set_total_rows(count_of(&counted));
            }
        }
        result
    }

    /// Rows matching the pending filters, ignoring limit and offset. Clears the
    /// read-path clauses. A failed count reads as 0; the error is on
    /// [`Connection::last_query`](crate::connection::Connection::last_query).
    pub fn count_all_results(&mut self) -> usize {
        let sql = self.compile_count();
        let counted = self.run_read(sql);
        count_of(&counted)
    }

    fn run_read(&mut self, sql: String) -> QueryResult {
        self.cache.reset_getter();
        let result = self.conn.query(&sql, Binds::default());
        self.cache.set_statement(sql);
        result
    }

    fn from_clause(&self) -> String {
        let mut tables = vec![self.table()];
        tables.extend(self.texts(Clause::From).into_iter().map(str::to_string));

        let mut sql = format!(" FROM {}", tables.join(", "));
        for join in self.texts(Clause::Join) {
            sql.push(' ');
            sql.push_str(join);
        }
        sql
    }

    fn render_select(&self, paged: bool) -> String {
        let mut sql = String::from("SELECT ");
        if self.cache.clause(Clause::Distinct).as_flag() {
            sql.push_str("DISTINCT ");
        }

        let columns = self.texts(Clause::Select);
        if columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&columns.join(", "));
        }

        sql.push_str(&self.from_clause());
        sql.push_str(&self.where_clause());

        let group_by = self.texts(Clause::GroupBy);
        if !group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&group_by.join(", "));
        }

        let having = self.texts(Clause::Having);
        if !having.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&having.join(" AND "));
        }

        if paged {
            let paging = self.paging();
            let order_by = self.texts(Clause::OrderBy);
            if !order_by.is_empty() {
                sql.push_str(" ORDER BY ");
                sql.push_str(&order_by.join(", "));
            } else if !paging.is_empty() && self.database_type() == DatabaseType::Mssql {
                // OFFSET/FETCH needs an ORDER BY
                sql.push_str(" ORDER BY (SELECT NULL)");
            }
            sql.push_str(&paging);
        }
        sql
    }

    fn paging(&self) -> String {
        let limit = self.limit_value();
        let offset = self.offset_value();
        match (self.database_type(), limit, offset) {
            (_, None, None) => String::new(),
            (DatabaseType::Mssql, limit, offset) => {
                let mut sql = format!(" OFFSET {} ROWS", offset.unwrap_or(0));
                if let Some(limit) = limit {
                    sql.push_str(&format!(" FETCH NEXT {limit} ROWS ONLY"));
                }
                sql
            }
            (_, Some(limit), None) => format!(" LIMIT {limit}"),
            (_, Some(limit), Some(offset)) => format!(" LIMIT {limit} OFFSET {offset}"),
            (DatabaseType::Postgres, None, Some(offset)) => format!(" OFFSET {offset}"),
            (DatabaseType::Mysql, None, Some(offset)) => {
                format!(" LIMIT 18446744073709551615 OFFSET {offset}")
            }
            (DatabaseType::Sqlite, None, Some(offset)) => format!(" LIMIT -1 OFFSET {offset}"),
        }
    }
}

fn count_of(result: &QueryResult) -> usize {
    match result.rows().first().get(COUNT_COLUMN) {
        RowValues::Int(n) => usize::try_from(n).unwrap_or(0),
        RowValues::Text(text) => text.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use crate::connection::{Connection, ConnectionOptions};
    use crate::query_builder::Direction;
    use crate::test_utils::{ScriptedDriver, tuple};
    use crate::types::{DatabaseType, RowValues};

    fn conn(database_type: DatabaseType) -> Connection<ScriptedDriver> {
        Connection::new(
            ScriptedDriver::new(database_type),
            ConnectionOptions::new(database_type),
        )
    }

    #[test]
    fn full_select_clause_order() {
        let mut conn = conn(DatabaseType::Postgres);
        let mut b = conn.table("orders");
        b.distinct(true)
            .select("customer_id, COUNT(*) AS n")
            .where_op("total", ">", 10)
            .group_by("customer_id")
            .having("COUNT(*) > 1")
            .order_by("n", Direction::Desc)
            .limit(5)
            .offset(10);
        assert_eq!(
            b.compile_select(),
            "SELECT DISTINCT customer_id, COUNT(*) AS n FROM orders WHERE total > 10 \
             GROUP BY customer_id HAVING COUNT(*) > 1 ORDER BY n DESC LIMIT 5 OFFSET 10"
        );
    }

    #[test]
    fn paging_per_dialect() {
        let render = |database_type, limit: Option<usize>, offset: Option<usize>| {
            let mut conn = conn(database_type);
            let mut b = conn.table("t");
            if let Some(limit) = limit {
                b.limit(limit);
            }
            if let Some(offset) = offset {
                b.offset(offset);
            }
            b.compile_select()
        };
        assert_eq!(
            render(DatabaseType::Sqlite, None, Some(3)),
            "SELECT * FROM t LIMIT -1 OFFSET 3"
        );
        assert_eq!(
            render(DatabaseType::Postgres, None, Some(3)),
            "SELECT * FROM t OFFSET 3"
        );
        assert_eq!(
            render(DatabaseType::Mssql, Some(2), Some(4)),
            "SELECT * FROM t ORDER BY (SELECT NULL) OFFSET 4 ROWS FETCH NEXT 2 ROWS ONLY"
        );
        assert_eq!(
            render(DatabaseType::Mysql, Some(2), None),
            "SELECT * FROM t LIMIT 2"
        );
    }

    #[test]
    fn count_skips_paging_and_wraps_groups() {
        let mut conn = conn(DatabaseType::Sqlite);
        let mut b = conn.table("t");
        b.where_eq("a", 1).order_by("a", Direction::Asc).limit(5);
        assert_eq!(
            b.compile_count(),
            "SELECT COUNT(*) AS numrows FROM t WHERE a = 1"
        );
        b.group_by("a");
        assert_eq!(
            b.compile_count(),
            "SELECT COUNT(*) AS numrows FROM (SELECT * FROM t WHERE a = 1 GROUP BY a) count_subquery"
        );
    }

    #[test]
    fn get_resets_read_clauses() {
        let mut conn = conn(DatabaseType::Sqlite);
        conn.driver_mut()
            .push_rows(vec![tuple(&[("id", RowValues::Int(1))])]);
        let mut b = conn.table("t");
        b.where_eq("id", 1).limit(1);
        let result = b.get();
        assert_eq!(result.rows().count(), 1);
        assert_eq!(b.last_statement(), "SELECT * FROM t WHERE id = 1 LIMIT 1");
        assert_eq!(b.compile_select(), "SELECT * FROM t");
    }

    #[test]
    fn get_with_total_sets_count_all() {
        let mut conn = conn(DatabaseType::Sqlite);
        conn.driver_mut()
            .push_rows(vec![
                tuple(&[("id", RowValues::Int(1))]),
                tuple(&[("id", RowValues::Int(2))]),
            ])
            .push_rows(vec![tuple(&[("numrows", RowValues::Text("42".into()))])]);
        let mut b = conn.table("t");
        b.where_op("id", ">", 0).limit(2);
        let result = b.get_with_total();
        assert_eq!(result.rows().count(), 2);
        assert_eq!(result.rows().count_all(), 42);
        drop(b);
        assert_eq!(
            conn.driver().executed(),
            [
                "SELECT * FROM t WHERE id > 0 LIMIT 2",
                "SELECT COUNT(*) AS numrows FROM t WHERE id > 0",
            ]
        );
    }

    #[test]
    fn failed_count_is_reported_on_result() {
        let mut conn = conn(DatabaseType::Sqlite);
        conn.driver_mut()
            .push_rows(Vec::new())
            .push_error(1, "no such table");
        let result = conn.table("t").get_with_total();
        assert_eq!(result.error_code(), Some(1));
        assert_eq!(result.rows().count_all(), 0);
    }

    #[test]
    fn count_all_results_reads_numrows() {
        let mut conn = conn(DatabaseType::Sqlite);
        conn.driver_mut()
            .push_rows(vec![tuple(&[("numrows", RowValues::Int(7))])])
            .push_error(1, "boom");
        let mut b = conn.table("t");
        assert_eq!(b.count_all_results(), 7);
        assert_eq!(b.count_all_results(), 0);
    }
}

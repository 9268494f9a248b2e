use super::QueryBuilder;
use crate::error::OrmResult;

impl QueryBuilder {
    /// Compile `DELETE FROM (`table`)` with the accumulated WHERE and LIMIT.
    pub fn build_delete(&mut self, table: &str) -> OrmResult<String> {
        self.stmt.add_from(table);
        self.build_delete_from_state()
    }

    /// Compile a DELETE over the tables already given to `from`.
    ///
    /// Fails with a usage error when no table has been specified.
    pub fn build_delete_from_state(&mut self) -> OrmResult<String> {
        self.require_from("delete from")?;
        let sql = format!(
            "DELETE{}{}{}",
            self.stmt.from_clause(),
            self.stmt.where_clause(),
            self.stmt.limit_clause()
        );
        Ok(self.finish(sql))
    }
}

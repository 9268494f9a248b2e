use super::QueryBuilder;
use super::insert::set_clause;
use crate::error::OrmResult;
use crate::value::Record;

impl QueryBuilder {
    /// Compile `UPDATE `table` SET ...` with the accumulated WHERE and LIMIT.
    pub fn build_update(&mut self, table: &str, record: &Record) -> OrmResult<String> {
        let sql = format!(
            "UPDATE {}{}{}{}",
            self.stmt.protect(table.trim()),
            set_clause(&self.stmt, record)?,
            self.stmt.where_clause(),
            self.stmt.limit_clause()
        );
        Ok(self.finish(sql))
    }
}

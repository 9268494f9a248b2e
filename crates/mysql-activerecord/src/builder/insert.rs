use super::QueryBuilder;
use super::statement::Statement;
use crate::error::{OrmError, OrmResult};
use crate::value::Record;

/// Leading keyword(s) of an INSERT statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertVerb {
    #[default]
    Insert,
    InsertIgnore,
}

impl InsertVerb {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::InsertIgnore => "INSERT IGNORE",
        }
    }
}

/// Render ` SET col=val, ...` for `record`.
///
/// Structured (JSON) values are left out of the list.
pub(crate) fn set_clause(stmt: &Statement, record: &Record) -> OrmResult<String> {
    let assignments = record
        .iter()
        .filter(|(_, value)| !value.is_structured())
        .map(|(column, value)| format!("{}={}", stmt.protect(column), value.to_sql_literal()))
        .collect::<Vec<_>>();

    if assignments.is_empty() {
        return Err(OrmError::usage("no scalar columns to SET"));
    }
    Ok(format!(" SET {}", assignments.join(", ")))
}

impl QueryBuilder {
    /// Compile `{verb} into `table` SET ...`, followed by `suffix` when non-empty.
    ///
    /// `suffix` is appended verbatim (e.g. `ON DUPLICATE KEY UPDATE n = n + 1`).
    pub fn build_insert(
        &mut self,
        verb: InsertVerb,
        table: &str,
        record: &Record,
        suffix: &str,
    ) -> OrmResult<String> {
        let mut sql = format!(
            "{} into {}{}",
            verb.as_sql(),
            self.stmt.protect(table.trim()),
            set_clause(&self.stmt, record)?
        );
        let suffix = suffix.trim();
        if !suffix.is_empty() {
            sql.push(' ');
            sql.push_str(suffix);
        }
        Ok(self.finish(sql))
    }

    /// Compile a multi-row `{verb} INTO `table` (cols) VALUES (...),(...)`.
    ///
    /// Columns come from the first row; every other row must have exactly the
    /// same columns. Returns `Ok(None)` for an empty row list.
    pub fn build_insert_batch(
        &mut self,
        verb: InsertVerb,
        table: &str,
        rows: &[Record],
    ) -> OrmResult<Option<String>> {
        let Some(first) = rows.first() else {
            return Ok(None);
        };
        let columns: Vec<&str> = first.columns().collect();
        if columns.is_empty() {
            return Err(OrmError::usage(format!(
                "cannot use batch insert into {table} - the first row has no columns"
            )));
        }

        let mut tuples = Vec::with_capacity(rows.len());
        for row in rows {
            let values = columns
                .iter()
                .map(|column| row.get(column).map(|v| v.to_sql_literal()))
                .collect::<Option<Vec<_>>>()
                .filter(|_| row.len() == columns.len());

            match values {
                Some(values) => tuples.push(format!("({})", values.join(","))),
                None => {
                    return Err(OrmError::usage(format!(
                        "cannot use batch insert into {table} - fields must match on all rows ({} vs {})",
                        row.columns().collect::<Vec<_>>().join(","),
                        columns.join(","),
                    )));
                }
            }
        }

        let protected = columns
            .iter()
            .map(|c| self.stmt.protect(c))
            .collect::<Vec<_>>();
        let sql = format!(
            "{} INTO {} ({}) VALUES {}",
            verb.as_sql(),
            self.stmt.protect(table.trim()),
            protected.join(", "),
            tuples.join(",")
        );
        Ok(Some(self.finish(sql)))
    }
}

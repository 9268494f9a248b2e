//! ActiveRecord-style statement builder.
//!
//! Clause methods (from [`ClauseBuilder`]) accumulate pre-rendered SQL
//! fragments on a [`Statement`]. A `build_*` call compiles them into one SQL
//! string, resets the statement and returns the string; the same builder is
//! then ready for the next statement.
//!
//! ```
//! use mysql_activerecord::builder::{ClauseBuilder, QueryBuilder};
//!
//! let mut qb = QueryBuilder::new();
//! qb.select("id, name").where_eq("status", "active").limit(10);
//! let sql = qb.build_get("users").unwrap();
//! assert_eq!(
//!     sql,
//!     "SELECT `id`, `name` FROM (`users`) WHERE `status` = 'active' LIMIT 10"
//! );
//! assert!(qb.statement().is_empty());
//! assert_eq!(qb.last_query(), sql);
//! ```

pub mod delete;
pub mod insert;
pub mod statement;
pub mod traits;
pub mod update;
pub mod where_builder;

pub use insert::InsertVerb;
pub use statement::{Aggregate, JoinDirection, Statement};
pub use traits::{ClauseBuilder, IntoClause};
pub use where_builder::{Connective, LikeSide};

use crate::error::{OrmError, OrmResult};
use crate::value::Operand;

/// What kind of statement a terminal operation dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Count,
    Insert,
    Update,
    Delete,
    /// Caller-supplied SQL
    Raw,
}

impl StatementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Count => "count",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Raw => "raw",
        }
    }
}

/// Driver-independent statement builder.
///
/// Holds one [`Statement`] and turns it into SQL text. [`Adapter`](crate::Adapter)
/// wraps this and hands the SQL to a driver.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    stmt: Statement,
}

impl ClauseBuilder for QueryBuilder {
    fn statement(&self) -> &Statement {
        &self.stmt
    }

    fn statement_mut(&mut self) -> &mut Statement {
        &mut self.stmt
    }
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently compiled statement.
    pub fn last_query(&self) -> &str {
        self.stmt.last_query()
    }

    /// Discard accumulated clauses without compiling anything.
    pub fn reset(&mut self) {
        let last = std::mem::take(&mut self.stmt.last_query);
        self.stmt.reset(last);
    }

    /// Preview the SELECT that [`build_get_from_state`](Self::build_get_from_state)
    /// would produce, without resetting.
    pub fn to_select_sql(&self) -> String {
        self.stmt.compile_select()
    }

    /// Record `sql` as the last query and reset every accumulator.
    pub(crate) fn finish(&mut self, sql: String) -> String {
        self.stmt.reset(sql.clone());
        sql
    }

    pub(crate) fn require_from(&self, action: &str) -> OrmResult<()> {
        if self.stmt.from_targets.is_empty() {
            return Err(OrmError::usage(format!(
                "you have not specified any tables to {action}"
            )));
        }
        Ok(())
    }

    /// Compile a SELECT over `table` plus the accumulated state.
    pub fn build_get(&mut self, table: &str) -> OrmResult<String> {
        self.stmt.add_from(table);
        self.build_get_from_state()
    }

    /// Compile a SELECT over the tables already given to `from`.
    ///
    /// Fails with a usage error when no table has been specified.
    pub fn build_get_from_state(&mut self) -> OrmResult<String> {
        self.require_from("select from")?;
        let sql = self.stmt.compile_select();
        Ok(self.finish(sql))
    }

    /// Compile a SELECT with `table` (skipped when empty) and the given WHERE pairs.
    pub fn build_get_where<K, V, I>(&mut self, table: &str, pairs: I) -> OrmResult<String>
    where
        K: AsRef<str>,
        V: Into<Operand>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.stmt.add_from(table);
        self.require_from("select from")?;
        self.where_map(pairs);
        let sql = self.stmt.compile_select();
        Ok(self.finish(sql))
    }

    /// Compile `SELECT COUNT(*) AS `count`` over `table` (skipped when empty)
    /// plus the accumulated FROM / JOIN / WHERE state.
    pub fn build_count(&mut self, table: &str) -> OrmResult<String> {
        self.stmt.add_from(table);
        self.require_from("count from")?;
        let sql = self.stmt.compile_count();
        Ok(self.finish(sql))
    }

    /// Pass caller-supplied SQL through, resetting the accumulated state.
    pub fn build_query(&mut self, sql: &str) -> String {
        self.finish(sql.to_string())
    }
}

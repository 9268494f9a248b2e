use super::statement::{Aggregate, JoinDirection, Statement};
use super::where_builder::{Connective, LikeSide};
use crate::error::OrmResult;
use crate::value::{Operand, Value};

/// Text accepted by `group_by`, `having` and `order_by`.
///
/// A single string is used as-is; a list is joined with `", "`.
pub trait IntoClause {
    fn into_clause(self) -> String;
}

impl IntoClause for &str {
    fn into_clause(self) -> String {
        self.to_string()
    }
}

impl IntoClause for String {
    fn into_clause(self) -> String {
        self
    }
}

impl IntoClause for &[&str] {
    fn into_clause(self) -> String {
        self.join(", ")
    }
}

impl<const N: usize> IntoClause for [&str; N] {
    fn into_clause(self) -> String {
        self.join(", ")
    }
}

impl IntoClause for Vec<String> {
    fn into_clause(self) -> String {
        self.join(", ")
    }
}

/// Chainable clause builders shared by [`QueryBuilder`](super::QueryBuilder)
/// and [`Adapter`](crate::Adapter).
///
/// Every method mutates the current [`Statement`] and returns `&mut Self` so
/// calls can be chained up to a terminal operation.
pub trait ClauseBuilder {
    /// The statement being accumulated.
    fn statement(&self) -> &Statement;

    /// Mutable access to the statement being accumulated.
    fn statement_mut(&mut self) -> &mut Statement;

    // ==================== FROM / JOIN ====================

    /// Add one or more comma-separated tables to FROM.
    ///
    /// Aliases (`"users u"`, `"users AS u"`) are tracked; empty entries are
    /// ignored.
    fn from(&mut self, tables: &str) -> &mut Self {
        self.statement_mut().add_from(tables);
        self
    }

    /// Add each table of a list to FROM.
    fn from_tables<S: AsRef<str>>(&mut self, tables: &[S]) -> &mut Self {
        for table in tables {
            self.statement_mut().add_from(table.as_ref());
        }
        self
    }

    /// Add a JOIN clause.
    ///
    /// `direction` is one of `LEFT`, `RIGHT`, `OUTER`, `INNER`, `LEFT OUTER`,
    /// `RIGHT OUTER` (case-insensitive). Anything else, including `""`,
    /// produces a plain `JOIN`.
    fn join(&mut self, table: &str, on: &str, direction: &str) -> &mut Self {
        let direction = JoinDirection::parse(direction);
        self.statement_mut().add_join(table, on, direction);
        self
    }

    /// Add INNER JOIN.
    fn inner_join(&mut self, table: &str, on: &str) -> &mut Self {
        self.statement_mut()
            .add_join(table, on, Some(JoinDirection::Inner));
        self
    }

    /// Add LEFT JOIN.
    fn left_join(&mut self, table: &str, on: &str) -> &mut Self {
        self.statement_mut()
            .add_join(table, on, Some(JoinDirection::Left));
        self
    }

    /// Add RIGHT JOIN.
    fn right_join(&mut self, table: &str, on: &str) -> &mut Self {
        self.statement_mut()
            .add_join(table, on, Some(JoinDirection::Right));
        self
    }

    // ==================== SELECT ====================

    /// Add comma-separated SELECT columns.
    fn select(&mut self, columns: &str) -> &mut Self {
        for column in columns.split(',') {
            self.statement_mut().add_select(column);
        }
        self
    }

    /// Add SELECT columns from a list (entries may contain commas).
    fn select_cols<S: AsRef<str>>(&mut self, columns: &[S]) -> &mut Self {
        for column in columns {
            self.statement_mut().add_select(column.as_ref());
        }
        self
    }

    /// Add `FUNC(column) AS alias` to SELECT.
    ///
    /// `func` must be one of `MIN`, `MAX`, `AVG`, `SUM`. Without an alias,
    /// the last dot-segment of `column` is used.
    fn select_aggregate(
        &mut self,
        func: &str,
        column: &str,
        alias: Option<&str>,
    ) -> OrmResult<&mut Self> {
        let func = Aggregate::parse(func)?;
        self.statement_mut().add_aggregate(func, column, alias)?;
        Ok(self)
    }

    fn select_min(&mut self, column: &str, alias: Option<&str>) -> OrmResult<&mut Self> {
        self.statement_mut()
            .add_aggregate(Aggregate::Min, column, alias)?;
        Ok(self)
    }

    fn select_max(&mut self, column: &str, alias: Option<&str>) -> OrmResult<&mut Self> {
        self.statement_mut()
            .add_aggregate(Aggregate::Max, column, alias)?;
        Ok(self)
    }

    fn select_avg(&mut self, column: &str, alias: Option<&str>) -> OrmResult<&mut Self> {
        self.statement_mut()
            .add_aggregate(Aggregate::Avg, column, alias)?;
        Ok(self)
    }

    fn select_sum(&mut self, column: &str, alias: Option<&str>) -> OrmResult<&mut Self> {
        self.statement_mut()
            .add_aggregate(Aggregate::Sum, column, alias)?;
        Ok(self)
    }

    /// Emit `SELECT DISTINCT`.
    fn distinct(&mut self) -> &mut Self {
        self.statement_mut().distinct = true;
        self
    }

    // ==================== Grouping / ordering / paging ====================

    /// Set GROUP BY (raw, not escaped).
    fn group_by(&mut self, clause: impl IntoClause) -> &mut Self {
        self.statement_mut().group_by = clause.into_clause();
        self
    }

    /// Set HAVING (raw, not escaped).
    fn having(&mut self, clause: impl IntoClause) -> &mut Self {
        self.statement_mut().having = clause.into_clause();
        self
    }

    /// Set ORDER BY (raw, not escaped).
    fn order_by(&mut self, clause: impl IntoClause) -> &mut Self {
        self.statement_mut().order_by = clause.into_clause();
        self
    }

    fn limit(&mut self, n: u64) -> &mut Self {
        self.statement_mut().limit = Some(n);
        self
    }

    fn offset(&mut self, n: u64) -> &mut Self {
        self.statement_mut().offset = Some(n);
        self
    }

    fn limit_offset(&mut self, n: u64, offset: u64) -> &mut Self {
        let stmt = self.statement_mut();
        stmt.limit = Some(n);
        stmt.offset = Some(offset);
        self
    }

    // ==================== WHERE ====================

    /// `AND key = value`.
    ///
    /// A `None`/`Value::Null` renders `key IS NULL`; a non-empty list renders
    /// `key IN (...)`. Keys may carry their own operator (`"age >"`).
    fn where_eq(&mut self, key: &str, value: impl Into<Operand>) -> &mut Self {
        self.statement_mut()
            .add_where([(key, value)], Connective::And, true);
        self
    }

    /// `OR key = value`.
    fn or_where_eq(&mut self, key: &str, value: impl Into<Operand>) -> &mut Self {
        self.statement_mut()
            .add_where([(key, value)], Connective::Or, true);
        self
    }

    /// `AND key = sql` with neither side escaped.
    fn where_raw(&mut self, key: &str, sql: &str) -> &mut Self {
        self.statement_mut()
            .add_where([(key, Value::raw(sql))], Connective::And, false);
        self
    }

    /// `OR key = sql` with neither side escaped.
    fn or_where_raw(&mut self, key: &str, sql: &str) -> &mut Self {
        self.statement_mut()
            .add_where([(key, Value::raw(sql))], Connective::Or, false);
        self
    }

    /// Add one AND condition per pair.
    fn where_map<K, V, I>(&mut self, pairs: I) -> &mut Self
    where
        K: AsRef<str>,
        V: Into<Operand>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.statement_mut().add_where(pairs, Connective::And, true);
        self
    }

    /// Add one OR condition per pair.
    fn or_where_map<K, V, I>(&mut self, pairs: I) -> &mut Self
    where
        K: AsRef<str>,
        V: Into<Operand>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.statement_mut().add_where(pairs, Connective::Or, true);
        self
    }

    /// `AND key IN (...)`. An empty list adds nothing.
    fn where_in<V: Into<Value>>(
        &mut self,
        key: &str,
        values: impl IntoIterator<Item = V>,
    ) -> &mut Self {
        self.statement_mut()
            .add_where_in(key, values, false, Connective::And);
        self
    }

    fn or_where_in<V: Into<Value>>(
        &mut self,
        key: &str,
        values: impl IntoIterator<Item = V>,
    ) -> &mut Self {
        self.statement_mut()
            .add_where_in(key, values, false, Connective::Or);
        self
    }

    fn where_not_in<V: Into<Value>>(
        &mut self,
        key: &str,
        values: impl IntoIterator<Item = V>,
    ) -> &mut Self {
        self.statement_mut()
            .add_where_in(key, values, true, Connective::And);
        self
    }

    fn or_where_not_in<V: Into<Value>>(
        &mut self,
        key: &str,
        values: impl IntoIterator<Item = V>,
    ) -> &mut Self {
        self.statement_mut()
            .add_where_in(key, values, true, Connective::Or);
        self
    }

    // ==================== LIKE ====================

    fn like(&mut self, field: &str, needle: &str, side: LikeSide) -> &mut Self {
        self.statement_mut()
            .add_like([(field, needle)], Connective::And, side, false);
        self
    }

    fn not_like(&mut self, field: &str, needle: &str, side: LikeSide) -> &mut Self {
        self.statement_mut()
            .add_like([(field, needle)], Connective::And, side, true);
        self
    }

    fn or_like(&mut self, field: &str, needle: &str, side: LikeSide) -> &mut Self {
        self.statement_mut()
            .add_like([(field, needle)], Connective::Or, side, false);
        self
    }

    fn or_not_like(&mut self, field: &str, needle: &str, side: LikeSide) -> &mut Self {
        self.statement_mut()
            .add_like([(field, needle)], Connective::Or, side, true);
        self
    }

    /// Add one AND LIKE condition per `(field, match)` pair.
    fn like_map<K, M, I>(&mut self, pairs: I, side: LikeSide) -> &mut Self
    where
        K: AsRef<str>,
        M: AsRef<str>,
        I: IntoIterator<Item = (K, M)>,
    {
        self.statement_mut()
            .add_like(pairs, Connective::And, side, false);
        self
    }
}

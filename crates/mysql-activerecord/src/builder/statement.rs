//! Per-statement builder state and clause rendering.

use crate::error::{OrmError, OrmResult};
use crate::ident::{AliasRegistry, protect_identifiers};
use std::sync::OnceLock;

/// Accumulated clause fragments for the statement being built.
///
/// Every terminal operation compiles this state into SQL and then resets it,
/// so nothing carries over into the next statement apart from
/// [`Statement::last_query`].
#[derive(Debug, Clone, Default)]
pub struct Statement {
    /// Rendered WHERE fragments, each carrying its own connective (except the first)
    pub(crate) where_fragments: Vec<String>,
    /// Escaped values of the `IN (...)` list currently being built
    pub(crate) where_in_scratch: Vec<String>,
    /// Protected FROM targets
    pub(crate) from_targets: Vec<String>,
    /// Rendered JOIN clauses
    pub(crate) join_fragments: Vec<String>,
    /// Protected SELECT columns (empty means `*`)
    pub(crate) select_columns: Vec<String>,
    pub(crate) order_by: String,
    pub(crate) group_by: String,
    pub(crate) having: String,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) distinct: bool,
    pub(crate) aliases: AliasRegistry,
    pub(crate) last_query: String,
}

/// Valid JOIN directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinDirection {
    Left,
    Right,
    Outer,
    Inner,
    LeftOuter,
    RightOuter,
}

impl JoinDirection {
    /// Parse a direction keyword (case-insensitive, inner whitespace collapsed).
    ///
    /// Returns `None` for anything outside the supported set.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.to_ascii_uppercase().as_str() {
            "LEFT" => Some(Self::Left),
            "RIGHT" => Some(Self::Right),
            "OUTER" => Some(Self::Outer),
            "INNER" => Some(Self::Inner),
            "LEFT OUTER" => Some(Self::LeftOuter),
            "RIGHT OUTER" => Some(Self::RightOuter),
            _ => None,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
            Self::Outer => "OUTER",
            Self::Inner => "INNER",
            Self::LeftOuter => "LEFT OUTER",
            Self::RightOuter => "RIGHT OUTER",
        }
    }
}

/// Aggregate functions accepted by `select_min` / `select_max` / `select_avg` / `select_sum`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Min,
    Max,
    Avg,
    Sum,
}

impl Aggregate {
    /// Parse a function name (case-insensitive).
    pub fn parse(s: &str) -> OrmResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MIN" => Ok(Self::Min),
            "MAX" => Ok(Self::Max),
            "AVG" => Ok(Self::Avg),
            "SUM" => Ok(Self::Sum),
            _ => Err(OrmError::usage(format!("invalid function type: {s}"))),
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Avg => "AVG",
            Self::Sum => "SUM",
        }
    }
}

fn join_condition_re() -> &'static regex::Regex {
    static JOIN_RE: OnceLock<regex::Regex> = OnceLock::new();
    JOIN_RE.get_or_init(|| {
        regex::Regex::new(r"([\w.]+)([\W\s]+)(.+)").expect("invalid built-in join regex")
    })
}

impl Statement {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Inspection ====================

    pub fn where_fragments(&self) -> &[String] {
        &self.where_fragments
    }

    pub fn from_targets(&self) -> &[String] {
        &self.from_targets
    }

    pub fn join_fragments(&self) -> &[String] {
        &self.join_fragments
    }

    pub fn select_columns(&self) -> &[String] {
        &self.select_columns
    }

    pub fn aliases(&self) -> &AliasRegistry {
        &self.aliases
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn order_by(&self) -> &str {
        &self.order_by
    }

    pub fn group_by(&self) -> &str {
        &self.group_by
    }

    pub fn having(&self) -> &str {
        &self.having
    }

    /// The most recently compiled SQL statement.
    pub fn last_query(&self) -> &str {
        &self.last_query
    }

    /// Whether no clause has been accumulated since the last reset.
    pub fn is_empty(&self) -> bool {
        self.where_fragments.is_empty()
            && self.where_in_scratch.is_empty()
            && self.from_targets.is_empty()
            && self.join_fragments.is_empty()
            && self.select_columns.is_empty()
            && self.order_by.is_empty()
            && self.group_by.is_empty()
            && self.having.is_empty()
            && self.limit.is_none()
            && self.offset.is_none()
            && !self.distinct
            && self.aliases.is_empty()
    }

    /// Clear every accumulator and remember `last_query`.
    pub fn reset(&mut self, last_query: impl Into<String>) {
        *self = Self {
            last_query: last_query.into(),
            ..Self::default()
        };
    }

    pub(crate) fn protect(&self, item: &str) -> String {
        protect_identifiers(item, &self.aliases, true)
    }

    // ==================== Accumulators ====================

    pub(crate) fn add_from(&mut self, tables: &str) {
        for entry in tables.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            self.aliases.track(entry);
            let protected = self.protect(entry);
            self.from_targets.push(protected);
        }
    }

    pub(crate) fn add_join(&mut self, table: &str, on: &str, direction: Option<JoinDirection>) {
        self.aliases.track(table);

        let condition = match join_condition_re().captures(on) {
            Some(caps) => {
                let whole = caps.get(0).map_or(0..0, |m| m.range());
                format!(
                    "{}{}{}{}",
                    &on[..whole.start],
                    self.protect(&caps[1]),
                    &caps[2],
                    self.protect(&caps[3]),
                )
            }
            None => on.to_string(),
        };

        let keyword = direction.map(|d| format!("{} ", d.as_sql())).unwrap_or_default();
        let table = self.protect(table.trim());
        self.join_fragments
            .push(format!("{keyword}JOIN {table} ON {condition}"));
    }

    pub(crate) fn add_select(&mut self, column: &str) {
        let column = column.trim();
        if !column.is_empty() {
            let protected = self.protect(column);
            self.select_columns.push(protected);
        }
    }

    pub(crate) fn add_aggregate(
        &mut self,
        func: Aggregate,
        column: &str,
        alias: Option<&str>,
    ) -> OrmResult<()> {
        let column = column.trim();
        if column.is_empty() {
            return Err(OrmError::usage(format!(
                "{} requires a column to aggregate",
                func.as_sql()
            )));
        }

        let alias = match alias.map(str::trim).filter(|a| !a.is_empty()) {
            Some(alias) => alias.to_string(),
            None => column.rsplit('.').next().unwrap_or(column).to_string(),
        };

        let sql = format!("{}({}) AS {}", func.as_sql(), self.protect(column), alias);
        self.select_columns.push(sql);
        Ok(())
    }

    // ==================== Rendering ====================

    pub(crate) fn from_clause(&self) -> String {
        if self.from_targets.is_empty() {
            String::new()
        } else {
            format!(" FROM ({})", self.from_targets.join(", "))
        }
    }

    pub(crate) fn join_clause(&self) -> String {
        if self.join_fragments.is_empty() {
            String::new()
        } else {
            format!(" {}", self.join_fragments.join(" "))
        }
    }

    pub(crate) fn where_clause(&self) -> String {
        if self.where_fragments.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.where_fragments.join(" "))
        }
    }

    pub(crate) fn limit_clause(&self) -> String {
        self.limit.map(|n| format!(" LIMIT {n}")).unwrap_or_default()
    }

    /// Render the accumulated state as a SELECT statement.
    pub fn compile_select(&self) -> String {
        let mut sql = String::from("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }

        if self.select_columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.select_columns.join(", "));
        }

        sql.push_str(&self.from_clause());
        sql.push_str(&self.join_clause());
        sql.push_str(&self.where_clause());

        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by);
        }
        if !self.having.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&self.having);
        }
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by);
        }
        sql.push_str(&self.limit_clause());
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        sql
    }

    /// Render the accumulated FROM / JOIN / WHERE state as a row count query.
    pub fn compile_count(&self) -> String {
        format!(
            "SELECT COUNT(*) AS {}{}{}{}",
            self.protect("count"),
            self.from_clause(),
            self.join_clause(),
            self.where_clause()
        )
    }
}

//! WHERE, WHERE IN and LIKE fragment construction.

use super::statement::Statement;
use crate::ident::has_operator;
use crate::value::{Operand, Value, escape_string};

/// Boolean connective placed in front of every fragment but the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    fn prefix(self) -> &'static str {
        match self {
            Self::And => "AND ",
            Self::Or => "OR ",
        }
    }
}

/// Where the `%` wildcards go in a LIKE pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LikeSide {
    /// `'match'`
    None,
    /// `'%match'`
    Before,
    /// `'match%'`
    After,
    /// `'%match%'`
    #[default]
    Both,
}

impl LikeSide {
    fn pattern(self, needle: &str) -> String {
        let needle = escape_string(needle);
        match self {
            Self::None => format!("'{needle}'"),
            Self::Before => format!("'%{needle}'"),
            Self::After => format!("'{needle}%'"),
            Self::Both => format!("'%{needle}%'"),
        }
    }
}

impl Statement {
    fn connective_prefix(&self, connective: Connective) -> &'static str {
        if self.where_fragments.is_empty() {
            ""
        } else {
            connective.prefix()
        }
    }

    /// Push one condition per pair.
    ///
    /// With `escape` the key is identifier-protected and the value rendered
    /// as a literal; without it both are used verbatim.
    pub(crate) fn add_where<K, V, I>(&mut self, pairs: I, connective: Connective, escape: bool)
    where
        K: AsRef<str>,
        V: Into<Operand>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, operand) in pairs {
            let key = key.as_ref();
            let value = match operand.into() {
                Operand::List(values) => {
                    self.add_where_in(key, values, false, connective);
                    continue;
                }
                Operand::Scalar(value) => value,
            };

            let prefix = self.connective_prefix(connective);
            let fragment = match value {
                Value::Null => {
                    let mut key = key.to_string();
                    if !has_operator(&key) {
                        key.push_str(" IS NULL");
                    }
                    if escape {
                        key = self.protect(&key);
                    }
                    format!("{prefix}{key}")
                }
                value => {
                    let mut key = if escape {
                        self.protect(key)
                    } else {
                        key.to_string()
                    };
                    if !has_operator(&key) {
                        key.push_str(" =");
                    }
                    format!("{prefix}{key} {}", value.to_sql_literal())
                }
            };
            self.where_fragments.push(fragment);
        }
    }

    /// Push a `key [NOT] IN (...)` condition.
    ///
    /// An empty value list adds nothing.
    pub(crate) fn add_where_in<V>(
        &mut self,
        key: &str,
        values: impl IntoIterator<Item = V>,
        negate: bool,
        connective: Connective,
    ) where
        V: Into<Value>,
    {
        let key = key.trim();
        self.where_in_scratch
            .extend(values.into_iter().map(|v| v.into().to_sql_literal()));
        if key.is_empty() || self.where_in_scratch.is_empty() {
            self.where_in_scratch.clear();
            return;
        }

        let prefix = self.connective_prefix(connective);
        let not = if negate { " NOT" } else { "" };
        let fragment = format!(
            "{prefix}{}{not} IN ({})",
            self.protect(key),
            self.where_in_scratch.join(", ")
        );
        self.where_fragments.push(fragment);
        self.where_in_scratch.clear();
    }

    /// Push one LIKE condition per `(field, match)` pair.
    pub(crate) fn add_like<K, M, I>(
        &mut self,
        pairs: I,
        connective: Connective,
        side: LikeSide,
        negate: bool,
    ) where
        K: AsRef<str>,
        M: AsRef<str>,
        I: IntoIterator<Item = (K, M)>,
    {
        let not = if negate { " NOT" } else { "" };
        for (field, needle) in pairs {
            let field = self.protect(field.as_ref().trim());
            let statement = format!("{field}{not} LIKE {}", side.pattern(needle.as_ref()));
            self.add_where([(statement, Value::Null)], connective, false);
        }
    }
}

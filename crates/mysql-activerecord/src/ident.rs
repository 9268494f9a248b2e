//! Identifier protection.
//!
//! MySQL identifiers are quoted with backticks. The helpers here quote table
//! and column references while leaving alone anything that is not a plain
//! identifier: function calls, string literals, operator expressions and
//! already-quoted segments.
//!
//! # Example
//! ```
//! use mysql_activerecord::ident::{escape_identifier, protect_identifiers, AliasRegistry};
//!
//! assert_eq!(escape_identifier("db.users"), "`db`.`users`");
//!
//! let mut aliases = AliasRegistry::new();
//! aliases.track("users u");
//! assert_eq!(protect_identifiers("u.name", &aliases, true), "`u`.`name`");
//! assert_eq!(protect_identifiers("COUNT(id)", &aliases, true), "COUNT(id)");
//! ```

use std::sync::OnceLock;

const QUOTE: char = '`';

/// Quote every dot-separated segment of `item` with backticks.
///
/// Empty input and `*` are returned unchanged. Runs of backticks collapse
/// into one, so quoting an already-quoted identifier is a no-op.
pub fn escape_identifier(item: &str) -> String {
    if item.is_empty() || item == "*" {
        return item.to_string();
    }

    let mut wrapped = String::with_capacity(item.len() + 4);
    wrapped.push(QUOTE);
    for ch in item.chars() {
        if ch == '.' {
            wrapped.push(QUOTE);
            wrapped.push('.');
            wrapped.push(QUOTE);
        } else {
            wrapped.push(ch);
        }
    }
    wrapped.push(QUOTE);

    collapse_quotes(&wrapped)
}

fn collapse_quotes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_quote = false;
    for ch in s.chars() {
        if ch == QUOTE {
            if !prev_quote {
                out.push(ch);
            }
            prev_quote = true;
        } else {
            out.push(ch);
            prev_quote = false;
        }
    }
    out
}

fn operator_re() -> &'static regex::Regex {
    static OPERATOR_RE: OnceLock<regex::Regex> = OnceLock::new();
    OPERATOR_RE.get_or_init(|| {
        regex::Regex::new(
            r"(?i)(<|>|!|=|\sIS NULL|\sIS NOT NULL|\sEXISTS|\sBETWEEN|\sLIKE|\sIN\s*\(|\s)",
        )
        .expect("invalid built-in operator regex")
    })
}

/// Whether `s` already carries a comparison operator.
///
/// Any whitespace inside the trimmed text counts, so `"id >"` and
/// `"name IS NOT NULL"` both qualify while `"name"` does not.
pub fn has_operator(s: &str) -> bool {
    operator_re().is_match(s.trim())
}

fn strip_quotes(s: &str) -> &str {
    s.trim_matches(QUOTE)
}

/// Per-statement set of table aliases seen in FROM / JOIN clauses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasRegistry {
    aliases: Vec<String>,
}

impl AliasRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the aliases declared by a table expression.
    ///
    /// `"users u, posts AS p"` records `u` and `p`. Entries without a space
    /// declare no alias.
    pub fn track(&mut self, table_expr: &str) {
        for entry in table_expr.split(',') {
            let entry = entry.trim();
            if !entry.contains(char::is_whitespace) {
                continue;
            }

            let alias = entry
                .split_whitespace()
                .filter(|token| !token.eq_ignore_ascii_case("AS"))
                .next_back()
                .map(strip_quotes)
                .unwrap_or_default();

            if !alias.is_empty() && !self.contains(alias) {
                self.aliases.push(alias.to_string());
            }
        }
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.aliases.iter().any(|a| a == strip_quotes(alias))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.aliases
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    pub fn clear(&mut self) {
        self.aliases.clear();
    }
}

/// Find `" AS "` case-insensitively, returning its byte offset.
fn find_as_keyword(s: &str) -> Option<usize> {
    s.as_bytes()
        .windows(4)
        .position(|w| w.eq_ignore_ascii_case(b" as "))
}

/// Quote a column or table reference.
///
/// - Whitespace runs are collapsed to a single space.
/// - A trailing alias (`"users u"`, `"users AS u"`) is split off and quoted
///   separately. A trailing operator expression (`"id > 5"`) is kept as-is.
/// - Anything containing `(` or `'` is returned verbatim.
/// - `alias.column` is quoted per segment when `alias` is a tracked alias;
///   other dotted names are quoted as a schema path.
///
/// With `protect == false` only the alias handling applies.
pub fn protect_identifiers(item: &str, aliases: &AliasRegistry, protect: bool) -> String {
    let item = item.split_whitespace().collect::<Vec<_>>().join(" ");

    let (base, alias) = if let Some(idx) = find_as_keyword(&item) {
        let alias = if protect {
            format!("{}{}", &item[idx..idx + 4], escape_identifier(&item[idx + 4..]))
        } else {
            item[idx..].to_string()
        };
        (&item[..idx], alias)
    } else if let Some(idx) = item.find(' ') {
        let rest = &item[idx + 1..];
        let alias = if protect && !has_operator(rest) {
            format!(" {}", escape_identifier(rest))
        } else {
            item[idx..].to_string()
        };
        (&item[..idx], alias)
    } else {
        (item.as_str(), String::new())
    };

    if base.contains('(') || base.contains('\'') {
        return format!("{base}{alias}");
    }

    if !protect {
        return format!("{base}{alias}");
    }

    if base.contains('.') {
        let mut parts = base.split('.');
        let first = parts.next().unwrap_or_default();
        if aliases.contains(first) {
            let rendered = base
                .split('.')
                .map(|part| {
                    if part == "*" {
                        part.to_string()
                    } else {
                        escape_identifier(part)
                    }
                })
                .collect::<Vec<_>>()
                .join(".");
            return format!("{rendered}{alias}");
        }
    }

    format!("{}{alias}", escape_identifier(base))
}

/// Protect both sides of each pair.
///
/// Used for mapping-shaped input such as batch WHERE maps.
pub fn protect_pairs<'a, I>(pairs: I, aliases: &AliasRegistry) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| {
            (
                protect_identifiers(k, aliases, true),
                protect_identifiers(v, aliases, true),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn protect(item: &str) -> String {
        protect_identifiers(item, &AliasRegistry::new(), true)
    }

    #[test]
    fn escape_simple() {
        assert_eq!(escape_identifier("users"), "`users`");
    }

    #[test]
    fn escape_dotted() {
        assert_eq!(escape_identifier("a.b"), "`a`.`b`");
        assert_eq!(escape_identifier("a.b.c"), "`a`.`b`.`c`");
    }

    #[test]
    fn escape_is_idempotent() {
        for s in ["users", "a.b", "star_system"] {
            let once = escape_identifier(s);
            assert_eq!(escape_identifier(&once), once);
        }
        assert_eq!(escape_identifier("`a`.`b`"), "`a`.`b`");
    }

    #[test]
    fn escape_skips_star_and_empty() {
        assert_eq!(escape_identifier("*"), "*");
        assert_eq!(escape_identifier(""), "");
    }

    #[test]
    fn operator_detection() {
        for s in ["id >", "a<b", "x != 1", "a = b", "name IS NULL", "id IN (1)", "a b"] {
            assert!(has_operator(s), "{s}");
        }
        for s in ["id", "users.id", "  id  ", ""] {
            assert!(!has_operator(s), "{s}");
        }
    }

    #[test]
    fn track_aliases_forms() {
        let mut reg = AliasRegistry::new();
        reg.track("universe u");
        reg.track("galaxy AS g, star_system");
        reg.track("`planet` `p`");
        reg.track("universe u");
        assert_eq!(reg.as_slice(), &["u", "g", "p"]);
        assert!(reg.contains("`u`"));
    }

    #[test]
    fn protect_plain_and_alias() {
        assert_eq!(protect("universe"), "`universe`");
        assert_eq!(protect("universe u"), "`universe` `u`");
        assert_eq!(protect("universe as u"), "`universe` as `u`");
        assert_eq!(protect("universe   AS   u"), "`universe` AS `u`");
        assert_eq!(protect("`universe` u"), "`universe` `u`");
        assert_eq!(protect("galaxy `g`"), "`galaxy` `g`");
    }

    #[test]
    fn protect_keeps_operator_expressions() {
        assert_eq!(protect("id > 5"), "`id` > 5");
        assert_eq!(protect("name IS NULL"), "`name` IS NULL");
    }

    #[test]
    fn protect_skips_functions_and_literals() {
        assert_eq!(protect("MAX(id)"), "MAX(id)");
        assert_eq!(protect("'literal'"), "'literal'");
        assert_eq!(protect("COUNT(*) AS total"), "COUNT(*) AS `total`");
    }

    #[test]
    fn protect_dotted_with_tracked_alias() {
        let mut reg = AliasRegistry::new();
        reg.track("users u");
        assert_eq!(protect_identifiers("u.name", &reg, true), "`u`.`name`");
        assert_eq!(protect_identifiers("u.*", &reg, true), "`u`.*");
        assert_eq!(protect_identifiers("db.users.id", &reg, true), "`db`.`users`.`id`");
    }

    #[test]
    fn protect_without_quoting() {
        let reg = AliasRegistry::new();
        assert_eq!(protect_identifiers("users u", &reg, false), "users u");
        assert_eq!(protect_identifiers("name", &reg, false), "name");
    }

    #[test]
    fn protect_pairs_quotes_both_sides() {
        let reg = AliasRegistry::new();
        let out = protect_pairs([("a", "b.c")], &reg);
        assert_eq!(out, vec![("`a`".to_string(), "`b`.`c`".to_string())]);
    }
}

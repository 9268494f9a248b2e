//! Result rows and typed column access

use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use sqlx::mysql::MySqlRow;
use sqlx::{Column, MySql, Row as _, TypeInfo, ValueRef};

/// One result row: column names in select order, each with its decoded value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column (builder style).
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.columns.push((column.into(), value.into()));
        self
    }

    /// Raw value of `column`, if the row has it.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Convert `column` into `T`.
    ///
    /// Returns [`OrmError::Decode`] when the column is missing or its value
    /// cannot be represented as `T`.
    pub fn try_get<T: FromValue>(&self, column: &str) -> OrmResult<T> {
        let value = self
            .get(column)
            .ok_or_else(|| OrmError::decode(column, "no such column in result row"))?;
        T::from_value(value).ok_or_else(|| {
            OrmError::decode(
                column,
                format!("cannot convert {value:?} to {}", std::any::type_name::<T>()),
            )
        })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Decode a sqlx row read over the text protocol.
    pub(crate) fn from_mysql(row: &MySqlRow) -> OrmResult<Self> {
        let mut out = Self {
            columns: Vec::with_capacity(row.len()),
        };
        for column in row.columns() {
            let name = column.name();
            let value = decode_column(row, column.ordinal(), name, column.type_info().name())?;
            out.columns.push((name.to_string(), value));
        }
        Ok(out)
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}

fn cell<'r, T>(row: &'r MySqlRow, idx: usize, column: &str) -> OrmResult<T>
where
    T: sqlx::Decode<'r, MySql>,
{
    row.try_get_unchecked::<T, _>(idx)
        .map_err(|e| OrmError::decode(column, e.to_string()))
}

fn decode_column(row: &MySqlRow, idx: usize, column: &str, type_name: &str) -> OrmResult<Value> {
    let raw = row
        .try_get_raw(idx)
        .map_err(|e| OrmError::decode(column, e.to_string()))?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let value = match type_name {
        "BOOLEAN" => Value::Bool(cell(row, idx, column)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            Value::Int(cell(row, idx, column)?)
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => Value::UInt(cell(row, idx, column)?),
        "FLOAT" | "DOUBLE" => Value::Float(cell(row, idx, column)?),
        "JSON" => {
            let text: String = cell(row, idx, column)?;
            let json = serde_json::from_str(&text)
                .map_err(|e| OrmError::decode(column, e.to_string()))?;
            Value::Json(json)
        }
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT"
        | "GEOMETRY" => {
            let bytes: Vec<u8> = cell(row, idx, column)?;
            Value::Text(String::from_utf8_lossy(&bytes).into_owned())
        }
        // DECIMAL, temporal types and character types all arrive as text.
        _ => Value::Text(cell(row, idx, column)?),
    };
    Ok(value)
}

/// Conversion from a decoded [`Value`] into a Rust type.
pub trait FromValue: Sized {
    /// `None` when `value` has no representation as `Self`.
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(n) => Some(*n),
            Value::UInt(n) => i64::try_from(*n).ok(),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl FromValue for u64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::UInt(n) => Some(*n),
            Value::Int(n) => u64::try_from(*n).ok(),
            Value::Bool(b) => Some(u64::from(*b)),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(f) => Some(*f),
            Value::Int(n) => Some(*n as f64),
            Value::UInt(n) => Some(*n as f64),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::Int(n) => Some(*n != 0),
            Value::UInt(n) => Some(*n != 0),
            Value::Text(s) => match s.trim() {
                "1" => Some(true),
                "0" => Some(false),
                other if other.eq_ignore_ascii_case("true") => Some(true),
                other if other.eq_ignore_ascii_case("false") => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Text(s) | Value::Raw(s) => Some(s.clone()),
            Value::Int(n) => Some(n.to_string()),
            Value::UInt(n) => Some(n.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Json(json) => Some(json.to_string()),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Json(json) => Some(json.clone()),
            Value::Text(s) => serde_json::from_str(s).ok(),
            _ => None,
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Everything a dispatched statement produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    /// Result rows (empty for statements that return none).
    pub rows: Vec<Row>,
    /// Rows changed by INSERT / UPDATE / DELETE.
    pub affected_rows: u64,
    /// Auto-increment id generated by the last INSERT, if any.
    pub last_insert_id: Option<u64>,
}

impl QueryOutput {
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

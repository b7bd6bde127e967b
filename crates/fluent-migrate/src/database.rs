//! Database collaborator contract.
//!
//! The engine never talks to a driver directly. Drivers implement
//! [`Database`] so the core stays driver-agnostic.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A scalar value bound as a parameter or read back from a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Integer value.
    Integer(i64),
    /// Floating point value.
    Real(f64),
    /// Text value.
    Text(String),
    /// Binary value.
    Blob(Vec<u8>),
}

impl Value {
    /// Returns the value as text, converting numbers.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Null | Self::Blob(_) => None,
            Self::Integer(i) => Some(i.to_string()),
            Self::Real(f) => Some(f.to_string()),
            Self::Text(s) => Some(s.clone()),
        }
    }

    /// Returns the value as an integer, parsing text.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            #[allow(clippy::cast_possible_truncation)]
            Self::Real(f) => Some(*f as i64),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Null | Self::Blob(_) => None,
        }
    }

    /// Returns true for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

/// One result row: field names mapped to values, in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    /// Creates an empty row.
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Appends a field.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(name, value);
        self
    }

    /// Appends a field in place.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Looks a field up by name. Names compare case-insensitively since
    /// engines disagree on the case of `information_schema` columns.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Text of a field, `None` when missing or NULL.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<String> {
        self.get(name).and_then(Value::as_text)
    }

    /// Integer value of a field, `None` when missing or NULL.
    #[must_use]
    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    /// Value of the first field.
    #[must_use]
    pub fn first(&self) -> Option<&Value> {
        self.fields.first().map(|(_, value)| value)
    }

    /// Iterates over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl From<Vec<(String, Value)>> for Row {
    fn from(fields: Vec<(String, Value)>) -> Self {
        Self { fields }
    }
}

/// Rows returned by a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Result rows.
    pub rows: Vec<Row>,
}

impl QueryResult {
    /// Wraps rows.
    #[must_use]
    pub const fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// First row, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// First field of the first row as text.
    #[must_use]
    pub fn scalar_text(&self) -> Option<String> {
        self.first().and_then(Row::first).and_then(Value::as_text)
    }
}

/// Outcome of a statement execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Identifier generated by the statement, if any.
    pub last_insert_id: Option<i64>,
    /// Number of rows affected.
    pub rows_affected: u64,
}

/// A named parameter: `(":name" without the colon, value)`.
pub type Param<'a> = (&'a str, Value);

/// Database handle used to execute DDL and introspection queries.
///
/// Parameters are named (`:t` in the SQL text, `("t", value)` in the slice).
#[async_trait]
pub trait Database: Send + Sync {
    /// Executes a statement.
    async fn exec(&self, sql: &str, params: &[Param<'_>]) -> Result<ExecResult>;

    /// Runs a query and returns its rows.
    async fn query(&self, sql: &str, params: &[Param<'_>]) -> Result<QueryResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_lookup_ignores_case() {
        let row = Row::new().with("COLUMN_NAME", "id").with("ordinal", 1_i64);
        assert_eq!(row.text("column_name").as_deref(), Some("id"));
        assert_eq!(row.int("ORDINAL"), Some(1));
        assert!(row.get("missing").is_none());
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::Text(" 42 ".into()).as_i64(), Some(42));
        assert_eq!(Value::Integer(7).as_text().as_deref(), Some("7"));
        assert_eq!(Value::Null.as_text(), None);
        assert!(Value::Null.is_null());
    }

    #[test]
    fn test_scalar_text() {
        let result = QueryResult::new(vec![Row::new().with("v", "3.45.1")]);
        assert_eq!(result.scalar_text().as_deref(), Some("3.45.1"));
        assert_eq!(QueryResult::default().scalar_text(), None);
    }
}

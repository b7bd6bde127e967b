//! Engine-independent schema objects.
//!
//! These are plain value types: builders accumulate them, inspectors produce
//! them from the live database and renderers turn them into DDL.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};
use crate::feature::Feature;

static UNSIGNED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+unsigned\b").expect("valid unsigned regex"));

/// A raw SQL fragment emitted verbatim, e.g. `CURRENT_TIMESTAMP`.
///
/// An empty fragment renders as `NULL`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expr(pub Option<String>);

impl Expr {
    /// Wraps a raw SQL fragment.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self(Some(sql.into()))
    }

    /// The empty expression, rendered as `NULL`.
    #[must_use]
    pub const fn nothing() -> Self {
        Self(None)
    }

    /// `CURRENT_TIMESTAMP()`.
    #[must_use]
    pub fn current_timestamp() -> Self {
        Self::raw("CURRENT_TIMESTAMP()")
    }

    /// The fragment, or `None` when empty.
    #[must_use]
    pub fn sql(&self) -> Option<&str> {
        self.0.as_deref().filter(|s| !s.is_empty())
    }
}

/// A column default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DefaultValue {
    /// Rendered as `1` / `0`.
    Bool(bool),
    /// Integer literal.
    Int(i64),
    /// Floating point literal.
    Float(f64),
    /// Quoted string literal.
    Text(String),
    /// Raw SQL expression.
    Expr(Expr),
}

impl From<bool> for DefaultValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for DefaultValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for DefaultValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for DefaultValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for DefaultValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for DefaultValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Expr> for DefaultValue {
    fn from(value: Expr) -> Self {
        Self::Expr(value)
    }
}

/// Foreign key `ON UPDATE` / `ON DELETE` action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferentialAction {
    NoAction,
    Cascade,
    Restrict,
    SetNull,
    SetDefault,
}

impl ReferentialAction {
    /// SQL keyword(s) for this action.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Cascade => "CASCADE",
            Self::Restrict => "RESTRICT",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }

    /// Parses an optional mode for the named clause; `None` means `NO ACTION`.
    pub fn parse_clause(clause: &'static str, value: Option<&str>) -> Result<Self> {
        match value {
            None => Ok(Self::NoAction),
            Some(value) => value.parse().map_err(|_| MigrateError::InvalidReferentialAction {
                clause,
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for ReferentialAction {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.to_ascii_uppercase().as_str() {
            "NO ACTION" => Ok(Self::NoAction),
            "CASCADE" => Ok(Self::Cascade),
            "RESTRICT" => Ok(Self::Restrict),
            "SET NULL" => Ok(Self::SetNull),
            "SET DEFAULT" => Ok(Self::SetDefault),
            _ => Err(MigrateError::InvalidReferentialAction {
                clause: "referential action",
                value: s.to_string(),
            }),
        }
    }
}

/// Where a column goes in the table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnPosition {
    /// No positional hint.
    #[default]
    Unspecified,
    /// First column of the table.
    First,
    /// Right after the named column.
    After(String),
}

/// A column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Column name.
    pub name: String,
    /// Raw engine type, e.g. `VARCHAR(255)` or `int(10) unsigned`.
    pub data_type: String,
    /// Whether NULL is allowed.
    pub nullable: bool,
    /// Default value.
    pub default: Option<DefaultValue>,
    /// `ON UPDATE` expression.
    pub on_update: Option<Expr>,
    /// Column comment.
    pub comment: Option<String>,
    /// Character set.
    pub charset: Option<String>,
    /// Collation.
    pub collation: Option<String>,
    /// Explicit unsigned flag.
    pub unsigned: Option<bool>,
    /// Whether the column auto-increments.
    pub auto_increment: bool,
    /// Positional hint.
    pub position: ColumnPosition,
}

impl ColumnDefinition {
    /// A NOT NULL column without default.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: false,
            default: None,
            on_update: None,
            comment: None,
            charset: None,
            collation: None,
            unsigned: None,
            auto_increment: false,
            position: ColumnPosition::Unspecified,
        }
    }

    /// Sets whether NULL is allowed.
    #[must_use]
    pub const fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<DefaultValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets the `ON UPDATE` expression.
    #[must_use]
    pub fn on_update(mut self, expr: Expr) -> Self {
        self.on_update = Some(expr);
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Sets the character set.
    #[must_use]
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    /// Sets the collation.
    #[must_use]
    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    /// Sets the unsigned flag.
    #[must_use]
    pub const fn unsigned(mut self, unsigned: bool) -> Self {
        self.unsigned = Some(unsigned);
        self
    }

    /// Marks the column auto-increment.
    #[must_use]
    pub const fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Places the column first. Clears any `after` hint.
    #[must_use]
    pub fn first(mut self) -> Self {
        self.position = ColumnPosition::First;
        self
    }

    /// Places the column after `column`. Clears any `first` hint.
    #[must_use]
    pub fn after(mut self, column: impl Into<String>) -> Self {
        self.position = ColumnPosition::After(column.into());
        self
    }

    /// Whether the column is unsigned, by flag or by its type text.
    #[must_use]
    pub fn is_unsigned(&self) -> bool {
        self.unsigned == Some(true) || self.data_type.to_ascii_lowercase().contains("unsigned")
    }

    /// Features needed to declare this column.
    #[must_use]
    pub fn required_features(&self) -> Vec<Feature> {
        let mut features = Vec::new();
        if self.comment.is_some() {
            features.push(Feature::ColumnComment);
        }
        if self.charset.is_some() {
            features.push(Feature::ColumnCharset);
        }
        if self.collation.is_some() {
            features.push(Feature::ColumnCollation);
        }
        if self.is_unsigned() {
            features.push(Feature::ColumnUnsigned);
        }
        if self.auto_increment {
            features.push(Feature::AutoIncrement);
        }
        if self.on_update.is_some() {
            features.push(Feature::ColumnOnUpdate);
        }
        features
    }
}

/// An index, unique constraint or primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Index name.
    pub name: String,
    /// Indexed columns, in order.
    pub columns: Vec<String>,
    /// Unique index.
    pub unique: bool,
    /// Primary key.
    pub primary: bool,
    /// Engine-specific type tag (`BTREE`, `HASH`...).
    pub index_type: Option<String>,
}

impl IndexDefinition {
    /// A plain (non-unique) index.
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
            primary: false,
            index_type: None,
        }
    }

    /// A unique index.
    pub fn unique<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            unique: true,
            ..Self::new(name, columns)
        }
    }

    /// True when the first `columns.len()` indexed columns equal `columns`.
    #[must_use]
    pub fn covers_prefix(&self, columns: &[String]) -> bool {
        !columns.is_empty()
            && self.columns.len() >= columns.len()
            && self.columns[..columns.len()] == *columns
    }
}

/// A foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyDefinition {
    /// Constraint name.
    pub name: String,
    /// Referencing columns.
    pub local_columns: Vec<String>,
    /// Referenced table.
    pub foreign_table: String,
    /// Referenced columns, same cardinality as the local ones.
    pub foreign_columns: Vec<String>,
    /// `ON UPDATE` action.
    pub on_update: Option<ReferentialAction>,
    /// `ON DELETE` action.
    pub on_delete: Option<ReferentialAction>,
}

impl ForeignKeyDefinition {
    /// Creates a foreign key, checking that both column lists are non-empty
    /// and of equal length.
    pub fn new<L, F, S1, S2>(
        name: impl Into<String>,
        local_columns: L,
        foreign_table: impl Into<String>,
        foreign_columns: F,
    ) -> Result<Self>
    where
        L: IntoIterator<Item = S1>,
        F: IntoIterator<Item = S2>,
        S1: Into<String>,
        S2: Into<String>,
    {
        let name = name.into();
        let local_columns: Vec<String> = local_columns.into_iter().map(Into::into).collect();
        let foreign_columns: Vec<String> = foreign_columns.into_iter().map(Into::into).collect();

        if local_columns.is_empty() {
            return Err(MigrateError::InvalidForeignKey {
                name,
                message: "no local columns".to_string(),
            });
        }
        if local_columns.len() != foreign_columns.len() {
            return Err(MigrateError::InvalidForeignKey {
                name,
                message: format!(
                    "{} local columns but {} foreign columns",
                    local_columns.len(),
                    foreign_columns.len()
                ),
            });
        }

        Ok(Self {
            name,
            local_columns,
            foreign_table: foreign_table.into(),
            foreign_columns,
            on_update: None,
            on_delete: None,
        })
    }

    /// Sets the `ON UPDATE` action.
    #[must_use]
    pub const fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = Some(action);
        self
    }

    /// Sets the `ON DELETE` action.
    #[must_use]
    pub const fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = Some(action);
        self
    }
}

/// A field of a [`ColumnChange`] that can also be reset to nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Patch<T> {
    /// Keep the current value.
    Keep,
    /// Replace the value.
    Set(T),
    /// Remove the value.
    Clear,
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Self::Keep
    }
}

impl<T: Clone> Patch<T> {
    /// Applies the patch to the current value.
    #[must_use]
    pub fn apply(&self, current: Option<&T>) -> Option<T> {
        match self {
            Self::Keep => current.cloned(),
            Self::Set(value) => Some(value.clone()),
            Self::Clear => None,
        }
    }

    /// Whether the patch changes anything.
    #[must_use]
    pub const fn is_keep(&self) -> bool {
        matches!(self, Self::Keep)
    }
}

/// A partial update of an existing column, merged onto its live definition.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColumnChange {
    /// Column to change.
    pub name: String,
    /// New type.
    pub data_type: Option<String>,
    /// New nullability.
    pub nullable: Option<bool>,
    /// New unsigned flag. `Some(false)` strips `unsigned` from the type.
    pub unsigned: Option<bool>,
    /// New auto-increment flag.
    pub auto_increment: Option<bool>,
    /// New position.
    pub position: Option<ColumnPosition>,
    /// Default value.
    pub default: Patch<DefaultValue>,
    /// `ON UPDATE` expression.
    pub on_update: Patch<Expr>,
    /// Comment.
    pub comment: Patch<String>,
    /// Character set.
    pub charset: Patch<String>,
    /// Collation.
    pub collation: Patch<String>,
}

impl ColumnChange {
    /// An empty change of `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Changes the type.
    #[must_use]
    pub fn data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = Some(data_type.into());
        self
    }

    /// Changes nullability.
    #[must_use]
    pub const fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    /// Changes the unsigned flag.
    #[must_use]
    pub const fn unsigned(mut self, unsigned: bool) -> Self {
        self.unsigned = Some(unsigned);
        self
    }

    /// Changes the auto-increment flag.
    #[must_use]
    pub const fn auto_increment(mut self, auto_increment: bool) -> Self {
        self.auto_increment = Some(auto_increment);
        self
    }

    /// Moves the column first.
    #[must_use]
    pub fn first(mut self) -> Self {
        self.position = Some(ColumnPosition::First);
        self
    }

    /// Moves the column after `column`.
    #[must_use]
    pub fn after(mut self, column: impl Into<String>) -> Self {
        self.position = Some(ColumnPosition::After(column.into()));
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<DefaultValue>) -> Self {
        self.default = Patch::Set(value.into());
        self
    }

    /// Removes the default value.
    #[must_use]
    pub fn drop_default(mut self) -> Self {
        self.default = Patch::Clear;
        self
    }

    /// Sets the `ON UPDATE` expression.
    #[must_use]
    pub fn on_update(mut self, expr: Expr) -> Self {
        self.on_update = Patch::Set(expr);
        self
    }

    /// Removes the `ON UPDATE` expression.
    #[must_use]
    pub fn drop_on_update(mut self) -> Self {
        self.on_update = Patch::Clear;
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Patch::Set(comment.into());
        self
    }

    /// Removes the comment.
    #[must_use]
    pub fn drop_comment(mut self) -> Self {
        self.comment = Patch::Clear;
        self
    }

    /// Sets the character set.
    #[must_use]
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Patch::Set(charset.into());
        self
    }

    /// Removes the character set.
    #[must_use]
    pub fn drop_charset(mut self) -> Self {
        self.charset = Patch::Clear;
        self
    }

    /// Sets the collation.
    #[must_use]
    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Patch::Set(collation.into());
        self
    }

    /// Removes the collation.
    #[must_use]
    pub fn drop_collation(mut self) -> Self {
        self.collation = Patch::Clear;
        self
    }

    /// Rejects changes without a name, with an empty type or without any
    /// field to change.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(MigrateError::InvalidColumnChange(
                "column name is empty".to_string(),
            ));
        }
        if self.data_type.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(MigrateError::InvalidColumnChange(format!(
                "empty data type for column '{}'",
                self.name
            )));
        }
        let untouched = self.data_type.is_none()
            && self.nullable.is_none()
            && self.unsigned.is_none()
            && self.auto_increment.is_none()
            && self.position.is_none()
            && self.default.is_keep()
            && self.on_update.is_keep()
            && self.comment.is_keep()
            && self.charset.is_keep()
            && self.collation.is_keep();
        if untouched {
            return Err(MigrateError::InvalidColumnChange(format!(
                "no change given for column '{}'",
                self.name
            )));
        }
        Ok(())
    }

    /// Merges this change onto the live column definition.
    #[must_use]
    pub fn merge(&self, current: &ColumnDefinition) -> ColumnDefinition {
        let unsigned = self.unsigned.or(current.unsigned);
        let mut data_type = self
            .data_type
            .clone()
            .unwrap_or_else(|| current.data_type.clone());
        if unsigned == Some(false) {
            data_type = UNSIGNED_RE.replace_all(&data_type, "").into_owned();
        }

        ColumnDefinition {
            name: current.name.clone(),
            data_type,
            nullable: self.nullable.unwrap_or(current.nullable),
            default: self.default.apply(current.default.as_ref()),
            on_update: self.on_update.apply(current.on_update.as_ref()),
            comment: self.comment.apply(current.comment.as_ref()),
            charset: self.charset.apply(current.charset.as_ref()),
            collation: self.collation.apply(current.collation.as_ref()),
            unsigned,
            auto_increment: self.auto_increment.unwrap_or(current.auto_increment),
            position: self
                .position
                .clone()
                .unwrap_or_else(|| current.position.clone()),
        }
    }
}

/// Everything a `CREATE TABLE` statement declares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTableSpec {
    /// Table name.
    pub table: String,
    /// Columns, in declaration order.
    pub columns: Vec<ColumnDefinition>,
    /// Primary key columns.
    pub primary_key: Vec<String>,
    /// Non-unique indexes.
    pub indexes: Vec<IndexDefinition>,
    /// Unique indexes.
    pub unique_indexes: Vec<IndexDefinition>,
    /// Foreign keys.
    pub foreign_keys: Vec<ForeignKeyDefinition>,
    /// Storage engine (`InnoDB`...).
    pub engine: Option<String>,
    /// Default character set.
    pub charset: Option<String>,
    /// Default collation.
    pub collation: Option<String>,
}

impl CreateTableSpec {
    /// An empty table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            indexes: Vec::new(),
            unique_indexes: Vec::new(),
            foreign_keys: Vec::new(),
            engine: None,
            charset: None,
            collation: None,
        }
    }
}

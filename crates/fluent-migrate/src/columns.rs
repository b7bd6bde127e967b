//! Column shorthands.
//!
//! Free functions build a NOT NULL [`ColumnDefinition`] of a common type;
//! chain the definition's setters to refine it. [`ColumnSink`] adds the same
//! shorthands directly on the builders that declare columns.
//!
//! ```rust,ignore
//! use fluent_migrate::columns::{self, ColumnSink};
//!
//! let table = CreateTable::new("users")
//!     .big_int_column("id")
//!     .varchar_column("email", 255)
//!     .column(columns::text("bio").nullable(true))
//!     .primary_key(["id"]);
//! ```

use crate::schema::ColumnDefinition;

fn with_length(base: &str, length: Option<u32>) -> String {
    match length {
        Some(length) => format!("{base}({length})"),
        None => base.to_string(),
    }
}

/// `INT`.
pub fn int(name: impl Into<String>) -> ColumnDefinition {
    ColumnDefinition::new(name, "INT")
}

/// `INT(length)` display width.
pub fn int_with_length(name: impl Into<String>, length: Option<u32>) -> ColumnDefinition {
    ColumnDefinition::new(name, with_length("INT", length))
}

/// `BIGINT`.
pub fn big_int(name: impl Into<String>) -> ColumnDefinition {
    ColumnDefinition::new(name, "BIGINT")
}

/// `SMALLINT`.
pub fn small_int(name: impl Into<String>) -> ColumnDefinition {
    ColumnDefinition::new(name, "SMALLINT")
}

/// `TINYINT`.
pub fn tiny_int(name: impl Into<String>) -> ColumnDefinition {
    ColumnDefinition::new(name, "TINYINT")
}

/// `VARCHAR(length)`.
pub fn varchar(name: impl Into<String>, length: u32) -> ColumnDefinition {
    ColumnDefinition::new(name, format!("VARCHAR({length})"))
}

/// `CHAR(length)`.
pub fn char(name: impl Into<String>, length: u32) -> ColumnDefinition {
    ColumnDefinition::new(name, format!("CHAR({length})"))
}

/// `TEXT`.
pub fn text(name: impl Into<String>) -> ColumnDefinition {
    ColumnDefinition::new(name, "TEXT")
}

/// `DECIMAL(precision,scale)`.
pub fn decimal(name: impl Into<String>, precision: u32, scale: u32) -> ColumnDefinition {
    ColumnDefinition::new(name, format!("DECIMAL({precision},{scale})"))
}

/// `FLOAT`.
pub fn float(name: impl Into<String>) -> ColumnDefinition {
    ColumnDefinition::new(name, "FLOAT")
}

/// `DOUBLE`.
pub fn double(name: impl Into<String>) -> ColumnDefinition {
    ColumnDefinition::new(name, "DOUBLE")
}

/// Boolean stored as `TINYINT(1)`.
pub fn boolean(name: impl Into<String>) -> ColumnDefinition {
    ColumnDefinition::new(name, "TINYINT(1)")
}

/// `DATE`.
pub fn date(name: impl Into<String>) -> ColumnDefinition {
    ColumnDefinition::new(name, "DATE")
}

/// `DATETIME`.
pub fn date_time(name: impl Into<String>) -> ColumnDefinition {
    ColumnDefinition::new(name, "DATETIME")
}

/// `TIMESTAMP`.
pub fn timestamp(name: impl Into<String>) -> ColumnDefinition {
    ColumnDefinition::new(name, "TIMESTAMP")
}

/// `JSON`.
pub fn json(name: impl Into<String>) -> ColumnDefinition {
    ColumnDefinition::new(name, "JSON")
}

/// Builders that accept column declarations.
///
/// Implementors provide [`ColumnSink::column`]; the typed shorthands come for
/// free and declare NOT NULL columns.
pub trait ColumnSink: Sized {
    /// Declares a column.
    #[must_use]
    fn column(self, column: ColumnDefinition) -> Self;

    /// Declares an `INT` column.
    #[must_use]
    fn int_column(self, name: impl Into<String>) -> Self {
        self.column(int(name))
    }

    /// Declares a `BIGINT` column.
    #[must_use]
    fn big_int_column(self, name: impl Into<String>) -> Self {
        self.column(big_int(name))
    }

    /// Declares a `SMALLINT` column.
    #[must_use]
    fn small_int_column(self, name: impl Into<String>) -> Self {
        self.column(small_int(name))
    }

    /// Declares a `TINYINT` column.
    #[must_use]
    fn tiny_int_column(self, name: impl Into<String>) -> Self {
        self.column(tiny_int(name))
    }

    /// Declares a `VARCHAR(length)` column.
    #[must_use]
    fn varchar_column(self, name: impl Into<String>, length: u32) -> Self {
        self.column(varchar(name, length))
    }

    /// Declares a `CHAR(length)` column.
    #[must_use]
    fn char_column(self, name: impl Into<String>, length: u32) -> Self {
        self.column(char(name, length))
    }

    /// Declares a `TEXT` column.
    #[must_use]
    fn text_column(self, name: impl Into<String>) -> Self {
        self.column(text(name))
    }

    /// Declares a `DECIMAL(precision,scale)` column.
    #[must_use]
    fn decimal_column(self, name: impl Into<String>, precision: u32, scale: u32) -> Self {
        self.column(decimal(name, precision, scale))
    }

    /// Declares a `FLOAT` column.
    #[must_use]
    fn float_column(self, name: impl Into<String>) -> Self {
        self.column(float(name))
    }

    /// Declares a `DOUBLE` column.
    #[must_use]
    fn double_column(self, name: impl Into<String>) -> Self {
        self.column(double(name))
    }

    /// Declares a boolean column.
    #[must_use]
    fn boolean_column(self, name: impl Into<String>) -> Self {
        self.column(boolean(name))
    }

    /// Declares a `DATE` column.
    #[must_use]
    fn date_column(self, name: impl Into<String>) -> Self {
        self.column(date(name))
    }

    /// Declares a `DATETIME` column.
    #[must_use]
    fn date_time_column(self, name: impl Into<String>) -> Self {
        self.column(date_time(name))
    }

    /// Declares a `TIMESTAMP` column.
    #[must_use]
    fn timestamp_column(self, name: impl Into<String>) -> Self {
        self.column(timestamp(name))
    }

    /// Declares a `JSON` column.
    #[must_use]
    fn json_column(self, name: impl Into<String>) -> Self {
        self.column(json(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_text() {
        assert_eq!(int("a").data_type, "INT");
        assert_eq!(int_with_length("a", Some(11)).data_type, "INT(11)");
        assert_eq!(int_with_length("a", None).data_type, "INT");
        assert_eq!(varchar("a", 20).data_type, "VARCHAR(20)");
        assert_eq!(decimal("a", 10, 2).data_type, "DECIMAL(10,2)");
        assert_eq!(boolean("a").data_type, "TINYINT(1)");
    }

    #[test]
    fn test_shorthands_are_not_null() {
        assert!(!text("bio").nullable);
        assert!(text("bio").nullable(true).nullable);
    }
}

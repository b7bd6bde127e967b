//! Engine-specific DDL rendering.
//!
//! The [`SqlRenderer`] trait carries the shared rendering rules as default
//! methods; each engine supplies its quote character and capability flags and
//! overrides the statements whose syntax differs.

mod ansi;
mod mysql;
mod sqlite;

use crate::engine::{Engine, EngineInfo};
use crate::error::{MigrateError, Result};
use crate::schema::{
    ColumnDefinition, ColumnPosition, CreateTableSpec, DefaultValue, ForeignKeyDefinition,
    IndexDefinition,
};

pub use ansi::AnsiRenderer;
pub use mysql::MySqlRenderer;
pub use sqlite::SqliteRenderer;

/// Renders schema objects into executable DDL statements.
pub trait SqlRenderer: Send + Sync {
    /// Engine name used in error messages.
    fn engine_name(&self) -> &'static str;

    /// Identifier quote character.
    fn quote_char(&self) -> char;

    /// Whether non-unique indexes can be declared inside `CREATE TABLE`.
    fn supports_inline_indexes(&self) -> bool;

    /// Whether `FIRST` / `AFTER` column placement is understood.
    fn supports_column_positioning(&self) -> bool;

    /// Whether MySQL column attributes (`ON UPDATE`, `AUTO_INCREMENT`,
    /// `COMMENT`, `CHARACTER SET`) are emitted.
    fn supports_column_attributes(&self) -> bool {
        false
    }

    /// Quotes an identifier, doubling embedded quote characters.
    fn quote_identifier(&self, name: &str) -> String {
        let q = self.quote_char();
        let escaped = name.replace(q, &format!("{q}{q}"));
        format!("{q}{escaped}{q}")
    }

    /// Quotes a string literal.
    fn quote_value(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Renders a default value.
    fn render_default(&self, value: &DefaultValue) -> String {
        match value {
            DefaultValue::Bool(b) => String::from(if *b { "1" } else { "0" }),
            DefaultValue::Int(i) => i.to_string(),
            DefaultValue::Float(f) => f.to_string(),
            DefaultValue::Text(s) => self.quote_value(s),
            DefaultValue::Expr(expr) => expr.sql().unwrap_or("NULL").to_string(),
        }
    }

    /// Renders a column definition (without position).
    fn render_column_definition(&self, column: &ColumnDefinition) -> String {
        let mut sql = format!(
            "{} {}",
            self.quote_identifier(&column.name),
            column.data_type
        );
        if column.unsigned == Some(true)
            && !column.data_type.to_ascii_lowercase().contains("unsigned")
        {
            sql.push_str(" UNSIGNED");
        }
        if self.supports_column_attributes() {
            if let Some(charset) = &column.charset {
                sql.push_str(" CHARACTER SET ");
                sql.push_str(charset);
            }
        }
        if let Some(collation) = &column.collation {
            sql.push_str(" COLLATE ");
            sql.push_str(collation);
        }
        sql.push_str(if column.nullable { " NULL" } else { " NOT NULL" });
        if let Some(default) = &column.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(&self.render_default(default));
        }
        if self.supports_column_attributes() {
            if let Some(on_update) = &column.on_update {
                sql.push_str(" ON UPDATE ");
                sql.push_str(on_update.sql().unwrap_or("NULL"));
            }
            if column.auto_increment {
                sql.push_str(" AUTO_INCREMENT");
            }
            if let Some(comment) = &column.comment {
                sql.push_str(" COMMENT ");
                sql.push_str(&self.quote_value(comment));
            }
        }
        sql
    }

    /// ` FIRST` / ` AFTER col`, or nothing when positioning is unsupported.
    fn render_position(&self, position: &ColumnPosition) -> String {
        if !self.supports_column_positioning() {
            return String::new();
        }
        match position {
            ColumnPosition::Unspecified => String::new(),
            ColumnPosition::First => " FIRST".to_string(),
            ColumnPosition::After(column) => format!(" AFTER {}", self.quote_identifier(column)),
        }
    }

    /// Comma-separated quoted identifiers.
    fn render_column_list(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Unique index line inside `CREATE TABLE`, when supported. Otherwise
    /// the index follows the table as its own `CREATE UNIQUE INDEX`, so it
    /// keeps its name.
    fn render_inline_unique(&self, _index: &IndexDefinition) -> Option<String> {
        None
    }

    /// Non-unique index line inside `CREATE TABLE`, when supported.
    fn render_inline_index(&self, _index: &IndexDefinition) -> Option<String> {
        None
    }

    /// `FOREIGN KEY (...) REFERENCES t(...) [ON DELETE ..] [ON UPDATE ..]`.
    fn render_foreign_key_clause(&self, fk: &ForeignKeyDefinition) -> String {
        let mut sql = format!(
            "FOREIGN KEY ({}) REFERENCES {}({})",
            self.render_column_list(&fk.local_columns),
            self.quote_identifier(&fk.foreign_table),
            self.render_column_list(&fk.foreign_columns)
        );
        if let Some(action) = fk.on_delete {
            sql.push_str(" ON DELETE ");
            sql.push_str(action.as_sql());
        }
        if let Some(action) = fk.on_update {
            sql.push_str(" ON UPDATE ");
            sql.push_str(action.as_sql());
        }
        sql
    }

    /// Table options after the closing parenthesis of `CREATE TABLE`.
    fn render_table_options(&self, spec: &CreateTableSpec) -> String {
        let mut sql = String::new();
        if let Some(engine) = &spec.engine {
            sql.push_str(&format!(" ENGINE={engine}"));
        }
        if let Some(charset) = &spec.charset {
            sql.push_str(&format!(" DEFAULT CHARSET={charset}"));
        }
        if let Some(collation) = &spec.collation {
            sql.push_str(&format!(" COLLATE={collation}"));
        }
        sql
    }

    /// `CREATE TABLE IF NOT EXISTS ...`.
    fn render_create_table(&self, spec: &CreateTableSpec) -> Result<Vec<String>> {
        let mut lines: Vec<String> = spec
            .columns
            .iter()
            .map(|c| self.render_column_definition(c))
            .collect();
        if !spec.primary_key.is_empty() {
            lines.push(format!(
                "PRIMARY KEY ({})",
                self.render_column_list(&spec.primary_key)
            ));
        }
        let mut separate = Vec::new();
        for index in &spec.unique_indexes {
            match self.render_inline_unique(index) {
                Some(line) => lines.push(line),
                None => separate.push(index),
            }
        }
        lines.extend(spec.indexes.iter().filter_map(|i| self.render_inline_index(i)));
        lines.extend(spec.foreign_keys.iter().map(|fk| {
            format!(
                "CONSTRAINT {} {}",
                self.quote_identifier(&fk.name),
                self.render_foreign_key_clause(fk)
            )
        }));

        let mut statements = vec![format!(
            "CREATE TABLE IF NOT EXISTS {} (\n\t{}\n){};",
            self.quote_identifier(&spec.table),
            lines.join(",\n\t"),
            self.render_table_options(spec)
        )];
        for index in separate {
            statements.extend(self.render_add_index(&spec.table, index)?);
        }
        Ok(statements)
    }

    /// `DROP TABLE IF EXISTS t;`.
    fn render_drop_table(&self, table: &str) -> Result<Vec<String>> {
        Ok(vec![format!(
            "DROP TABLE IF EXISTS {};",
            self.quote_identifier(table)
        )])
    }

    /// `ALTER TABLE t ADD COLUMN ...`.
    fn render_add_column(&self, table: &str, column: &ColumnDefinition) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} ADD COLUMN {}{};",
            self.quote_identifier(table),
            self.render_column_definition(column),
            self.render_position(&column.position)
        )])
    }

    /// `ALTER TABLE t DROP COLUMN c;`.
    fn render_drop_column(&self, table: &str, column: &str) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} DROP COLUMN {};",
            self.quote_identifier(table),
            self.quote_identifier(column)
        )])
    }

    /// Redefines an existing column.
    fn render_modify_column(&self, table: &str, column: &ColumnDefinition) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} MODIFY COLUMN {}{};",
            self.quote_identifier(table),
            self.render_column_definition(column),
            self.render_position(&column.position)
        )])
    }

    /// `CREATE [UNIQUE ]INDEX i ON t (...)`.
    fn render_add_index(&self, table: &str, index: &IndexDefinition) -> Result<Vec<String>> {
        Ok(vec![format!(
            "CREATE {}INDEX {} ON {} ({});",
            if index.unique { "UNIQUE " } else { "" },
            self.quote_identifier(&index.name),
            self.quote_identifier(table),
            self.render_column_list(&index.columns)
        )])
    }

    /// `DROP INDEX i;`.
    fn render_drop_index(&self, _table: &str, index: &str) -> Result<Vec<String>> {
        Ok(vec![format!("DROP INDEX {};", self.quote_identifier(index))])
    }

    /// `ALTER TABLE t ADD PRIMARY KEY (...)`.
    fn render_add_primary_key(&self, table: &str, columns: &[String]) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} ADD PRIMARY KEY ({});",
            self.quote_identifier(table),
            self.render_column_list(columns)
        )])
    }

    /// `ALTER TABLE t DROP PRIMARY KEY;`.
    fn render_drop_primary_key(&self, table: &str) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} DROP PRIMARY KEY;",
            self.quote_identifier(table)
        )])
    }

    /// `ALTER TABLE t ADD CONSTRAINT fk FOREIGN KEY ...`.
    fn render_add_foreign_key(&self, table: &str, fk: &ForeignKeyDefinition) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} ADD CONSTRAINT {} {};",
            self.quote_identifier(table),
            self.quote_identifier(&fk.name),
            self.render_foreign_key_clause(fk)
        )])
    }

    /// `ALTER TABLE t DROP FOREIGN KEY fk;`.
    fn render_drop_foreign_key(&self, table: &str, name: &str) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} DROP FOREIGN KEY {};",
            self.quote_identifier(table),
            self.quote_identifier(name)
        )])
    }
}

/// Picks the renderer for an engine.
#[must_use]
pub fn renderer_for(engine: &EngineInfo) -> Box<dyn SqlRenderer> {
    match engine.engine {
        Engine::MySql | Engine::MariaDb => Box::new(MySqlRenderer),
        Engine::Sqlite => Box::new(SqliteRenderer),
        Engine::Postgres | Engine::SqlServer | Engine::Oracle | Engine::Unknown => {
            Box::new(AnsiRenderer)
        }
    }
}

/// The error returned for statements an engine cannot express.
pub(crate) fn unsupported(engine: &'static str, action: &'static str) -> MigrateError {
    MigrateError::UnsupportedDdl { engine, action }
}

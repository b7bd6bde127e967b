use super::{unsupported, SqlRenderer};
use crate::error::Result;
use crate::schema::{ColumnDefinition, CreateTableSpec};

/// Standard-SQL renderer used for PostgreSQL, SQL Server, Oracle and
/// unidentified engines.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnsiRenderer;

impl SqlRenderer for AnsiRenderer {
    fn engine_name(&self) -> &'static str {
        "ansi"
    }

    fn quote_char(&self) -> char {
        '"'
    }

    fn supports_inline_indexes(&self) -> bool {
        false
    }

    fn supports_column_positioning(&self) -> bool {
        false
    }

    fn render_table_options(&self, _spec: &CreateTableSpec) -> String {
        String::new()
    }

    fn render_modify_column(&self, table: &str, column: &ColumnDefinition) -> Result<Vec<String>> {
        let prefix = format!(
            "ALTER TABLE {} ALTER COLUMN {}",
            self.quote_identifier(table),
            self.quote_identifier(&column.name)
        );
        let nullability = if column.nullable {
            "DROP NOT NULL"
        } else {
            "SET NOT NULL"
        };
        let default = match &column.default {
            Some(value) => format!("SET DEFAULT {}", self.render_default(value)),
            None => "DROP DEFAULT".to_string(),
        };
        Ok(vec![
            format!("{prefix} TYPE {};", column.data_type),
            format!("{prefix} {nullability};"),
            format!("{prefix} {default};"),
        ])
    }

    fn render_drop_primary_key(&self, _table: &str) -> Result<Vec<String>> {
        Err(unsupported(self.engine_name(), "DROP PRIMARY KEY"))
    }

    fn render_drop_foreign_key(&self, table: &str, name: &str) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} DROP CONSTRAINT {};",
            self.quote_identifier(table),
            self.quote_identifier(name)
        )])
    }
}

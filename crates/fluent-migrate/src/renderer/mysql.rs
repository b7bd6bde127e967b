use super::SqlRenderer;
use crate::error::Result;
use crate::schema::{CreateTableSpec, IndexDefinition};

/// MySQL / MariaDB renderer: backtick quoting, inline keys, column placement
/// and `InnoDB` / `utf8mb4` table defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlRenderer;

impl SqlRenderer for MySqlRenderer {
    fn engine_name(&self) -> &'static str {
        "mysql"
    }

    fn quote_char(&self) -> char {
        '`'
    }

    fn supports_inline_indexes(&self) -> bool {
        true
    }

    fn supports_column_positioning(&self) -> bool {
        true
    }

    fn supports_column_attributes(&self) -> bool {
        true
    }

    fn render_inline_unique(&self, index: &IndexDefinition) -> Option<String> {
        Some(format!(
            "UNIQUE KEY {} ({})",
            self.quote_identifier(&index.name),
            self.render_column_list(&index.columns)
        ))
    }

    fn render_inline_index(&self, index: &IndexDefinition) -> Option<String> {
        Some(format!(
            "KEY {} ({})",
            self.quote_identifier(&index.name),
            self.render_column_list(&index.columns)
        ))
    }

    fn render_table_options(&self, spec: &CreateTableSpec) -> String {
        let mut sql = format!(
            " ENGINE={} DEFAULT CHARSET={}",
            spec.engine.as_deref().unwrap_or("InnoDB"),
            spec.charset.as_deref().unwrap_or("utf8mb4")
        );
        if let Some(collation) = &spec.collation {
            sql.push_str(&format!(" COLLATE={collation}"));
        }
        sql
    }

    fn render_drop_index(&self, table: &str, index: &str) -> Result<Vec<String>> {
        Ok(vec![format!(
            "DROP INDEX {} ON {};",
            self.quote_identifier(index),
            self.quote_identifier(table)
        )])
    }
}

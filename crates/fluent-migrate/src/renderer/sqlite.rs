use super::{unsupported, SqlRenderer};
use crate::error::Result;
use crate::schema::{ColumnDefinition, CreateTableSpec, ForeignKeyDefinition};

/// SQLite renderer.
///
/// SQLite cannot alter column definitions, primary keys or foreign keys of an
/// existing table; those statements are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteRenderer;

impl SqlRenderer for SqliteRenderer {
    fn engine_name(&self) -> &'static str {
        "sqlite"
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

    fn render_modify_column(&self, _table: &str, _column: &ColumnDefinition) -> Result<Vec<String>> {
        Err(unsupported(self.engine_name(), "MODIFY COLUMN"))
    }

    fn render_add_primary_key(&self, _table: &str, _columns: &[String]) -> Result<Vec<String>> {
        Err(unsupported(self.engine_name(), "ADD PRIMARY KEY"))
    }

    fn render_drop_primary_key(&self, _table: &str) -> Result<Vec<String>> {
        Err(unsupported(self.engine_name(), "DROP PRIMARY KEY"))
    }

    fn render_add_foreign_key(
        &self,
        _table: &str,
        _fk: &ForeignKeyDefinition,
    ) -> Result<Vec<String>> {
        Err(unsupported(self.engine_name(), "ADD FOREIGN KEY"))
    }

    fn render_drop_foreign_key(&self, _table: &str, _name: &str) -> Result<Vec<String>> {
        Err(unsupported(self.engine_name(), "DROP FOREIGN KEY"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MigrateError;
    use crate::schema::IndexDefinition;

    #[test]
    fn test_create_table_moves_unique_indexes_out() {
        let mut spec = CreateTableSpec::new("t");
        spec.columns.push(ColumnDefinition::new("id", "INT"));
        spec.columns
            .push(ColumnDefinition::new("email", "TEXT").comment("ignored"));
        spec.primary_key.push("id".into());
        spec.unique_indexes
            .push(IndexDefinition::unique("uq_email", ["email"]));
        spec.indexes.push(IndexDefinition::new("idx_email", ["email"]));
        spec.engine = Some("InnoDB".into());

        let sql = SqliteRenderer.render_create_table(&spec).unwrap();
        assert_eq!(
            sql,
            vec![
                "CREATE TABLE IF NOT EXISTS \"t\" (\n\
                 \t\"id\" INT NOT NULL,\n\
                 \t\"email\" TEXT NOT NULL,\n\
                 \tPRIMARY KEY (\"id\")\n\
                 );"
                .to_string(),
                "CREATE UNIQUE INDEX \"uq_email\" ON \"t\" (\"email\");".to_string(),
            ]
        );
    }

    #[test]
    fn test_position_hints_dropped() {
        let column = ColumnDefinition::new("b", "INT").nullable(true).first();
        assert_eq!(
            SqliteRenderer.render_add_column("t", &column).unwrap(),
            vec!["ALTER TABLE \"t\" ADD COLUMN \"b\" INT NULL;"]
        );
    }

    #[test]
    fn test_bare_drop_index() {
        assert_eq!(
            SqliteRenderer.render_drop_index("t", "idx").unwrap(),
            vec!["DROP INDEX \"idx\";"]
        );
    }

    #[test]
    fn test_rejects_unsupported_alters() {
        let err = SqliteRenderer
            .render_modify_column("t", &ColumnDefinition::new("a", "INT"))
            .unwrap_err();
        assert!(matches!(
            err,
            MigrateError::UnsupportedDdl {
                engine: "sqlite",
                action: "MODIFY COLUMN"
            }
        ));
        assert!(SqliteRenderer.render_drop_primary_key("t").is_err());
        assert!(SqliteRenderer.render_drop_foreign_key("t", "fk").is_err());
    }
}

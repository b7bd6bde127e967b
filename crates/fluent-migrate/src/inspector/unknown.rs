use async_trait::async_trait;

use super::SchemaInspector;
use crate::schema::{ColumnDefinition, ForeignKeyDefinition, IndexDefinition};

/// Inspector for engines without introspection support: nothing exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownSchemaInspector;

#[async_trait]
impl SchemaInspector for UnknownSchemaInspector {
    async fn table_exists(&self, _table: &str) -> bool {
        false
    }

    async fn create_table_sql(&self, _table: &str) -> Option<Vec<String>> {
        None
    }

    async fn columns(&self, _table: &str) -> Vec<ColumnDefinition> {
        Vec::new()
    }

    async fn indexes(&self, _table: &str) -> Vec<IndexDefinition> {
        Vec::new()
    }

    async fn foreign_keys(&self, _table: &str) -> Vec<ForeignKeyDefinition> {
        Vec::new()
    }
}

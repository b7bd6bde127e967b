//! Live schema introspection.
//!
//! Operations consult a [`SchemaInspector`] before touching the schema so
//! that applying them twice is harmless. Inspectors never fail: a query that
//! errors is logged at debug level and treated as "not found".

mod mysql;
mod sqlite;
mod unknown;

use std::sync::Arc;

use async_trait::async_trait;

use crate::database::Database;
use crate::engine::{Engine, EngineInfo};
use crate::schema::{ColumnDefinition, ColumnPosition, ForeignKeyDefinition, IndexDefinition};

pub use mysql::MySqlSchemaInspector;
pub use sqlite::SqliteSchemaInspector;
pub use unknown::UnknownSchemaInspector;

/// Reads the current schema of the target database.
#[async_trait]
pub trait SchemaInspector: Send + Sync {
    /// Whether the table exists.
    async fn table_exists(&self, table: &str) -> bool;

    /// Statements that recreate the table as it is now, starting with its
    /// `CREATE TABLE`. `None` when the table does not exist.
    async fn create_table_sql(&self, table: &str) -> Option<Vec<String>>;

    /// Columns in physical order. Each column's position names its
    /// predecessor (`First` for the first one).
    async fn columns(&self, table: &str) -> Vec<ColumnDefinition>;

    /// A single column.
    async fn column(&self, table: &str, name: &str) -> Option<ColumnDefinition> {
        self.columns(table)
            .await
            .into_iter()
            .find(|column| column.name == name)
    }

    /// Indexes, including the primary key (named `PRIMARY`).
    async fn indexes(&self, table: &str) -> Vec<IndexDefinition>;

    /// A single index.
    async fn index(&self, table: &str, name: &str) -> Option<IndexDefinition> {
        self.indexes(table)
            .await
            .into_iter()
            .find(|index| index.name == name)
    }

    /// Foreign keys.
    async fn foreign_keys(&self, table: &str) -> Vec<ForeignKeyDefinition>;

    /// A single foreign key.
    async fn foreign_key(&self, table: &str, name: &str) -> Option<ForeignKeyDefinition> {
        self.foreign_keys(table)
            .await
            .into_iter()
            .find(|fk| fk.name == name)
    }
}

/// Picks the inspector for an engine.
#[must_use]
pub fn inspector_for(db: Arc<dyn Database>, engine: &EngineInfo) -> Box<dyn SchemaInspector> {
    match engine.engine {
        Engine::MySql | Engine::MariaDb => Box::new(MySqlSchemaInspector::new(db)),
        Engine::Sqlite => Box::new(SqliteSchemaInspector::new(db)),
        Engine::Postgres | Engine::SqlServer | Engine::Oracle | Engine::Unknown => {
            Box::new(UnknownSchemaInspector)
        }
    }
}

/// Fills in each column's position from its predecessor.
fn assign_positions(columns: &mut [ColumnDefinition]) {
    let mut previous: Option<String> = None;
    for column in columns.iter_mut() {
        column.position = match previous.take() {
            Some(name) => ColumnPosition::After(name),
            None => ColumnPosition::First,
        };
        previous = Some(column.name.clone());
    }
}

/// Groups rows into ordered `(key, items)` buckets, keeping first-seen order.
fn group_ordered<T>(items: impl IntoIterator<Item = (String, T)>) -> Vec<(String, Vec<T>)> {
    let mut groups: Vec<(String, Vec<T>)> = Vec::new();
    for (key, item) in items {
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, bucket)) => bucket.push(item),
            None => groups.push((key, vec![item])),
        }
    }
    groups
}

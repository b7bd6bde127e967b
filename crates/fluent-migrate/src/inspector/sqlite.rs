use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{assign_positions, group_ordered, SchemaInspector};
use crate::database::{Database, Row, Value};
use crate::schema::{ColumnDefinition, DefaultValue, Expr, ForeignKeyDefinition, IndexDefinition};

/// Name under which the primary key index is reported.
const PRIMARY: &str = "PRIMARY";

/// Inspector for SQLite, backed by `sqlite_master` and the pragma
/// table-valued functions.
///
/// The primary key is always reported as an index named `PRIMARY`, also for
/// `INTEGER PRIMARY KEY` tables where SQLite keeps no separate index. Foreign
/// keys have no names in SQLite and are reported as `fk_<table>_<id>`.
pub struct SqliteSchemaInspector {
    db: Arc<dyn Database>,
}

impl SqliteSchemaInspector {
    /// Creates an inspector over `db`.
    #[must_use]
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    async fn rows(&self, sql: &str, name: &str) -> Vec<Row> {
        match self.db.query(sql, &[("t", Value::from(name))]).await {
            Ok(result) => result.rows,
            Err(err) => {
                debug!(name = %name, error = %err, "Introspection query failed");
                Vec::new()
            }
        }
    }

    /// Primary key columns ordered by their `pk` ordinal.
    async fn primary_key_columns(&self, table: &str) -> Vec<String> {
        let mut keyed: Vec<(i64, String)> = self
            .rows("SELECT name, pk FROM pragma_table_info(:t)", table)
            .await
            .iter()
            .filter_map(|row| {
                let pk = row.int("pk").filter(|pk| *pk > 0)?;
                Some((pk, row.text("name")?))
            })
            .collect();
        keyed.sort_by_key(|(pk, _)| *pk);
        keyed.into_iter().map(|(_, name)| name).collect()
    }
}

#[async_trait]
impl SchemaInspector for SqliteSchemaInspector {
    async fn table_exists(&self, table: &str) -> bool {
        self.rows(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = :t",
            table,
        )
        .await
        .first()
        .and_then(Row::first)
        .and_then(Value::as_i64)
        .is_some_and(|count| count > 0)
    }

    async fn create_table_sql(&self, table: &str) -> Option<Vec<String>> {
        let create = self
            .rows(
                "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = :t",
                table,
            )
            .await
            .first()
            .and_then(|row| row.text("sql"))?;

        let mut statements = vec![create];
        statements.extend(
            self.rows(
                "SELECT sql FROM sqlite_master \
                 WHERE type = 'index' AND tbl_name = :t AND sql IS NOT NULL \
                 ORDER BY name",
                table,
            )
            .await
            .iter()
            .filter_map(|row| row.text("sql")),
        );
        Some(statements)
    }

    async fn columns(&self, table: &str) -> Vec<ColumnDefinition> {
        let mut columns: Vec<ColumnDefinition> = self
            .rows("SELECT * FROM pragma_table_info(:t) ORDER BY cid", table)
            .await
            .iter()
            .map(|row| {
                let mut column = ColumnDefinition::new(
                    row.text("name").unwrap_or_default(),
                    row.text("type").unwrap_or_default(),
                );
                column.nullable = row.int("notnull") == Some(0);
                column.default = row
                    .text("dflt_value")
                    .map(|value| DefaultValue::Expr(Expr::raw(value)));
                column
            })
            .collect();
        assign_positions(&mut columns);
        columns
    }

    async fn indexes(&self, table: &str) -> Vec<IndexDefinition> {
        let mut indexes = Vec::new();
        let mut has_primary = false;

        for row in self.rows("SELECT * FROM pragma_index_list(:t)", table).await {
            let Some(name) = row.text("name") else {
                continue;
            };
            let columns = self
                .rows("SELECT * FROM pragma_index_info(:t) ORDER BY seqno", &name)
                .await
                .iter()
                .filter_map(|info| info.text("name"))
                .collect();
            let primary = row.text("origin").as_deref() == Some("pk");
            has_primary |= primary;
            indexes.push(IndexDefinition {
                name: if primary { PRIMARY.to_string() } else { name },
                columns,
                unique: row.int("unique") == Some(1),
                primary,
                index_type: None,
            });
        }

        if !has_primary {
            let columns = self.primary_key_columns(table).await;
            if !columns.is_empty() {
                indexes.insert(
                    0,
                    IndexDefinition {
                        name: PRIMARY.to_string(),
                        columns,
                        unique: true,
                        primary: true,
                        index_type: None,
                    },
                );
            }
        }

        indexes
    }

    async fn foreign_keys(&self, table: &str) -> Vec<ForeignKeyDefinition> {
        let rows = self
            .rows(
                "SELECT * FROM pragma_foreign_key_list(:t) ORDER BY id, seq",
                table,
            )
            .await;
        group_ordered(rows.into_iter().filter_map(|row| {
            let id = row.int("id")?;
            Some((id.to_string(), row))
        }))
        .into_iter()
        .map(|(id, rows)| {
            let first = &rows[0];
            ForeignKeyDefinition {
                name: format!("fk_{table}_{id}"),
                foreign_table: first.text("table").unwrap_or_default(),
                on_update: first.text("on_update").and_then(|r| r.parse().ok()),
                on_delete: first.text("on_delete").and_then(|r| r.parse().ok()),
                local_columns: rows.iter().filter_map(|r| r.text("from")).collect(),
                foreign_columns: rows.iter().filter_map(|r| r.text("to")).collect(),
            }
        })
        .collect()
    }
}

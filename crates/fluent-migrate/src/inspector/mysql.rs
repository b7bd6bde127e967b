use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use super::{assign_positions, group_ordered, SchemaInspector};
use crate::database::{Database, Row, Value};
use crate::schema::{
    ColumnDefinition, DefaultValue, Expr, ForeignKeyDefinition, IndexDefinition,
};

static ON_UPDATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)on update (.+)$").expect("valid on update regex"));
static INTEGER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+$").expect("valid integer regex"));
static DECIMAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d*\.\d+$").expect("valid decimal regex"));

const TABLE_EXISTS_SQL: &str = "
SELECT COUNT(*)
  FROM information_schema.tables
 WHERE table_schema = DATABASE()
   AND table_name = :t";

const COLUMNS_SQL: &str = "
SELECT COLUMN_NAME, COLUMN_TYPE, IS_NULLABLE, COLUMN_DEFAULT, EXTRA,
       COLUMN_COMMENT, CHARACTER_SET_NAME, COLLATION_NAME, ORDINAL_POSITION
  FROM information_schema.columns
 WHERE table_schema = DATABASE()
   AND table_name = :t
 ORDER BY ORDINAL_POSITION";

const INDEXES_SQL: &str = "
SELECT INDEX_NAME, NON_UNIQUE, COLUMN_NAME, SEQ_IN_INDEX, INDEX_TYPE
  FROM information_schema.statistics
 WHERE table_schema = DATABASE()
   AND table_name = :t
 ORDER BY INDEX_NAME, SEQ_IN_INDEX";

const FOREIGN_KEYS_SQL: &str = "
SELECT rc.CONSTRAINT_NAME, kcu.COLUMN_NAME, kcu.REFERENCED_TABLE_NAME,
       kcu.REFERENCED_COLUMN_NAME, rc.UPDATE_RULE, rc.DELETE_RULE, kcu.ORDINAL_POSITION
  FROM information_schema.referential_constraints rc
  JOIN information_schema.key_column_usage kcu
    ON rc.CONSTRAINT_SCHEMA = kcu.CONSTRAINT_SCHEMA
   AND rc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME
 WHERE rc.CONSTRAINT_SCHEMA = DATABASE()
   AND rc.TABLE_NAME = :t
 ORDER BY rc.CONSTRAINT_NAME, kcu.ORDINAL_POSITION";

/// Inspector for MySQL and MariaDB, backed by `information_schema`.
pub struct MySqlSchemaInspector {
    db: Arc<dyn Database>,
}

impl MySqlSchemaInspector {
    /// Creates an inspector over `db`.
    #[must_use]
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    async fn rows(&self, sql: &str, table: &str) -> Vec<Row> {
        match self.db.query(sql, &[("t", Value::from(table))]).await {
            Ok(result) => result.rows,
            Err(err) => {
                debug!(table = %table, error = %err, "Introspection query failed");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl SchemaInspector for MySqlSchemaInspector {
    async fn table_exists(&self, table: &str) -> bool {
        self.rows(TABLE_EXISTS_SQL, table)
            .await
            .first()
            .and_then(Row::first)
            .and_then(Value::as_i64)
            .is_some_and(|count| count > 0)
    }

    async fn create_table_sql(&self, table: &str) -> Option<Vec<String>> {
        let sql = format!("SHOW CREATE TABLE {}", quote(table));
        let result = match self.db.query(&sql, &[]).await {
            Ok(result) => result,
            Err(err) => {
                debug!(table = %table, error = %err, "SHOW CREATE TABLE failed");
                return None;
            }
        };
        let create = result
            .first()?
            .iter()
            .find(|(key, _)| key.to_ascii_lowercase().contains("create table"))
            .and_then(|(_, value)| value.as_text())?;
        Some(vec![create])
    }

    async fn columns(&self, table: &str) -> Vec<ColumnDefinition> {
        let mut columns: Vec<ColumnDefinition> = self
            .rows(COLUMNS_SQL, table)
            .await
            .iter()
            .map(column_from_row)
            .collect();
        assign_positions(&mut columns);
        columns
    }

    async fn indexes(&self, table: &str) -> Vec<IndexDefinition> {
        let rows = self.rows(INDEXES_SQL, table).await;
        group_ordered(rows.into_iter().filter_map(|row| {
            let name = row.text("INDEX_NAME")?;
            Some((name, row))
        }))
        .into_iter()
        .map(|(name, rows)| {
            let first = &rows[0];
            IndexDefinition {
                unique: first.int("NON_UNIQUE") == Some(0),
                primary: name == "PRIMARY",
                index_type: first.text("INDEX_TYPE"),
                columns: rows.iter().filter_map(|r| r.text("COLUMN_NAME")).collect(),
                name,
            }
        })
        .collect()
    }

    async fn foreign_keys(&self, table: &str) -> Vec<ForeignKeyDefinition> {
        let rows = self.rows(FOREIGN_KEYS_SQL, table).await;
        group_ordered(rows.into_iter().filter_map(|row| {
            let name = row.text("CONSTRAINT_NAME")?;
            Some((name, row))
        }))
        .into_iter()
        .map(|(name, rows)| {
            let first = &rows[0];
            ForeignKeyDefinition {
                foreign_table: first.text("REFERENCED_TABLE_NAME").unwrap_or_default(),
                on_update: first.text("UPDATE_RULE").and_then(|r| r.parse().ok()),
                on_delete: first.text("DELETE_RULE").and_then(|r| r.parse().ok()),
                local_columns: rows.iter().filter_map(|r| r.text("COLUMN_NAME")).collect(),
                foreign_columns: rows
                    .iter()
                    .filter_map(|r| r.text("REFERENCED_COLUMN_NAME"))
                    .collect(),
                name,
            }
        })
        .collect()
    }
}

fn quote(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn column_from_row(row: &Row) -> ColumnDefinition {
    let data_type = row.text("COLUMN_TYPE").unwrap_or_default();
    let extra = row.text("EXTRA").unwrap_or_default();
    let unsigned = data_type.to_ascii_lowercase().contains("unsigned");

    let mut column = ColumnDefinition::new(row.text("COLUMN_NAME").unwrap_or_default(), data_type);
    column.nullable = row.text("IS_NULLABLE").as_deref() == Some("YES");
    column.default = row.get("COLUMN_DEFAULT").and_then(parse_default);
    column.on_update = ON_UPDATE_RE
        .captures(&extra)
        .and_then(|caps| caps.get(1))
        .map(|m| Expr::raw(m.as_str().trim()));
    column.comment = row.text("COLUMN_COMMENT").filter(|c| !c.is_empty());
    column.charset = row.text("CHARACTER_SET_NAME");
    column.collation = row.text("COLLATION_NAME");
    column.unsigned = Some(unsigned);
    column.auto_increment = extra.to_ascii_lowercase().contains("auto_increment");
    column
}

/// Interprets an `information_schema.columns.COLUMN_DEFAULT` value.
fn parse_default(value: &Value) -> Option<DefaultValue> {
    let text = match value {
        Value::Null => return None,
        Value::Integer(i) => return Some(DefaultValue::Int(*i)),
        Value::Real(f) => return Some(DefaultValue::Float(*f)),
        Value::Blob(_) => return None,
        Value::Text(text) => text.trim(),
    };

    if text.len() >= 2 && text.starts_with('\'') && text.ends_with('\'') {
        return Some(DefaultValue::Text(text[1..text.len() - 1].replace("''", "'")));
    }
    if INTEGER_RE.is_match(text) {
        if let Ok(i) = text.parse() {
            return Some(DefaultValue::Int(i));
        }
    }
    if DECIMAL_RE.is_match(text) {
        if let Ok(f) = text.parse() {
            return Some(DefaultValue::Float(f));
        }
    }
    let upper = text.to_ascii_uppercase();
    if matches!(
        upper.as_str(),
        "CURRENT_TIMESTAMP" | "CURRENT_TIMESTAMP()" | "NOW()" | "NULL"
    ) {
        return Some(DefaultValue::Expr(Expr::raw(text)));
    }
    Some(DefaultValue::Text(text.to_string()))
}

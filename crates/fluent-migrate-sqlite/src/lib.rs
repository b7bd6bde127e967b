//! SQLite driver for fluent-migrate.
//!
//! [`SqliteDatabase`] implements [`fluent_migrate::database::Database`] on
//! top of an `sqlx` connection pool, so migrations, the ledger and the schema
//! inspector can all run against a SQLite file or an in-memory database.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use fluent_migrate::prelude::*;
//! use fluent_migrate_sqlite::SqliteDatabase;
//!
//! let db: Arc<dyn Database> = Arc::new(SqliteDatabase::connect("sqlite:app.db").await?);
//! let ledger = DatabaseLedger::open(db.clone(), "migrations").await?;
//! MigrationManager::new(db, ledger).migrate(&migrations).await?;
//! ```

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use fluent_migrate::database::{Database, ExecResult, Param, QueryResult, Row, Value};
use fluent_migrate::error::{MigrateError, Result};
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, Sqlite, SqlitePool, TypeInfo, ValueRef};
use tracing::debug;

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// A SQLite database reached through an `sqlx` pool.
#[derive(Debug, Clone)]
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Wraps an existing pool.
    #[must_use]
    pub const fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connects to `url` (`sqlite:path`, a bare path or `:memory:`),
    /// creating the database file if it does not exist.
    ///
    /// In-memory databases live inside a single connection, so their pool
    /// is limited to one connection that is never recycled.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(MigrateError::database)?
            .create_if_missing(true);

        let pool = if is_memory_url(url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
                .connect_with(options)
                .await
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await
        }
        .map_err(MigrateError::database)?;

        debug!(url = %url, "Connected to SQLite");
        Ok(Self { pool })
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn exec(&self, sql: &str, params: &[Param<'_>]) -> Result<ExecResult> {
        let (sql, values) = positional(sql, params);
        debug!(sql = %sql, "Executing SQL");
        let result = bind_all(sqlx::query(&sql), values)
            .execute(&self.pool)
            .await
            .map_err(MigrateError::database)?;

        let id = result.last_insert_rowid();
        Ok(ExecResult {
            last_insert_id: (result.rows_affected() > 0 && id != 0).then_some(id),
            rows_affected: result.rows_affected(),
        })
    }

    async fn query(&self, sql: &str, params: &[Param<'_>]) -> Result<QueryResult> {
        let (sql, values) = positional(sql, params);
        debug!(sql = %sql, "Running query");
        let rows = bind_all(sqlx::query(&sql), values)
            .fetch_all(&self.pool)
            .await
            .map_err(MigrateError::database)?;

        let rows = rows.iter().map(convert_row).collect::<Result<Vec<_>>>()?;
        Ok(QueryResult::new(rows))
    }
}

fn is_memory_url(url: &str) -> bool {
    let path = url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    path == ":memory:" || path.contains("mode=memory")
}

/// Rewrites `:name` placeholders to numbered `?N` ones and returns the
/// values in placeholder order.
///
/// A name used twice gets the same number. Quoted text and `::` casts are
/// left untouched. Placeholders without a matching parameter bind NULL.
fn positional(sql: &str, params: &[Param<'_>]) -> (String, Vec<Value>) {
    if params.is_empty() {
        return (sql.to_string(), Vec::new());
    }

    let mut out = String::with_capacity(sql.len());
    let mut names: Vec<&str> = Vec::new();
    let mut quote: Option<char> = None;
    let mut chars = sql.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if let Some(open) = quote {
            out.push(c);
            if c == open {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                out.push(c);
            }
            ':' if !out.ends_with(':')
                && chars
                    .peek()
                    .is_some_and(|(_, next)| next.is_ascii_alphabetic() || *next == '_') =>
            {
                let start = i + 1;
                let mut end = start;
                while let Some(&(j, next)) = chars.peek() {
                    if !(next.is_ascii_alphanumeric() || next == '_') {
                        break;
                    }
                    end = j + next.len_utf8();
                    chars.next();
                }
                let name = &sql[start..end];
                let number = if let Some(pos) = names.iter().position(|n| *n == name) {
                    pos + 1
                } else {
                    names.push(name);
                    names.len()
                };
                out.push('?');
                out.push_str(&number.to_string());
            }
            _ => out.push(c),
        }
    }

    let values = names
        .iter()
        .map(|name| {
            params
                .iter()
                .find(|(param, _)| param.trim_start_matches(':') == *name)
                .map_or(Value::Null, |(_, value)| value.clone())
        })
        .collect();
    (out, values)
}

fn bind_all(query: SqliteQuery<'_>, values: Vec<Value>) -> SqliteQuery<'_> {
    values.into_iter().fold(query, |query, value| match value {
        Value::Null => query.bind(None::<String>),
        Value::Integer(i) => query.bind(i),
        Value::Real(f) => query.bind(f),
        Value::Text(s) => query.bind(s),
        Value::Blob(b) => query.bind(b),
    })
}

fn convert_row(row: &SqliteRow) -> Result<Row> {
    let mut out = Row::new();
    for column in row.columns() {
        let i = column.ordinal();
        let raw = row.try_get_raw(i).map_err(MigrateError::database)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let storage = raw.type_info().name().to_ascii_uppercase();
            match storage.as_str() {
                "INTEGER" | "BOOLEAN" => {
                    Value::Integer(row.try_get_unchecked::<i64, _>(i).map_err(MigrateError::database)?)
                }
                "REAL" => {
                    Value::Real(row.try_get_unchecked::<f64, _>(i).map_err(MigrateError::database)?)
                }
                "BLOB" => {
                    Value::Blob(row.try_get_unchecked::<Vec<u8>, _>(i).map_err(MigrateError::database)?)
                }
                _ => Value::Text(
                    row.try_get_unchecked::<String, _>(i)
                        .map_err(MigrateError::database)?,
                ),
            }
        };
        out.push(column.name(), value);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory() -> SqliteDatabase {
        SqliteDatabase::connect(":memory:").await.unwrap()
    }

    #[test]
    fn test_positional_numbers_names_in_order() {
        let (sql, values) = positional(
            "UPDATE m SET entry = :new_entry WHERE entry = :old_entry OR entry = :new_entry",
            &[("old_entry", Value::from("a")), ("new_entry", Value::from("b"))],
        );
        assert_eq!(sql, "UPDATE m SET entry = ?1 WHERE entry = ?2 OR entry = ?1");
        assert_eq!(values, vec![Value::from("b"), Value::from("a")]);
    }

    #[test]
    fn test_positional_ignores_quoted_text() {
        let (sql, values) = positional(
            "SELECT ':t', \"a:b\", x::text FROM pragma_table_info(:t)",
            &[("t", Value::from("users"))],
        );
        assert_eq!(sql, "SELECT ':t', \"a:b\", x::text FROM pragma_table_info(?1)");
        assert_eq!(values, vec![Value::from("users")]);
    }

    #[test]
    fn test_positional_without_params() {
        let (sql, values) = positional("SELECT ':keep'", &[]);
        assert_eq!(sql, "SELECT ':keep'");
        assert!(values.is_empty());
    }

    #[test]
    fn test_memory_url() {
        assert!(is_memory_url(":memory:"));
        assert!(is_memory_url("sqlite::memory:"));
        assert!(is_memory_url("sqlite://file:shared?mode=memory&cache=shared"));
        assert!(!is_memory_url("sqlite:db.sqlite3"));
    }

    #[tokio::test]
    async fn test_exec_and_query() {
        let db = memory().await;
        db.exec("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT, score REAL, data BLOB)", &[])
            .await
            .unwrap();
        let result = db
            .exec(
                "INSERT INTO t (name, score, data) VALUES (:name, :score, :data)",
                &[
                    ("name", Value::from("alice")),
                    ("score", Value::Real(1.5)),
                    ("data", Value::Blob(vec![1, 2])),
                ],
            )
            .await
            .unwrap();
        assert_eq!(result.rows_affected, 1);
        assert_eq!(result.last_insert_id, Some(1));

        let rows = db
            .query("SELECT * FROM t WHERE name = :name", &[("name", Value::from("alice"))])
            .await
            .unwrap()
            .rows;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].int("id"), Some(1));
        assert_eq!(rows[0].text("name").as_deref(), Some("alice"));
        assert_eq!(rows[0].get("score"), Some(&Value::Real(1.5)));
        assert_eq!(rows[0].get("data"), Some(&Value::Blob(vec![1, 2])));
    }

    #[tokio::test]
    async fn test_null_and_expressions() {
        let db = memory().await;
        let result = db
            .query("SELECT NULL AS n, COUNT(*) AS c, sqlite_version() AS v", &[])
            .await
            .unwrap();
        let row = result.first().unwrap();
        assert_eq!(row.get("n"), Some(&Value::Null));
        assert_eq!(row.int("c"), Some(1));
        assert!(row.text("v").is_some());
    }

    #[tokio::test]
    async fn test_errors_are_database_errors() {
        let db = memory().await;
        let err = db.exec("CREATE TABLE (", &[]).await.unwrap_err();
        assert!(matches!(err, MigrateError::Database(_)));
    }
}

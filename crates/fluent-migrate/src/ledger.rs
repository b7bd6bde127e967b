//! Record of applied migrations.
//!
//! Each applied unit is stored under its entry: the `YYYY-MM-DD-HH-MM-SS`
//! timestamp its file name starts with.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use regex::Regex;
use tracing::{debug, info};

use crate::database::{Database, Value};
use crate::engine::{Engine, EngineInfo};
use crate::error::{MigrateError, Result};
use crate::renderer::renderer_for;

static ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2}-\d{2}-\d{2}-\d{2})").expect("valid entry regex")
});

const ENTRY_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Length of a shortened entry.
pub const ENTRY_LEN: usize = 19;

/// Reduces a migration file name to its leading timestamp.
///
/// `2015-01-01-11-00-00 with a comment.php` becomes `2015-01-01-11-00-00`.
pub fn shorten_entry(name: &str) -> Result<String> {
    ENTRY_RE
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| MigrateError::InvalidEntryName(name.to_string()))
}

/// The point in time an entry names, if it is a valid timestamp.
#[must_use]
pub fn entry_timestamp(entry: &str) -> Option<NaiveDateTime> {
    let short = shorten_entry(entry).ok()?;
    NaiveDateTime::parse_from_str(&short, ENTRY_FORMAT).ok()
}

/// Persistent set of applied migration entries.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// All recorded entries, sorted.
    async fn list_entries(&self) -> Result<Vec<String>>;

    /// Records an entry. The name is shortened first; recording an entry
    /// twice is not an error.
    async fn add_entry(&self, name: &str) -> Result<()>;

    /// Forgets an entry.
    async fn remove_entry(&self, name: &str) -> Result<()>;

    /// Whether an entry is recorded.
    async fn has_entry(&self, name: &str) -> Result<bool> {
        let entry = shorten_entry(name)?;
        Ok(self.list_entries().await?.contains(&entry))
    }
}

/// Ledger stored in a table of the migrated database.
pub struct DatabaseLedger {
    db: Arc<dyn Database>,
    engine: Engine,
    table: String,
}

impl DatabaseLedger {
    /// Opens the ledger table, creating it if needed and shortening any
    /// entries written with their full file name.
    pub async fn open(db: Arc<dyn Database>, table: &str) -> Result<Self> {
        let info = EngineInfo::detect(db.as_ref()).await;
        let ledger = Self {
            table: renderer_for(&info).quote_identifier(table),
            engine: info.engine,
            db,
        };
        ledger.create_store().await?;
        ledger.fix_entries().await?;
        Ok(ledger)
    }

    async fn create_store(&self) -> Result<()> {
        let sql = if self.engine.is_mysql_family() {
            format!(
                "CREATE TABLE IF NOT EXISTS {} (\n\
                 \t`entry` VARCHAR(255) NOT NULL DEFAULT '' COLLATE 'latin1_bin',\n\
                 \tPRIMARY KEY (`entry`)\n\
                 ) COLLATE='latin1_bin' ENGINE=InnoDB;",
                self.table
            )
        } else {
            format!(
                "CREATE TABLE IF NOT EXISTS {} (\n\
                 \t\"entry\" VARCHAR(255) NOT NULL DEFAULT '',\n\
                 \tPRIMARY KEY (\"entry\")\n\
                 );",
                self.table
            )
        };
        debug!(table = %self.table, "Ensuring migration ledger exists");
        self.db.exec(&sql, &[]).await?;
        Ok(())
    }

    /// Renames long entries to their short form, dropping the short form
    /// first when both exist.
    async fn fix_entries(&self) -> Result<()> {
        let sql = format!(
            "SELECT entry FROM {} WHERE LENGTH(entry) != {ENTRY_LEN}",
            self.table
        );
        let rows = self.db.query(&sql, &[]).await?.rows;
        for old in rows.iter().filter_map(|row| row.text("entry")) {
            let Ok(new) = shorten_entry(&old) else {
                debug!(entry = %old, "Leaving unparseable ledger entry as is");
                continue;
            };
            info!(from = %old, to = %new, "Shortening ledger entry");
            self.db
                .exec(
                    &format!("DELETE FROM {} WHERE entry = :entry", self.table),
                    &[("entry", Value::from(new.as_str()))],
                )
                .await?;
            self.db
                .exec(
                    &format!(
                        "UPDATE {} SET entry = :new_entry WHERE entry = :old_entry",
                        self.table
                    ),
                    &[
                        ("new_entry", Value::from(new.as_str())),
                        ("old_entry", Value::from(old.as_str())),
                    ],
                )
                .await?;
        }
        Ok(())
    }

    fn insert_sql(&self) -> String {
        match self.engine {
            Engine::MySql | Engine::MariaDb => {
                format!("INSERT IGNORE INTO {} (entry) VALUES (:entry)", self.table)
            }
            Engine::Sqlite => {
                format!("INSERT OR IGNORE INTO {} (entry) VALUES (:entry)", self.table)
            }
            Engine::Postgres => format!(
                "INSERT INTO {} (entry) VALUES (:entry) ON CONFLICT DO NOTHING",
                self.table
            ),
            Engine::SqlServer | Engine::Oracle | Engine::Unknown => {
                format!("INSERT INTO {} (entry) VALUES (:entry)", self.table)
            }
        }
    }

    fn needs_presence_check(&self) -> bool {
        matches!(
            self.engine,
            Engine::SqlServer | Engine::Oracle | Engine::Unknown
        )
    }
}

#[async_trait]
impl Ledger for DatabaseLedger {
    async fn list_entries(&self) -> Result<Vec<String>> {
        let sql = format!("SELECT entry FROM {}", self.table);
        let mut entries: Vec<String> = self
            .db
            .query(&sql, &[])
            .await?
            .rows
            .iter()
            .filter_map(|row| row.text("entry"))
            .collect();
        entries.sort();
        Ok(entries)
    }

    async fn add_entry(&self, name: &str) -> Result<()> {
        let entry = shorten_entry(name)?;
        if self.needs_presence_check() && self.has_entry(&entry).await? {
            return Ok(());
        }
        self.db
            .exec(&self.insert_sql(), &[("entry", Value::from(entry.as_str()))])
            .await?;
        Ok(())
    }

    async fn remove_entry(&self, name: &str) -> Result<()> {
        let entry = shorten_entry(name)?;
        self.db
            .exec(
                &format!("DELETE FROM {} WHERE entry = :entry", self.table),
                &[("entry", Value::from(entry.as_str()))],
            )
            .await?;
        Ok(())
    }

    async fn has_entry(&self, name: &str) -> Result<bool> {
        let entry = shorten_entry(name)?;
        let sql = format!("SELECT COUNT(*) FROM {} WHERE entry = :entry", self.table);
        let count = self
            .db
            .query(&sql, &[("entry", Value::from(entry.as_str()))])
            .await?
            .first()
            .and_then(|row| row.first())
            .and_then(Value::as_i64)
            .unwrap_or(0);
        Ok(count > 0)
    }
}

impl std::fmt::Debug for DatabaseLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseLedger")
            .field("engine", &self.engine)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Row;
    use crate::testing::RecordingDatabase;

    #[test]
    fn test_shorten_entry() {
        assert_eq!(
            shorten_entry("2015-01-01-11-00-00 with a comment.php").unwrap(),
            "2015-01-01-11-00-00"
        );
        assert_eq!(
            shorten_entry("2015-01-01-11-00-00").unwrap(),
            "2015-01-01-11-00-00"
        );
        assert!(matches!(
            shorten_entry("x2015-01-01-11-00-00.php"),
            Err(MigrateError::InvalidEntryName(_))
        ));
        assert!(shorten_entry("2015-01-01.php").is_err());
    }

    #[test]
    fn test_entry_timestamp() {
        let ts = entry_timestamp("2015-01-01-11-30-05 note.php").unwrap();
        assert_eq!(ts.to_string(), "2015-01-01 11:30:05");
        assert!(entry_timestamp("2015-13-01-11-30-05").is_none());
    }

    #[tokio::test]
    async fn test_open_fixes_long_entries() {
        let db = Arc::new(RecordingDatabase::new());
        db.respond(
            "sqlite_version()",
            vec![Row::new().with("sqlite_version()", "3.45.1")],
        );
        db.respond(
            "LENGTH(entry)",
            vec![Row::new().with("entry", "2015-01-01-11-00-00 with a comment.php")],
        );

        let ledger = DatabaseLedger::open(db.clone(), "migrations").await.unwrap();
        let executed = db.executed();
        assert_eq!(executed.len(), 3);
        assert!(executed[0].starts_with("CREATE TABLE IF NOT EXISTS \"migrations\""));
        assert_eq!(
            executed[1],
            "DELETE FROM \"migrations\" WHERE entry = :entry"
        );
        assert_eq!(
            executed[2],
            "UPDATE \"migrations\" SET entry = :new_entry WHERE entry = :old_entry"
        );

        ledger.add_entry("2016-02-02-10-00-00-users.php").await.unwrap();
        assert_eq!(
            db.executed().last().map(String::as_str),
            Some("INSERT OR IGNORE INTO \"migrations\" (entry) VALUES (:entry)")
        );
    }

    #[tokio::test]
    async fn test_mysql_store_uses_binary_collation() {
        let db = Arc::new(RecordingDatabase::new());
        db.respond(
            "SELECT VERSION()",
            vec![Row::new().with("VERSION()", "8.0.36")],
        );

        let ledger = DatabaseLedger::open(db.clone(), "migrations").await.unwrap();
        assert!(db.executed()[0].contains("COLLATE='latin1_bin' ENGINE=InnoDB"));
        assert!(ledger.insert_sql().starts_with("INSERT IGNORE INTO `migrations`"));
    }

    #[tokio::test]
    async fn test_rejects_invalid_names() {
        let db = Arc::new(RecordingDatabase::new());
        let ledger = DatabaseLedger::open(db, "migrations").await.unwrap();
        assert!(matches!(
            ledger.add_entry("users.php").await,
            Err(MigrateError::InvalidEntryName(_))
        ));
    }
}

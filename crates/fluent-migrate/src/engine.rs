//! Engine identification and version parsing.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::database::Database;

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.(\d+)(?:\.(\d+))?").expect("valid version regex"));

/// A parsed `major.minor[.patch]` server version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// Major component.
    pub major: u32,
    /// Minor component.
    pub minor: u32,
    /// Patch component, 0 when absent.
    pub patch: u32,
    /// The full text the version was extracted from.
    pub raw: String,
}

impl Version {
    /// Extracts the first `major.minor[.patch]` token from free text such as
    /// `10.6.12-MariaDB-log` or `PostgreSQL 15.2 on x86_64`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let caps = VERSION_RE.captures(raw)?;
        let major = caps.get(1)?.as_str().parse().ok()?;
        let minor = caps.get(2)?.as_str().parse().ok()?;
        let patch = match caps.get(3) {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };
        Some(Self {
            major,
            minor,
            patch,
            raw: raw.to_string(),
        })
    }

    /// Lexicographic `>=` comparison on `(major, minor, patch)`.
    #[must_use]
    pub fn is_at_least(&self, major: u32, minor: u32, patch: u32) -> bool {
        (self.major, self.minor, self.patch) >= (major, minor, patch)
    }

    /// Exact match on the major and minor components.
    #[must_use]
    pub const fn matches_major_minor(&self, major: u32, minor: u32) -> bool {
        self.major == major && self.minor == minor
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Database engines the migration engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// Oracle MySQL.
    MySql,
    /// MariaDB.
    MariaDb,
    /// SQLite.
    Sqlite,
    /// PostgreSQL.
    Postgres,
    /// Microsoft SQL Server.
    SqlServer,
    /// Oracle Database.
    Oracle,
    /// Anything else.
    Unknown,
}

impl Engine {
    /// All engines, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::MySql,
        Self::MariaDb,
        Self::Sqlite,
        Self::Postgres,
        Self::SqlServer,
        Self::Oracle,
        Self::Unknown,
    ];

    /// Lowercase engine name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::MariaDb => "mariadb",
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
            Self::SqlServer => "sqlserver",
            Self::Oracle => "oracle",
            Self::Unknown => "unknown",
        }
    }

    /// MySQL and MariaDB share introspection queries and DDL syntax.
    #[must_use]
    pub const fn is_mysql_family(self) -> bool {
        matches!(self, Self::MySql | Self::MariaDb)
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Engine {
    type Err = std::convert::Infallible;

    /// Unrecognized names map to [`Engine::Unknown`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Ok(Self::ALL
            .into_iter()
            .find(|engine| engine.as_str() == name)
            .unwrap_or(Self::Unknown))
    }
}

/// The target engine and its server version, detected once per context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineInfo {
    /// Engine family.
    pub engine: Engine,
    /// Parsed version, when the raw text contained one.
    pub version: Option<Version>,
    /// Version text as reported by the server.
    pub raw_version: Option<String>,
}

impl EngineInfo {
    /// Builds engine info from a raw version string.
    pub fn new(engine: Engine, raw_version: impl Into<String>) -> Self {
        let raw = raw_version.into();
        Self {
            engine,
            version: Version::parse(&raw),
            raw_version: Some(raw),
        }
    }

    /// Engine info without any version information.
    #[must_use]
    pub const fn without_version(engine: Engine) -> Self {
        Self {
            engine,
            version: None,
            raw_version: None,
        }
    }

    /// Engine info for an unidentified server.
    #[must_use]
    pub const fn unknown() -> Self {
        Self::without_version(Engine::Unknown)
    }

    /// Probes the server to find out which engine it runs.
    ///
    /// Probes run in order and the first one that answers wins:
    /// `sqlite_version()`, then `VERSION()` with `@@version_comment`
    /// (MariaDB, PostgreSQL or MySQL), then `@@VERSION` (SQL Server), then
    /// `v$version` (Oracle). A failed probe is not an error.
    pub async fn detect(db: &dyn Database) -> Self {
        if let Some(version) = probe(db, "SELECT sqlite_version()").await {
            return Self::new(Engine::Sqlite, version);
        }

        if let Some(version) = probe(db, "SELECT VERSION()").await {
            if version.to_ascii_lowercase().contains("postgresql") {
                return Self::new(Engine::Postgres, version);
            }
            let comment = probe(db, "SELECT @@version_comment")
                .await
                .unwrap_or_default();
            let is_mariadb = version.to_ascii_lowercase().contains("mariadb")
                || comment.to_ascii_lowercase().contains("mariadb");
            let engine = if is_mariadb {
                Engine::MariaDb
            } else {
                Engine::MySql
            };
            return Self::new(engine, version);
        }

        if let Some(version) = probe(db, "SELECT @@VERSION").await {
            if version.contains("Microsoft SQL Server") {
                return Self::new(Engine::SqlServer, version);
            }
        }

        if let Some(banner) =
            probe(db, "SELECT banner FROM v$version WHERE banner LIKE 'Oracle%'").await
        {
            return Self::new(Engine::Oracle, banner);
        }

        Self::unknown()
    }

    /// Shorthand for `self.engine.is_mysql_family()`.
    #[must_use]
    pub const fn is_mysql_family(&self) -> bool {
        self.engine.is_mysql_family()
    }
}

async fn probe(db: &dyn Database, sql: &str) -> Option<String> {
    match db.query(sql, &[]).await {
        Ok(result) => result.scalar_text(),
        Err(err) => {
            debug!(sql = %sql, error = %err, "Engine probe failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Row;
    use crate::testing::RecordingDatabase;

    #[test]
    fn test_version_parse() {
        let v = Version::parse("10.6.12-MariaDB-log").unwrap();
        assert_eq!((v.major, v.minor, v.patch), (10, 6, 12));
        assert_eq!(v.raw, "10.6.12-MariaDB-log");

        let v = Version::parse("PostgreSQL 15.2 on x86_64").unwrap();
        assert_eq!((v.major, v.minor, v.patch), (15, 2, 0));

        assert!(Version::parse("no digits here").is_none());
        assert!(Version::parse("8").is_none());
    }

    #[test]
    fn test_version_comparisons() {
        let v = Version::parse("3.35.0").unwrap();
        assert!(v.is_at_least(3, 35, 0));
        assert!(v.is_at_least(3, 34, 9));
        assert!(!v.is_at_least(3, 35, 1));
        assert!(!v.is_at_least(4, 0, 0));
        assert!(v.matches_major_minor(3, 35));
        assert!(!v.matches_major_minor(3, 36));
    }

    #[test]
    fn test_engine_from_str() {
        assert_eq!("MariaDB".parse::<Engine>().unwrap(), Engine::MariaDb);
        assert_eq!("sqlite".parse::<Engine>().unwrap(), Engine::Sqlite);
        assert_eq!("db2".parse::<Engine>().unwrap(), Engine::Unknown);
    }

    #[tokio::test]
    async fn test_detect_sqlite() {
        let db = RecordingDatabase::new();
        db.respond("sqlite_version", vec![Row::new().with("v", "3.45.1")]);

        let info = EngineInfo::detect(&db).await;
        assert_eq!(info.engine, Engine::Sqlite);
        assert_eq!(info.version.unwrap().minor, 45);
    }

    #[tokio::test]
    async fn test_detect_mariadb_from_version_comment() {
        let db = RecordingDatabase::new();
        db.fail_on("sqlite_version");
        db.respond("VERSION()", vec![Row::new().with("v", "10.6.12")]);
        db.respond(
            "@@version_comment",
            vec![Row::new().with("v", "mariadb.org binary distribution")],
        );

        let info = EngineInfo::detect(&db).await;
        assert_eq!(info.engine, Engine::MariaDb);
        assert_eq!(info.raw_version.as_deref(), Some("10.6.12"));
    }

    #[tokio::test]
    async fn test_detect_mysql() {
        let db = RecordingDatabase::new();
        db.fail_on("sqlite_version");
        db.respond("VERSION()", vec![Row::new().with("v", "8.0.36")]);
        db.respond(
            "@@version_comment",
            vec![Row::new().with("v", "MySQL Community Server - GPL")],
        );

        let info = EngineInfo::detect(&db).await;
        assert_eq!(info.engine, Engine::MySql);
        assert!(info.version.unwrap().is_at_least(8, 0, 0));
    }

    #[tokio::test]
    async fn test_detect_unknown_when_every_probe_fails() {
        let db = RecordingDatabase::new();
        db.fail_on("SELECT");

        let info = EngineInfo::detect(&db).await;
        assert_eq!(info, EngineInfo::unknown());
    }
}

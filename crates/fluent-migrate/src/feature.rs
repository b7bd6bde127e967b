//! Per-engine feature support.
//!
//! Every DDL capability the builders rely on is a [`Feature`]. A
//! [`FeatureMatrix`] decides, per engine and version, which ones are
//! available; a [`FeatureGate`] binds a matrix to the detected engine.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::{Engine, EngineInfo};

/// A DDL capability that may or may not be available on an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    CreateTable,
    DropTable,
    AlterAddColumn,
    AlterDropColumn,
    AlterModifyColumn,
    AlterAddPrimaryKey,
    AlterDropPrimaryKey,
    AlterAddIndex,
    AlterDropIndex,
    AlterAddForeignKey,
    AlterDropForeignKey,
    ColumnComment,
    ColumnCharset,
    ColumnCollation,
    ColumnUnsigned,
    ColumnOnUpdate,
    AutoIncrement,
    TableEngine,
}

impl Feature {
    /// Every feature, in declaration order.
    pub const ALL: [Self; 18] = [
        Self::CreateTable,
        Self::DropTable,
        Self::AlterAddColumn,
        Self::AlterDropColumn,
        Self::AlterModifyColumn,
        Self::AlterAddPrimaryKey,
        Self::AlterDropPrimaryKey,
        Self::AlterAddIndex,
        Self::AlterDropIndex,
        Self::AlterAddForeignKey,
        Self::AlterDropForeignKey,
        Self::ColumnComment,
        Self::ColumnCharset,
        Self::ColumnCollation,
        Self::ColumnUnsigned,
        Self::ColumnOnUpdate,
        Self::AutoIncrement,
        Self::TableEngine,
    ];

    /// The snake_case name used in messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateTable => "create_table",
            Self::DropTable => "drop_table",
            Self::AlterAddColumn => "alter_add_column",
            Self::AlterDropColumn => "alter_drop_column",
            Self::AlterModifyColumn => "alter_modify_column",
            Self::AlterAddPrimaryKey => "alter_add_primary_key",
            Self::AlterDropPrimaryKey => "alter_drop_primary_key",
            Self::AlterAddIndex => "alter_add_index",
            Self::AlterDropIndex => "alter_drop_index",
            Self::AlterAddForeignKey => "alter_add_foreign_key",
            Self::AlterDropForeignKey => "alter_drop_foreign_key",
            Self::ColumnComment => "column_comment",
            Self::ColumnCharset => "column_charset",
            Self::ColumnCollation => "column_collation",
            Self::ColumnUnsigned => "column_unsigned",
            Self::ColumnOnUpdate => "column_on_update",
            Self::AutoIncrement => "auto_increment",
            Self::TableEngine => "table_engine",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimum version required for a feature under [`SupportPolicy::PerFeature`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionFloor {
    /// Any parsed version will do.
    AnyParsed,
    /// `major.minor.patch` or newer.
    AtLeast(u32, u32, u32),
}

/// How an engine's features are decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupportPolicy {
    /// Nothing is supported.
    None,
    /// Everything is supported on exactly one `major.minor` line and nothing
    /// anywhere else, including when the version could not be parsed.
    ExactLine {
        /// Required major version.
        major: u32,
        /// Required minor version.
        minor: u32,
    },
    /// Listed features are supported from their floor on; the rest never.
    PerFeature(Vec<(Feature, VersionFloor)>),
}

impl SupportPolicy {
    fn supports(&self, info: &EngineInfo, feature: Feature) -> bool {
        let Some(version) = info.version.as_ref() else {
            return false;
        };
        match self {
            Self::None => false,
            Self::ExactLine { major, minor } => version.matches_major_minor(*major, *minor),
            Self::PerFeature(rules) => rules
                .iter()
                .find(|(f, _)| *f == feature)
                .is_some_and(|(_, floor)| match floor {
                    VersionFloor::AnyParsed => true,
                    VersionFloor::AtLeast(major, minor, patch) => {
                        version.is_at_least(*major, *minor, *patch)
                    }
                }),
        }
    }
}

/// Table of support policies keyed by engine.
///
/// The default table only trusts MariaDB 10.6 and SQLite: MariaDB gets every
/// feature on the 10.6 line, SQLite gets table create/drop, add column,
/// index create/drop and, from 3.35.0, drop column. Every other engine is
/// fully unsupported until a policy is registered with
/// [`FeatureMatrix::with_policy`].
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    policies: HashMap<Engine, SupportPolicy>,
}

impl Default for FeatureMatrix {
    fn default() -> Self {
        let sqlite = SupportPolicy::PerFeature(vec![
            (Feature::CreateTable, VersionFloor::AnyParsed),
            (Feature::DropTable, VersionFloor::AnyParsed),
            (Feature::AlterAddColumn, VersionFloor::AnyParsed),
            (Feature::AlterAddIndex, VersionFloor::AnyParsed),
            (Feature::AlterDropIndex, VersionFloor::AnyParsed),
            (Feature::AlterDropColumn, VersionFloor::AtLeast(3, 35, 0)),
        ]);
        Self::empty()
            .with_policy(Engine::MariaDb, SupportPolicy::ExactLine { major: 10, minor: 6 })
            .with_policy(Engine::Sqlite, sqlite)
    }
}

impl FeatureMatrix {
    /// A matrix where no engine supports anything.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            policies: HashMap::new(),
        }
    }

    /// Registers (or replaces) the policy of one engine.
    #[must_use]
    pub fn with_policy(mut self, engine: Engine, policy: SupportPolicy) -> Self {
        self.policies.insert(engine, policy);
        self
    }

    /// The policy in effect for an engine.
    #[must_use]
    pub fn policy(&self, engine: Engine) -> &SupportPolicy {
        self.policies.get(&engine).unwrap_or(&SupportPolicy::None)
    }

    /// Whether `feature` is available on the given engine and version.
    #[must_use]
    pub fn supports(&self, info: &EngineInfo, feature: Feature) -> bool {
        self.policy(info.engine).supports(info, feature)
    }
}

/// A feature matrix bound to one detected engine.
#[derive(Debug, Clone)]
pub struct FeatureGate {
    engine: EngineInfo,
    matrix: FeatureMatrix,
}

impl FeatureGate {
    /// Creates a gate for `engine`.
    #[must_use]
    pub const fn new(engine: EngineInfo, matrix: FeatureMatrix) -> Self {
        Self { engine, matrix }
    }

    /// The engine this gate answers for.
    #[must_use]
    pub const fn engine(&self) -> &EngineInfo {
        &self.engine
    }

    /// Whether a single feature is supported.
    #[must_use]
    pub fn supports(&self, feature: Feature) -> bool {
        self.matrix.supports(&self.engine, feature)
    }

    /// The unsupported subset of `features`, in input order.
    #[must_use]
    pub fn unsupported(&self, features: &[Feature]) -> Vec<Feature> {
        features
            .iter()
            .copied()
            .filter(|feature| !self.supports(*feature))
            .collect()
    }

    /// `"<engine> <version>"`, using `unknown` when no version is known.
    #[must_use]
    pub fn describe_engine(&self) -> String {
        let version = self
            .engine
            .version
            .as_ref()
            .map(|v| v.raw.as_str())
            .or(self.engine.raw_version.as_deref())
            .unwrap_or("unknown");
        format!("{} {version}", self.engine.engine)
    }
}

/// Appends `features` to `into`, skipping ones already present.
pub(crate) fn extend_unique(into: &mut Vec<Feature>, features: impl IntoIterator<Item = Feature>) {
    for feature in features {
        if !into.contains(&feature) {
            into.push(feature);
        }
    }
}

/// Comma-separated feature names.
pub(crate) fn join_features(features: &[Feature]) -> String {
    features
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(engine: Engine, version: &str) -> FeatureGate {
        FeatureGate::new(EngineInfo::new(engine, version), FeatureMatrix::default())
    }

    #[test]
    fn test_mariadb_supported_line() {
        let gate = gate(Engine::MariaDb, "10.6.12-MariaDB");
        for feature in Feature::ALL {
            assert!(gate.supports(feature), "{feature} should be supported");
        }
        assert!(gate.unsupported(&Feature::ALL).is_empty());
    }

    #[test]
    fn test_mariadb_other_lines_support_nothing() {
        for version in ["10.5.9-MariaDB", "10.11.2-MariaDB", "11.0.1-MariaDB"] {
            let gate = gate(Engine::MariaDb, version);
            let requested = [Feature::CreateTable, Feature::AlterAddColumn];
            assert_eq!(gate.unsupported(&requested), requested.to_vec());
        }
    }

    #[test]
    fn test_sqlite_support() {
        let gate = gate(Engine::Sqlite, "3.45.1");
        assert!(gate.supports(Feature::CreateTable));
        assert!(gate.supports(Feature::AlterAddColumn));
        assert!(gate.supports(Feature::AlterDropColumn));
        assert!(gate.supports(Feature::AlterAddIndex));
        assert!(!gate.supports(Feature::AlterModifyColumn));
        assert!(!gate.supports(Feature::ColumnComment));
        assert!(!gate.supports(Feature::AlterAddForeignKey));
    }

    #[test]
    fn test_sqlite_drop_column_needs_3_35() {
        let gate = gate(Engine::Sqlite, "3.34.1");
        assert!(gate.supports(Feature::AlterAddColumn));
        assert!(!gate.supports(Feature::AlterDropColumn));
    }

    #[test]
    fn test_missing_version_supports_nothing() {
        let gate = FeatureGate::new(
            EngineInfo::without_version(Engine::Sqlite),
            FeatureMatrix::default(),
        );
        assert!(!gate.supports(Feature::CreateTable));
        assert_eq!(gate.describe_engine(), "sqlite unknown");
    }

    #[test]
    fn test_mysql_unsupported_by_default_but_configurable() {
        let info = EngineInfo::new(Engine::MySql, "8.0.36");
        let gate = FeatureGate::new(info.clone(), FeatureMatrix::default());
        assert!(!gate.supports(Feature::CreateTable));

        let matrix = FeatureMatrix::default()
            .with_policy(Engine::MySql, SupportPolicy::ExactLine { major: 8, minor: 0 });
        let gate = FeatureGate::new(info, matrix);
        assert!(gate.supports(Feature::AlterAddForeignKey));
    }

    #[test]
    fn test_unsupported_preserves_order() {
        let gate = gate(Engine::Sqlite, "3.45.1");
        let unsupported = gate.unsupported(&[
            Feature::ColumnComment,
            Feature::CreateTable,
            Feature::AutoIncrement,
            Feature::ColumnCharset,
        ]);
        assert_eq!(
            unsupported,
            vec![
                Feature::ColumnComment,
                Feature::AutoIncrement,
                Feature::ColumnCharset
            ]
        );
    }

    #[test]
    fn test_describe_engine() {
        assert_eq!(
            gate(Engine::MariaDb, "10.6.12-MariaDB").describe_engine(),
            "mariadb 10.6.12-MariaDB"
        );
    }

    #[test]
    fn test_join_and_extend() {
        let mut features = vec![Feature::CreateTable];
        extend_unique(&mut features, [Feature::DropTable, Feature::CreateTable]);
        assert_eq!(join_features(&features), "create_table, drop_table");
    }
}

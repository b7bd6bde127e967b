//! One-shot helpers that (re)create a single index or foreign key.
//!
//! Both drop the object if it is present and then add it again, so they can
//! redefine an existing index or constraint in place. Only the add is undone
//! by `down`.

use crate::context::MigrationContext;
use crate::error::Result;
use crate::migration::{MigrationStep, StepItem};
use crate::operation::{AlterAction, Operation};
use crate::schema::{ForeignKeyDefinition, IndexDefinition, ReferentialAction};

/// Recreates a non-unique index.
#[derive(Debug, Clone)]
pub struct AddIndex {
    table: String,
    index: IndexDefinition,
}

impl AddIndex {
    /// `(re)create index <name> on <table> (<columns>)`.
    pub fn of<I, S>(table: impl Into<String>, name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            table: table.into(),
            index: IndexDefinition::new(name, columns),
        }
    }

    /// Compiles into a drop-if-present followed by a guarded add.
    #[must_use]
    pub fn compile(&self, _ctx: &MigrationContext) -> Vec<Operation> {
        vec![
            Operation::alter(&self.table, AlterAction::DropIndex(self.index.name.clone()))
                .irreversible(),
            Operation::alter(&self.table, AlterAction::AddIndex(self.index.clone())),
        ]
    }
}

impl MigrationStep for AddIndex {
    fn expand(&self, ctx: &MigrationContext) -> Result<Vec<StepItem>> {
        Ok(self.compile(ctx).into_iter().map(StepItem::from).collect())
    }
}

/// Recreates a foreign key.
#[derive(Debug, Clone)]
pub struct AddForeignKey {
    table: String,
    fk: ForeignKeyDefinition,
}

impl AddForeignKey {
    /// `(re)create foreign key <name>` with textual referential modes
    /// (`NO ACTION`, `CASCADE`, `RESTRICT`, `SET NULL`, `SET DEFAULT`;
    /// `None` means `NO ACTION`).
    ///
    /// Invalid modes and mismatched column lists are rejected here, before
    /// anything runs.
    pub fn of<L, F, S1, S2>(
        table: impl Into<String>,
        name: impl Into<String>,
        local_columns: L,
        foreign_table: impl Into<String>,
        foreign_columns: F,
        on_update: Option<&str>,
        on_delete: Option<&str>,
    ) -> Result<Self>
    where
        L: IntoIterator<Item = S1>,
        F: IntoIterator<Item = S2>,
        S1: Into<String>,
        S2: Into<String>,
    {
        let on_update = ReferentialAction::parse_clause("ON UPDATE", on_update)?;
        let on_delete = ReferentialAction::parse_clause("ON DELETE", on_delete)?;
        let fk = ForeignKeyDefinition::new(name, local_columns, foreign_table, foreign_columns)?
            .on_update(on_update)
            .on_delete(on_delete);
        Ok(Self {
            table: table.into(),
            fk,
        })
    }

    /// The validated constraint.
    #[must_use]
    pub const fn definition(&self) -> &ForeignKeyDefinition {
        &self.fk
    }

    /// Compiles into a drop-if-present followed by a guarded add.
    #[must_use]
    pub fn compile(&self, _ctx: &MigrationContext) -> Vec<Operation> {
        vec![
            Operation::alter(&self.table, AlterAction::DropForeignKey(self.fk.name.clone()))
                .irreversible(),
            Operation::alter(&self.table, AlterAction::AddForeignKey(self.fk.clone())),
        ]
    }
}

impl MigrationStep for AddForeignKey {
    fn expand(&self, ctx: &MigrationContext) -> Result<Vec<StepItem>> {
        Ok(self.compile(ctx).into_iter().map(StepItem::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::database::Row;
    use crate::engine::{Engine, EngineInfo};
    use crate::error::MigrateError;
    use crate::feature::FeatureMatrix;
    use crate::operation::Outcome;
    use crate::testing::{MemoryLogger, RecordingDatabase};

    #[test]
    fn test_foreign_key_modes_are_validated() {
        let fk = AddForeignKey::of(
            "posts",
            "fk_posts_user",
            ["user_id"],
            "users",
            ["id"],
            None,
            Some("set   null"),
        )
        .unwrap();
        assert_eq!(fk.definition().on_update, Some(ReferentialAction::NoAction));
        assert_eq!(fk.definition().on_delete, Some(ReferentialAction::SetNull));

        let err = AddForeignKey::of("posts", "fk", ["a"], "users", ["id"], Some("DELETE"), None)
            .unwrap_err();
        assert!(matches!(
            err,
            MigrateError::InvalidReferentialAction { clause: "ON UPDATE", .. }
        ));

        let err = AddForeignKey::of("posts", "fk", ["a", "b"], "users", ["id"], None, None)
            .unwrap_err();
        assert!(matches!(err, MigrateError::InvalidForeignKey { .. }));
    }

    #[tokio::test]
    async fn test_add_index_recreates_existing() {
        let db = Arc::new(RecordingDatabase::new());
        let ctx = MigrationContext::new(
            db.clone(),
            Arc::new(MemoryLogger::new()),
            EngineInfo::new(Engine::MariaDb, "10.6.12-MariaDB"),
            FeatureMatrix::default(),
        );
        db.respond(
            "information_schema.statistics",
            vec![Row::new()
                .with("INDEX_NAME", "idx_a")
                .with("NON_UNIQUE", 1_i64)
                .with("COLUMN_NAME", "a")],
        );

        let mut ops = AddIndex::of("t", "idx_a", ["a", "b"]).compile(&ctx);
        assert_eq!(ops.len(), 2);
        assert!(!ops[0].has_down());
        assert_eq!(ops[0].up(&ctx).await.unwrap(), Outcome::Changed);

        // dropped
        db.respond("information_schema.statistics", Vec::new());
        assert_eq!(ops[1].up(&ctx).await.unwrap(), Outcome::Changed);
        assert_eq!(
            db.executed(),
            vec![
                "DROP INDEX `idx_a` ON `t`;",
                "CREATE INDEX `idx_a` ON `t` (`a`, `b`);",
            ]
        );
    }
}

use super::compile_alter;
use crate::columns::ColumnSink;
use crate::context::MigrationContext;
use crate::error::Result;
use crate::migration::{MigrationStep, StepItem};
use crate::operation::{AlterAction, Operation};
use crate::schema::{ColumnDefinition, ForeignKeyDefinition, IndexDefinition};

/// Builder adding columns, indexes, a primary key or foreign keys to an
/// existing table.
///
/// Each addition compiles into its own operation. `up` skips additions that
/// already exist; `down` removes only what `up` added.
#[derive(Debug, Clone)]
pub struct AlterTableAdd {
    table: String,
    actions: Vec<AlterAction>,
}

impl AlterTableAdd {
    /// Starts an alteration of `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            actions: Vec::new(),
        }
    }

    /// Adds a non-unique index.
    #[must_use]
    pub fn index<I, S>(mut self, name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions
            .push(AlterAction::AddIndex(IndexDefinition::new(name, columns)));
        self
    }

    /// Adds a unique index.
    #[must_use]
    pub fn unique_index<I, S>(mut self, name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions
            .push(AlterAction::AddIndex(IndexDefinition::unique(name, columns)));
        self
    }

    /// Adds a primary key.
    #[must_use]
    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions.push(AlterAction::AddPrimaryKey(
            columns.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Adds a foreign key constraint.
    #[must_use]
    pub fn foreign_key(mut self, fk: ForeignKeyDefinition) -> Self {
        self.actions.push(AlterAction::AddForeignKey(fk));
        self
    }

    /// The accumulated actions, in declaration order.
    #[must_use]
    pub fn actions(&self) -> &[AlterAction] {
        &self.actions
    }

    /// Compiles one operation per addition.
    #[must_use]
    pub fn compile(&self, ctx: &MigrationContext) -> Vec<Operation> {
        compile_alter(ctx, &self.table, &self.actions)
    }
}

impl ColumnSink for AlterTableAdd {
    fn column(mut self, column: ColumnDefinition) -> Self {
        self.actions.push(AlterAction::AddColumn(column));
        self
    }
}

impl MigrationStep for AlterTableAdd {
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
    use crate::feature::FeatureMatrix;
    use crate::operation::{Action, Outcome};
    use crate::testing::{MemoryLogger, RecordingDatabase};

    fn mariadb(version: &str) -> (Arc<RecordingDatabase>, Arc<MemoryLogger>, MigrationContext) {
        let db = Arc::new(RecordingDatabase::new());
        let logger = Arc::new(MemoryLogger::new());
        let ctx = MigrationContext::new(
            db.clone(),
            logger.clone(),
            EngineInfo::new(Engine::MariaDb, version),
            FeatureMatrix::default(),
        );
        (db, logger, ctx)
    }

    fn index_row(name: &str, column: &str) -> Row {
        Row::new()
            .with("INDEX_NAME", name)
            .with("NON_UNIQUE", 1_i64)
            .with("COLUMN_NAME", column)
            .with("INDEX_TYPE", "BTREE")
    }

    #[tokio::test]
    async fn test_unsupported_version_compiles_to_skip() {
        let (db, logger, ctx) = mariadb("10.5.1-MariaDB");
        let mut ops = AlterTableAdd::new("t")
            .column(ColumnDefinition::new("c", "INT").comment("note"))
            .compile(&ctx);
        assert_eq!(ops.len(), 1);
        assert!(ops[0].is_skip());

        assert_eq!(ops[0].up(&ctx).await.unwrap(), Outcome::Skipped);
        assert_eq!(ops[0].down(&ctx).await.unwrap(), Outcome::Unchanged);
        assert_eq!(
            logger.warnings(),
            vec![
                "Skip UP add column c on t: unsupported features for mariadb 10.5.1-MariaDB \
                 (alter_add_column, alter_drop_column, column_comment)."
            ]
        );
        assert!(db.queries().is_empty());
        assert!(db.executed().is_empty());
    }

    #[tokio::test]
    async fn test_supported_version_adds_column() {
        let (db, logger, ctx) = mariadb("10.6.12-MariaDB");
        let mut ops = AlterTableAdd::new("t")
            .column(ColumnDefinition::new("c", "INT").comment("note"))
            .compile(&ctx);
        assert!(matches!(ops[0].action(), Action::Alter { .. }));

        assert_eq!(ops[0].up(&ctx).await.unwrap(), Outcome::Changed);
        assert_eq!(
            db.executed(),
            vec!["ALTER TABLE `t` ADD COLUMN `c` INT NOT NULL COMMENT 'note';"]
        );
        assert!(logger.warnings().is_empty());
    }

    #[tokio::test]
    async fn test_foreign_key_waits_for_covering_index() {
        let (db, logger, ctx) = mariadb("10.6.12-MariaDB");
        let fk = ForeignKeyDefinition::new("fk_p_u", ["user_id"], "users", ["id"]).unwrap();
        let builder = AlterTableAdd::new("posts").foreign_key(fk);

        let mut ops = builder.compile(&ctx);
        assert_eq!(ops[0].up(&ctx).await.unwrap(), Outcome::Skipped);
        assert_eq!(
            logger.warnings(),
            vec!["Skip UP add foreign key fk_p_u on posts: missing index covering (user_id)."]
        );
        assert!(db.executed().is_empty());

        db.respond(
            "information_schema.statistics",
            vec![
                index_row("idx_user", "user_id"),
                index_row("idx_user", "created_at"),
            ],
        );
        let mut ops = builder.compile(&ctx);
        assert_eq!(ops[0].up(&ctx).await.unwrap(), Outcome::Changed);
        assert_eq!(
            db.executed(),
            vec![
                "ALTER TABLE `posts` ADD CONSTRAINT `fk_p_u` FOREIGN KEY (`user_id`) \
                 REFERENCES `users`(`id`);"
            ]
        );
    }

    #[tokio::test]
    async fn test_existing_index_is_left_alone() {
        let (db, _logger, ctx) = mariadb("10.6.12-MariaDB");
        db.respond(
            "information_schema.statistics",
            vec![index_row("idx_c", "c")],
        );

        let mut ops = AlterTableAdd::new("t").index("idx_c", ["c"]).compile(&ctx);
        assert_eq!(ops[0].up(&ctx).await.unwrap(), Outcome::Unchanged);
        assert_eq!(ops[0].down(&ctx).await.unwrap(), Outcome::Unchanged);
        assert!(db.executed().is_empty());
    }
}

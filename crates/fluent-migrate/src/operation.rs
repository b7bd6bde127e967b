//! Compiled operations.
//!
//! Builders compile into [`Operation`] values. An operation pairs an
//! [`Action`] with the [`OperationState`] recorded while running it: `up`
//! inspects the live schema, applies the change only when needed and stores
//! a [`Snapshot`]; `down` reads that snapshot to undo exactly what `up` did.

use async_trait::async_trait;

use crate::context::MigrationContext;
use crate::error::Result;
use crate::feature::{extend_unique, Feature};
use crate::schema::{
    ColumnChange, ColumnDefinition, CreateTableSpec, ForeignKeyDefinition, IndexDefinition,
};

/// Name of the primary key index reported by inspectors.
pub const PRIMARY_INDEX: &str = "PRIMARY";

/// What running one direction of an operation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The schema was changed.
    Changed,
    /// Nothing to do: the change was already in place (or not applied).
    Unchanged,
    /// The change was skipped because the engine cannot perform it.
    Skipped,
}

/// What `up` recorded for `down` to replay.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    /// The action's own definition is enough to undo it.
    Definition,
    /// Statements recreating a dropped table.
    Table(Vec<String>),
    /// A dropped column, or the definition of a column before it was modified.
    Column(ColumnDefinition),
    /// A dropped index.
    Index(IndexDefinition),
    /// Columns of a dropped primary key.
    PrimaryKey(Vec<String>),
    /// A dropped foreign key.
    ForeignKey(ForeignKeyDefinition),
}

/// Lifecycle of an operation.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum OperationState {
    /// Not run yet.
    #[default]
    Pending,
    /// `up` found the change already in place.
    Unchanged,
    /// `up` skipped the change on this engine.
    Skipped,
    /// `up` changed the schema.
    Applied(Snapshot),
    /// `down` undid the change.
    Reverted,
}

/// A single schema change on an existing table.
#[derive(Debug, Clone, PartialEq)]
pub enum AlterAction {
    AddColumn(ColumnDefinition),
    AddIndex(IndexDefinition),
    AddPrimaryKey(Vec<String>),
    AddForeignKey(ForeignKeyDefinition),
    DropColumn(String),
    DropIndex(String),
    DropPrimaryKey,
    DropForeignKey(String),
    ModifyColumn(ColumnChange),
}

impl AlterAction {
    /// Features the engine must support for this change and its inverse.
    #[must_use]
    pub fn required_features(&self) -> Vec<Feature> {
        match self {
            Self::AddColumn(column) => {
                let mut features = vec![Feature::AlterAddColumn, Feature::AlterDropColumn];
                extend_unique(&mut features, column.required_features());
                features
            }
            Self::AddIndex(_) | Self::DropIndex(_) => {
                vec![Feature::AlterAddIndex, Feature::AlterDropIndex]
            }
            Self::AddPrimaryKey(_) | Self::DropPrimaryKey => {
                vec![Feature::AlterAddPrimaryKey, Feature::AlterDropPrimaryKey]
            }
            Self::AddForeignKey(_) | Self::DropForeignKey(_) => {
                vec![Feature::AlterAddForeignKey, Feature::AlterDropForeignKey]
            }
            Self::DropColumn(_) => vec![Feature::AlterDropColumn, Feature::AlterAddColumn],
            Self::ModifyColumn(_) => vec![Feature::AlterModifyColumn],
        }
    }

    /// Short description, e.g. `add column email`.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::AddColumn(column) => format!("add column {}", column.name),
            Self::AddIndex(index) if index.unique => format!("add unique index {}", index.name),
            Self::AddIndex(index) => format!("add index {}", index.name),
            Self::AddPrimaryKey(_) => "add primary key".to_string(),
            Self::AddForeignKey(fk) => format!("add foreign key {}", fk.name),
            Self::DropColumn(name) => format!("drop column {name}"),
            Self::DropIndex(name) => format!("drop index {name}"),
            Self::DropPrimaryKey => "drop primary key".to_string(),
            Self::DropForeignKey(name) => format!("drop foreign key {name}"),
            Self::ModifyColumn(change) => format!("change column {}", change.name),
        }
    }
}

/// A user-defined operation.
#[async_trait]
pub trait CustomOperation: Send + Sync {
    /// Applies the operation.
    async fn up(&mut self, ctx: &MigrationContext) -> Result<()>;

    /// Undoes the operation.
    async fn down(&mut self, _ctx: &MigrationContext) -> Result<()> {
        Ok(())
    }

    /// Whether [`CustomOperation::down`] does anything.
    fn has_down(&self) -> bool {
        false
    }

    /// Description used in logs.
    fn description(&self) -> String {
        "custom operation".to_string()
    }
}

/// What an operation does.
pub enum Action {
    /// Logs a warning and does nothing else.
    Skip {
        /// The warning.
        message: String,
    },
    /// Creates a table unless it exists.
    CreateTable(Box<CreateTableSpec>),
    /// Drops a table, remembering how to recreate it.
    DropTable {
        /// Table name.
        table: String,
    },
    /// Alters an existing table.
    Alter {
        /// Table name.
        table: String,
        /// The change.
        action: AlterAction,
    },
    /// Raw SQL statements.
    Sql {
        /// Statements run by `up`.
        up: Vec<String>,
        /// Statements run by `down`.
        down: Vec<String>,
    },
    /// A user-defined operation.
    Custom(Box<dyn CustomOperation>),
}

impl Action {
    /// Short description used in logs.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Skip { message } => format!("skip ({message})"),
            Self::CreateTable(spec) => format!("create table {}", spec.table),
            Self::DropTable { table } => format!("drop table {table}"),
            Self::Alter { table, action } => format!("{} on {table}", action.describe()),
            Self::Sql { up, .. } => format!("raw sql ({} statements)", up.len()),
            Self::Custom(op) => op.description(),
        }
    }
}

/// A compiled, guarded schema change with its recorded state.
pub struct Operation {
    action: Action,
    state: OperationState,
    reversible: bool,
}

impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("action", &self.action.describe())
            .field("state", &self.state)
            .field("reversible", &self.reversible)
            .finish()
    }
}

impl Operation {
    /// Wraps an action.
    #[must_use]
    pub const fn new(action: Action) -> Self {
        Self {
            action,
            state: OperationState::Pending,
            reversible: true,
        }
    }

    /// An operation that only logs a warning when run.
    pub fn skip(message: impl Into<String>) -> Self {
        Self::new(Action::Skip {
            message: message.into(),
        })
    }

    /// Creates a table unless it exists.
    #[must_use]
    pub fn create_table(spec: CreateTableSpec) -> Self {
        Self::new(Action::CreateTable(Box::new(spec)))
    }

    /// Drops a table if it exists.
    pub fn drop_table(table: impl Into<String>) -> Self {
        Self::new(Action::DropTable {
            table: table.into(),
        })
    }

    /// Alters a table.
    pub fn alter(table: impl Into<String>, action: AlterAction) -> Self {
        Self::new(Action::Alter {
            table: table.into(),
            action,
        })
    }

    /// Raw SQL with optional inverse statements.
    pub fn sql<U, D, S1, S2>(up: U, down: D) -> Self
    where
        U: IntoIterator<Item = S1>,
        D: IntoIterator<Item = S2>,
        S1: Into<String>,
        S2: Into<String>,
    {
        Self::new(Action::Sql {
            up: up.into_iter().map(Into::into).collect(),
            down: down.into_iter().map(Into::into).collect(),
        })
    }

    /// A user-defined operation.
    pub fn custom(op: impl CustomOperation + 'static) -> Self {
        Self::new(Action::Custom(Box::new(op)))
    }

    /// Marks the operation as having no `down`.
    #[must_use]
    pub const fn irreversible(mut self) -> Self {
        self.reversible = false;
        self
    }

    /// The action.
    #[must_use]
    pub const fn action(&self) -> &Action {
        &self.action
    }

    /// The recorded state.
    #[must_use]
    pub const fn state(&self) -> &OperationState {
        &self.state
    }

    /// Whether this is a skip operation.
    #[must_use]
    pub const fn is_skip(&self) -> bool {
        matches!(self.action, Action::Skip { .. })
    }

    /// Whether `down` can do anything.
    #[must_use]
    pub fn has_down(&self) -> bool {
        if !self.reversible {
            return false;
        }
        match &self.action {
            Action::Skip { .. } => false,
            Action::Sql { down, .. } => !down.is_empty(),
            Action::Custom(op) => op.has_down(),
            Action::CreateTable(_) | Action::DropTable { .. } | Action::Alter { .. } => true,
        }
    }

    /// Short description used in logs.
    #[must_use]
    pub fn describe(&self) -> String {
        self.action.describe()
    }

    /// Applies the operation if the schema does not already reflect it.
    pub async fn up(&mut self, ctx: &MigrationContext) -> Result<Outcome> {
        if matches!(self.state, OperationState::Applied(_)) {
            return Ok(Outcome::Unchanged);
        }

        let state = match &mut self.action {
            Action::Skip { message } => {
                ctx.logger().warning(message);
                OperationState::Skipped
            }
            Action::CreateTable(spec) => create_table(ctx, spec).await?,
            Action::DropTable { table } => drop_table(ctx, table).await?,
            Action::Alter { table, action } => alter(ctx, table, action).await?,
            Action::Sql { up, .. } => {
                ctx.exec_sql(up).await?;
                OperationState::Applied(Snapshot::Definition)
            }
            Action::Custom(op) => {
                op.up(ctx).await?;
                OperationState::Applied(Snapshot::Definition)
            }
        };

        let outcome = match state {
            OperationState::Applied(_) => Outcome::Changed,
            OperationState::Skipped => Outcome::Skipped,
            OperationState::Pending | OperationState::Unchanged | OperationState::Reverted => {
                Outcome::Unchanged
            }
        };
        self.state = state;
        Ok(outcome)
    }

    /// Undoes what `up` did.
    ///
    /// After a successful `up` the recorded snapshot is replayed. When `up`
    /// changed nothing this is a no-op. When `up` never ran in this process
    /// the inverse is derived from the live schema where possible.
    pub async fn down(&mut self, ctx: &MigrationContext) -> Result<Outcome> {
        if !self.has_down() {
            return Ok(Outcome::Unchanged);
        }

        let outcome = match (&mut self.action, &self.state) {
            (action, OperationState::Applied(snapshot)) => revert(ctx, action, snapshot).await?,
            (action, OperationState::Pending) => revert_unrecorded(ctx, action).await?,
            (_, OperationState::Unchanged | OperationState::Skipped | OperationState::Reverted) => {
                Outcome::Unchanged
            }
        };

        if outcome == Outcome::Changed {
            self.state = OperationState::Reverted;
        }
        Ok(outcome)
    }
}

async fn create_table(ctx: &MigrationContext, spec: &CreateTableSpec) -> Result<OperationState> {
    if ctx.inspector().table_exists(&spec.table).await {
        return Ok(OperationState::Unchanged);
    }
    ctx.exec_sql(&ctx.renderer().render_create_table(spec)?).await?;
    Ok(OperationState::Applied(Snapshot::Definition))
}

async fn drop_table(ctx: &MigrationContext, table: &str) -> Result<OperationState> {
    let Some(statements) = ctx.inspector().create_table_sql(table).await else {
        return Ok(OperationState::Unchanged);
    };
    ctx.exec_sql(&ctx.renderer().render_drop_table(table)?).await?;
    Ok(OperationState::Applied(Snapshot::Table(statements)))
}

async fn alter(ctx: &MigrationContext, table: &str, action: &AlterAction) -> Result<OperationState> {
    let inspector = ctx.inspector();
    let renderer = ctx.renderer();

    let snapshot = match action {
        AlterAction::AddColumn(column) => {
            if inspector.column(table, &column.name).await.is_some() {
                return Ok(OperationState::Unchanged);
            }
            ctx.exec_sql(&renderer.render_add_column(table, column)?).await?;
            Snapshot::Definition
        }
        AlterAction::AddIndex(index) => {
            if inspector.index(table, &index.name).await.is_some() {
                return Ok(OperationState::Unchanged);
            }
            ctx.exec_sql(&renderer.render_add_index(table, index)?).await?;
            Snapshot::Definition
        }
        AlterAction::AddPrimaryKey(columns) => {
            if inspector.index(table, PRIMARY_INDEX).await.is_some() {
                return Ok(OperationState::Unchanged);
            }
            ctx.exec_sql(&renderer.render_add_primary_key(table, columns)?).await?;
            Snapshot::Definition
        }
        AlterAction::AddForeignKey(fk) => {
            if inspector.foreign_key(table, &fk.name).await.is_some() {
                return Ok(OperationState::Unchanged);
            }
            if ctx.engine().is_mysql_family() {
                let covered = inspector
                    .indexes(table)
                    .await
                    .iter()
                    .any(|index| index.covers_prefix(&fk.local_columns));
                if !covered {
                    ctx.logger().warning(&format!(
                        "Skip UP add foreign key {} on {table}: missing index covering ({}).",
                        fk.name,
                        fk.local_columns.join(", ")
                    ));
                    return Ok(OperationState::Skipped);
                }
            }
            ctx.exec_sql(&renderer.render_add_foreign_key(table, fk)?).await?;
            Snapshot::Definition
        }
        AlterAction::DropColumn(name) => {
            let Some(column) = inspector.column(table, name).await else {
                return Ok(OperationState::Unchanged);
            };
            let unsupported = ctx.features().unsupported(&column.required_features());
            if !unsupported.is_empty() {
                ctx.logger().warning(&ctx.unsupported_message(
                    &action.describe(),
                    table,
                    &unsupported,
                ));
                return Ok(OperationState::Skipped);
            }
            ctx.exec_sql(&renderer.render_drop_column(table, name)?).await?;
            Snapshot::Column(column)
        }
        AlterAction::DropIndex(name) => {
            let Some(index) = inspector.index(table, name).await else {
                return Ok(OperationState::Unchanged);
            };
            ctx.exec_sql(&renderer.render_drop_index(table, name)?).await?;
            Snapshot::Index(index)
        }
        AlterAction::DropPrimaryKey => {
            let columns = inspector
                .index(table, PRIMARY_INDEX)
                .await
                .map(|index| index.columns)
                .unwrap_or_default();
            if columns.is_empty() {
                return Ok(OperationState::Unchanged);
            }
            ctx.exec_sql(&renderer.render_drop_primary_key(table)?).await?;
            Snapshot::PrimaryKey(columns)
        }
        AlterAction::DropForeignKey(name) => {
            let Some(fk) = inspector.foreign_key(table, name).await else {
                return Ok(OperationState::Unchanged);
            };
            ctx.exec_sql(&renderer.render_drop_foreign_key(table, name)?).await?;
            Snapshot::ForeignKey(fk)
        }
        AlterAction::ModifyColumn(change) => {
            let Some(old) = inspector.column(table, &change.name).await else {
                return Ok(OperationState::Unchanged);
            };
            let new = change.merge(&old);
            let mut features = old.required_features();
            extend_unique(&mut features, new.required_features());
            let unsupported = ctx.features().unsupported(&features);
            if !unsupported.is_empty() {
                ctx.logger().warning(&ctx.unsupported_message(
                    &action.describe(),
                    table,
                    &unsupported,
                ));
                return Ok(OperationState::Skipped);
            }
            ctx.exec_sql(&renderer.render_modify_column(table, &new)?).await?;
            Snapshot::Column(old)
        }
    };

    Ok(OperationState::Applied(snapshot))
}

/// Replays the snapshot recorded by `up`.
async fn revert(ctx: &MigrationContext, action: &mut Action, snapshot: &Snapshot) -> Result<Outcome> {
    let renderer = ctx.renderer();
    let statements = match (&mut *action, snapshot) {
        (Action::Custom(op), _) => {
            op.down(ctx).await?;
            return Ok(Outcome::Changed);
        }
        (Action::Sql { down, .. }, _) => down.clone(),
        (Action::CreateTable(spec), _) => renderer.render_drop_table(&spec.table)?,
        (Action::DropTable { .. }, Snapshot::Table(statements)) => statements.clone(),
        (Action::Alter { table, action }, snapshot) => {
            alter_inverse(ctx, table, action, snapshot)?
        }
        (Action::Skip { .. } | Action::DropTable { .. }, _) => return Ok(Outcome::Unchanged),
    };
    ctx.exec_sql(&statements).await?;
    Ok(Outcome::Changed)
}

/// Statements undoing an applied alter action.
fn alter_inverse(
    ctx: &MigrationContext,
    table: &str,
    action: &AlterAction,
    snapshot: &Snapshot,
) -> Result<Vec<String>> {
    let renderer = ctx.renderer();
    match (action, snapshot) {
        (AlterAction::AddColumn(column), _) => renderer.render_drop_column(table, &column.name),
        (AlterAction::AddIndex(index), _) => renderer.render_drop_index(table, &index.name),
        (AlterAction::AddPrimaryKey(_), _) => renderer.render_drop_primary_key(table),
        (AlterAction::AddForeignKey(fk), _) => renderer.render_drop_foreign_key(table, &fk.name),
        (AlterAction::DropColumn(_), Snapshot::Column(column)) => {
            renderer.render_add_column(table, column)
        }
        (AlterAction::DropIndex(_), Snapshot::Index(index)) => {
            renderer.render_add_index(table, index)
        }
        (AlterAction::DropPrimaryKey, Snapshot::PrimaryKey(columns)) => {
            renderer.render_add_primary_key(table, columns)
        }
        (AlterAction::DropForeignKey(_), Snapshot::ForeignKey(fk)) => {
            renderer.render_add_foreign_key(table, fk)
        }
        (AlterAction::ModifyColumn(_), Snapshot::Column(old)) => {
            renderer.render_modify_column(table, old)
        }
        _ => Ok(Vec::new()),
    }
}

/// Undoes an action whose `up` did not run in this process, using the live
/// schema instead of a snapshot.
async fn revert_unrecorded(ctx: &MigrationContext, action: &mut Action) -> Result<Outcome> {
    let inspector = ctx.inspector();
    let renderer = ctx.renderer();

    let statements = match action {
        Action::Skip { .. } => return Ok(Outcome::Unchanged),
        Action::Custom(op) => {
            op.down(ctx).await?;
            return Ok(Outcome::Changed);
        }
        Action::Sql { down, .. } => down.clone(),
        Action::CreateTable(spec) => {
            if !inspector.table_exists(&spec.table).await {
                return Ok(Outcome::Unchanged);
            }
            renderer.render_drop_table(&spec.table)?
        }
        Action::DropTable { table } => {
            warn_unrestorable(ctx, &format!("table {table}"));
            return Ok(Outcome::Unchanged);
        }
        Action::Alter { table, action } => match action {
            AlterAction::AddColumn(column) => {
                if inspector.column(table, &column.name).await.is_none() {
                    return Ok(Outcome::Unchanged);
                }
                renderer.render_drop_column(table, &column.name)?
            }
            AlterAction::AddIndex(index) => {
                if inspector.index(table, &index.name).await.is_none() {
                    return Ok(Outcome::Unchanged);
                }
                renderer.render_drop_index(table, &index.name)?
            }
            AlterAction::AddPrimaryKey(_) => {
                if inspector.index(table, PRIMARY_INDEX).await.is_none() {
                    return Ok(Outcome::Unchanged);
                }
                renderer.render_drop_primary_key(table)?
            }
            AlterAction::AddForeignKey(fk) => {
                if inspector.foreign_key(table, &fk.name).await.is_none() {
                    return Ok(Outcome::Unchanged);
                }
                renderer.render_drop_foreign_key(table, &fk.name)?
            }
            AlterAction::DropColumn(_)
            | AlterAction::DropIndex(_)
            | AlterAction::DropPrimaryKey
            | AlterAction::DropForeignKey(_)
            | AlterAction::ModifyColumn(_) => {
                warn_unrestorable(ctx, &format!("{} on {table}", action.describe()));
                return Ok(Outcome::Unchanged);
            }
        },
    };

    ctx.exec_sql(&statements).await?;
    Ok(Outcome::Changed)
}

fn warn_unrestorable(ctx: &MigrationContext, what: &str) {
    ctx.logger()
        .warning(&format!("Skip DOWN {what}: no snapshot recorded in this run."));
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::database::Row;
    use crate::engine::{Engine, EngineInfo};
    use crate::feature::FeatureMatrix;
    use crate::testing::{MemoryLogger, RecordingDatabase};

    fn mariadb(db: &Arc<RecordingDatabase>, logger: &Arc<MemoryLogger>) -> MigrationContext {
        MigrationContext::new(
            db.clone(),
            logger.clone(),
            EngineInfo::new(Engine::MariaDb, "10.6.12-MariaDB"),
            FeatureMatrix::default(),
        )
    }

    fn column_row(name: &str) -> Row {
        Row::new()
            .with("COLUMN_NAME", name)
            .with("COLUMN_TYPE", "int(11)")
            .with("IS_NULLABLE", "YES")
            .with("EXTRA", "")
    }

    #[tokio::test]
    async fn test_skip_only_warns() {
        let db = Arc::new(RecordingDatabase::new());
        let logger = Arc::new(MemoryLogger::new());
        let ctx = mariadb(&db, &logger);

        let mut op = ctx.skip("Skip UP something");
        assert!(op.is_skip());
        assert!(!op.has_down());
        assert_eq!(op.up(&ctx).await.unwrap(), Outcome::Skipped);
        assert_eq!(op.down(&ctx).await.unwrap(), Outcome::Unchanged);
        assert_eq!(logger.warnings(), vec!["Skip UP something"]);
        assert!(db.queries().is_empty());
        assert!(db.executed().is_empty());
    }

    #[tokio::test]
    async fn test_drop_column_snapshot_round_trip() {
        let db = Arc::new(RecordingDatabase::new());
        let logger = Arc::new(MemoryLogger::new());
        let ctx = mariadb(&db, &logger);
        db.respond(
            "information_schema.columns",
            vec![column_row("id"), column_row("b")],
        );

        let mut op = Operation::alter("t", AlterAction::DropColumn("b".into()));
        assert_eq!(op.up(&ctx).await.unwrap(), Outcome::Changed);
        assert!(matches!(
            op.state(),
            OperationState::Applied(Snapshot::Column(c)) if c.name == "b"
        ));

        assert_eq!(op.down(&ctx).await.unwrap(), Outcome::Changed);
        assert_eq!(op.state(), &OperationState::Reverted);
        assert_eq!(
            db.executed(),
            vec![
                "ALTER TABLE `t` DROP COLUMN `b`;",
                "ALTER TABLE `t` ADD COLUMN `b` int(11) NULL AFTER `id`;",
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_column_is_noop_both_ways() {
        let db = Arc::new(RecordingDatabase::new());
        let logger = Arc::new(MemoryLogger::new());
        let ctx = mariadb(&db, &logger);

        let mut op = Operation::alter("t", AlterAction::DropColumn("ghost".into()));
        assert_eq!(op.up(&ctx).await.unwrap(), Outcome::Unchanged);
        assert_eq!(op.down(&ctx).await.unwrap(), Outcome::Unchanged);
        assert!(db.executed().is_empty());
    }

    #[tokio::test]
    async fn test_up_twice_changes_once() {
        let db = Arc::new(RecordingDatabase::new());
        let logger = Arc::new(MemoryLogger::new());
        let ctx = mariadb(&db, &logger);

        let mut op = Operation::alter(
            "t",
            AlterAction::AddColumn(ColumnDefinition::new("c", "INT").nullable(true)),
        );
        assert_eq!(op.up(&ctx).await.unwrap(), Outcome::Changed);
        assert_eq!(op.up(&ctx).await.unwrap(), Outcome::Unchanged);
        assert_eq!(db.executed().len(), 1);
    }

    #[tokio::test]
    async fn test_modify_column_restores_old_definition() {
        let db = Arc::new(RecordingDatabase::new());
        let logger = Arc::new(MemoryLogger::new());
        let ctx = mariadb(&db, &logger);
        db.respond("information_schema.columns", vec![column_row("a")]);

        let change = ColumnChange::new("a").data_type("BIGINT").nullable(false);
        let mut op = Operation::alter("t", AlterAction::ModifyColumn(change));
        op.up(&ctx).await.unwrap();
        op.down(&ctx).await.unwrap();

        assert_eq!(
            db.executed(),
            vec![
                "ALTER TABLE `t` MODIFY COLUMN `a` BIGINT NOT NULL FIRST;",
                "ALTER TABLE `t` MODIFY COLUMN `a` int(11) NULL FIRST;",
            ]
        );
    }

    #[tokio::test]
    async fn test_sql_operation() {
        let db = Arc::new(RecordingDatabase::new());
        let logger = Arc::new(MemoryLogger::new());
        let ctx = mariadb(&db, &logger);

        let mut op = Operation::sql(["INSERT INTO t VALUES (1)"], ["DELETE FROM t"]);
        assert!(op.has_down());
        op.up(&ctx).await.unwrap();
        op.down(&ctx).await.unwrap();
        assert_eq!(db.executed(), vec!["INSERT INTO t VALUES (1)", "DELETE FROM t"]);

        let op = Operation::sql(["SELECT 1"], Vec::<String>::new()).irreversible();
        assert!(!op.has_down());
    }

    #[tokio::test]
    async fn test_unrecorded_down_uses_live_schema() {
        let db = Arc::new(RecordingDatabase::new());
        let logger = Arc::new(MemoryLogger::new());
        let ctx = mariadb(&db, &logger);
        db.respond("information_schema.columns", vec![column_row("c")]);

        let mut add = Operation::alter(
            "t",
            AlterAction::AddColumn(ColumnDefinition::new("c", "INT")),
        );
        assert_eq!(add.down(&ctx).await.unwrap(), Outcome::Changed);
        assert_eq!(db.executed(), vec!["ALTER TABLE `t` DROP COLUMN `c`;"]);

        let mut drop = Operation::alter("t", AlterAction::DropColumn("c".into()));
        assert_eq!(drop.down(&ctx).await.unwrap(), Outcome::Unchanged);
        assert_eq!(
            logger.warnings(),
            vec!["Skip DOWN drop column c on t: no snapshot recorded in this run."]
        );
    }
}

use super::compile_alter;
use crate::context::MigrationContext;
use crate::error::Result;
use crate::migration::{MigrationStep, StepItem};
use crate::operation::{AlterAction, Operation};

/// Builder removing columns, indexes, the primary key or foreign keys.
///
/// `up` captures each object before dropping it so that `down` can put it
/// back. Objects that are already gone are left alone in both directions.
#[derive(Debug, Clone)]
pub struct AlterTableDrop {
    table: String,
    actions: Vec<AlterAction>,
}

impl AlterTableDrop {
    /// Starts an alteration of `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            actions: Vec::new(),
        }
    }

    /// Drops a column.
    #[must_use]
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.actions.push(AlterAction::DropColumn(name.into()));
        self
    }

    /// Drops an index.
    #[must_use]
    pub fn index(mut self, name: impl Into<String>) -> Self {
        self.actions.push(AlterAction::DropIndex(name.into()));
        self
    }

    /// Drops the primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.actions.push(AlterAction::DropPrimaryKey);
        self
    }

    /// Drops a foreign key.
    #[must_use]
    pub fn foreign_key(mut self, name: impl Into<String>) -> Self {
        self.actions.push(AlterAction::DropForeignKey(name.into()));
        self
    }

    /// Compiles one operation per removal.
    #[must_use]
    pub fn compile(&self, ctx: &MigrationContext) -> Vec<Operation> {
        compile_alter(ctx, &self.table, &self.actions)
    }
}

impl MigrationStep for AlterTableDrop {
    fn expand(&self, ctx: &MigrationContext) -> Result<Vec<StepItem>> {
        Ok(self.compile(ctx).into_iter().map(StepItem::from).collect())
    }
}

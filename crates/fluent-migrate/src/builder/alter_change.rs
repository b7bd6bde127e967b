use super::compile_alter;
use crate::context::MigrationContext;
use crate::error::Result;
use crate::migration::{MigrationStep, StepItem};
use crate::operation::{AlterAction, Operation};
use crate::schema::ColumnChange;

/// Builder redefining existing columns.
///
/// Fields left unset on a [`ColumnChange`] keep their current value. `down`
/// restores the definition read before the change.
#[derive(Debug, Clone)]
pub struct AlterTableChange {
    table: String,
    actions: Vec<AlterAction>,
}

impl AlterTableChange {
    /// Starts an alteration of `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            actions: Vec::new(),
        }
    }

    /// Adds a column change, rejecting empty or malformed ones.
    pub fn column(mut self, change: ColumnChange) -> Result<Self> {
        change.validate()?;
        self.actions.push(AlterAction::ModifyColumn(change));
        Ok(self)
    }

    /// Compiles one operation per changed column.
    #[must_use]
    pub fn compile(&self, ctx: &MigrationContext) -> Vec<Operation> {
        compile_alter(ctx, &self.table, &self.actions)
    }
}

impl MigrationStep for AlterTableChange {
    fn expand(&self, ctx: &MigrationContext) -> Result<Vec<StepItem>> {
        Ok(self.compile(ctx).into_iter().map(StepItem::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::engine::{Engine, EngineInfo};
    use crate::error::MigrateError;
    use crate::feature::FeatureMatrix;
    use crate::testing::{MemoryLogger, RecordingDatabase};

    #[test]
    fn test_rejects_empty_change() {
        let err = AlterTableChange::new("t")
            .column(ColumnChange::new("a"))
            .unwrap_err();
        assert!(matches!(err, MigrateError::InvalidColumnChange(_)));
    }

    #[test]
    fn test_sqlite_cannot_modify_columns() {
        let ctx = MigrationContext::new(
            Arc::new(RecordingDatabase::new()),
            Arc::new(MemoryLogger::new()),
            EngineInfo::new(Engine::Sqlite, "3.45.1"),
            FeatureMatrix::default(),
        );
        let ops = AlterTableChange::new("t")
            .column(ColumnChange::new("a").nullable(true))
            .unwrap()
            .compile(&ctx);
        assert_eq!(ops.len(), 1);
        assert!(ops[0].is_skip());
    }
}

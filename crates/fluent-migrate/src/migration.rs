//! Migration units and step normalization.

use crate::context::MigrationContext;
use crate::error::{MigrateError, Result};
use crate::ledger::shorten_entry;
use crate::operation::Operation;

/// Maximum nesting of steps and groups inside one migration.
pub const MAX_NESTING: usize = 32;

/// Something that contributes operations to a migration.
///
/// Builders implement it by compiling themselves; closures taking the
/// context can be used for anything else:
///
/// ```rust,ignore
/// Migration::new("2024-01-02-10-00-00-seed.sql")?
///     .step(|_: &MigrationContext| -> Result<Vec<StepItem>> {
///         let seed = Operation::sql(
///             ["INSERT INTO roles (name) VALUES ('admin')"],
///             ["DELETE FROM roles WHERE name = 'admin'"],
///         );
///         Ok(vec![seed.into()])
///     });
/// ```
pub trait MigrationStep: Send + Sync {
    /// Expands into operations, nested steps or groups.
    fn expand(&self, ctx: &MigrationContext) -> Result<Vec<StepItem>>;
}

impl<F> MigrationStep for F
where
    F: Fn(&MigrationContext) -> Result<Vec<StepItem>> + Send + Sync,
{
    fn expand(&self, ctx: &MigrationContext) -> Result<Vec<StepItem>> {
        self(ctx)
    }
}

/// One element produced by a step.
pub enum StepItem {
    /// A ready operation.
    Operation(Operation),
    /// A step to expand further.
    Step(Box<dyn MigrationStep>),
    /// Items flattened in place.
    Group(Vec<StepItem>),
}

impl StepItem {
    /// Wraps a step.
    pub fn step(step: impl MigrationStep + 'static) -> Self {
        Self::Step(Box::new(step))
    }
}

impl From<Operation> for StepItem {
    fn from(op: Operation) -> Self {
        Self::Operation(op)
    }
}

impl std::fmt::Debug for StepItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Operation(op) => f.debug_tuple("Operation").field(op).finish(),
            Self::Step(_) => f.write_str("Step(..)"),
            Self::Group(items) => f.debug_tuple("Group").field(items).finish(),
        }
    }
}

/// Flattens step items into the ordered list of operations they describe.
///
/// Fails with [`MigrateError::NestingTooDeep`] past [`MAX_NESTING`] levels.
pub fn normalize(ctx: &MigrationContext, items: Vec<StepItem>) -> Result<Vec<Operation>> {
    let mut ops = Vec::new();
    flatten(ctx, items, 1, &mut ops)?;
    Ok(ops)
}

fn flatten(
    ctx: &MigrationContext,
    items: Vec<StepItem>,
    depth: usize,
    out: &mut Vec<Operation>,
) -> Result<()> {
    if depth > MAX_NESTING {
        return Err(MigrateError::NestingTooDeep(MAX_NESTING));
    }
    for item in items {
        match item {
            StepItem::Operation(op) => out.push(op),
            StepItem::Step(step) => flatten(ctx, step.expand(ctx)?, depth + 1, out)?,
            StepItem::Group(items) => flatten(ctx, items, depth + 1, out)?,
        }
    }
    Ok(())
}

/// A migration unit: an ordered list of steps recorded in the ledger under
/// one entry.
pub struct Migration {
    name: String,
    entry: String,
    steps: Vec<Box<dyn MigrationStep>>,
}

impl Migration {
    /// Creates a unit from its file name, which must start with a
    /// `YYYY-MM-DD-HH-MM-SS` timestamp.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let entry = shorten_entry(&name)?;
        Ok(Self {
            name,
            entry,
            steps: Vec::new(),
        })
    }

    /// Appends a step.
    #[must_use]
    pub fn step(mut self, step: impl MigrationStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// The file name the unit was created from.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The ledger entry (the leading timestamp of the name).
    #[must_use]
    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Expands every step into the unit's operations, in order.
    pub fn compile(&self, ctx: &MigrationContext) -> Result<Vec<Operation>> {
        let mut ops = Vec::new();
        for step in &self.steps {
            flatten(ctx, step.expand(ctx)?, 1, &mut ops)?;
        }
        Ok(ops)
    }
}

impl std::fmt::Debug for Migration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migration")
            .field("name", &self.name)
            .field("entry", &self.entry)
            .field("steps", &self.steps.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::builder::{AlterTableDrop, DropTable};
    use crate::engine::EngineInfo;
    use crate::feature::FeatureMatrix;
    use crate::testing::{MemoryLogger, RecordingDatabase};

    fn context() -> MigrationContext {
        MigrationContext::new(
            Arc::new(RecordingDatabase::new()),
            Arc::new(MemoryLogger::new()),
            EngineInfo::unknown(),
            FeatureMatrix::default(),
        )
    }

    fn nested(levels: usize) -> StepItem {
        let mut item = StepItem::from(Operation::skip("deep"));
        for _ in 0..levels {
            item = StepItem::Group(vec![item]);
        }
        item
    }

    #[test]
    fn test_flattens_in_order() {
        let ctx = context();
        let items = vec![
            Operation::skip("a").into(),
            StepItem::Group(vec![
                Operation::skip("b").into(),
                StepItem::step(|_: &MigrationContext| -> Result<Vec<StepItem>> {
                    Ok(vec![Operation::skip("c").into(), Operation::skip("d").into()])
                }),
            ]),
            Operation::skip("e").into(),
        ];

        let ops = normalize(&ctx, items).unwrap();
        let names: Vec<String> = ops.iter().map(Operation::describe).collect();
        assert_eq!(
            names,
            vec!["skip (a)", "skip (b)", "skip (c)", "skip (d)", "skip (e)"]
        );
    }

    #[test]
    fn test_depth_limit() {
        let ctx = context();
        assert_eq!(normalize(&ctx, vec![nested(MAX_NESTING - 1)]).unwrap().len(), 1);
        assert!(matches!(
            normalize(&ctx, vec![nested(MAX_NESTING)]),
            Err(MigrateError::NestingTooDeep(MAX_NESTING))
        ));
    }

    #[test]
    fn test_migration_compiles_steps() {
        let ctx = context();
        let migration = Migration::new("2024-03-01-12-00-00-cleanup.php")
            .unwrap()
            .step(AlterTableDrop::new("t").column("a").column("b"))
            .step(DropTable::new("old"));

        assert_eq!(migration.entry(), "2024-03-01-12-00-00");
        assert_eq!(migration.name(), "2024-03-01-12-00-00-cleanup.php");
        let ops = migration.compile(&ctx).unwrap();
        assert_eq!(ops.len(), 3);
        // nothing is supported on an unknown engine
        assert!(ops.iter().all(Operation::is_skip));
    }

    #[test]
    fn test_rejects_names_without_timestamp() {
        assert!(matches!(
            Migration::new("create_users.sql"),
            Err(MigrateError::InvalidEntryName(_))
        ));
    }
}

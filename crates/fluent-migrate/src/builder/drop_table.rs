use crate::context::MigrationContext;
use crate::error::Result;
use crate::feature::Feature;
use crate::migration::{MigrationStep, StepItem};
use crate::operation::Operation;

/// Builder for `DROP TABLE`.
///
/// `up` reads the statements recreating the table before dropping it;
/// `down` replays them.
#[derive(Debug, Clone)]
pub struct DropTable {
    table: String,
}

impl DropTable {
    /// Drops `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    /// Compiles into a single guarded drop operation, or a skip operation.
    #[must_use]
    pub fn compile(&self, ctx: &MigrationContext) -> Vec<Operation> {
        let unsupported = ctx
            .features()
            .unsupported(&[Feature::DropTable, Feature::CreateTable]);
        if !unsupported.is_empty() {
            return vec![ctx.skip(ctx.unsupported_message("drop table", &self.table, &unsupported))];
        }
        vec![Operation::drop_table(self.table.clone())]
    }
}

impl MigrationStep for DropTable {
    fn expand(&self, ctx: &MigrationContext) -> Result<Vec<StepItem>> {
        Ok(self.compile(ctx).into_iter().map(StepItem::from).collect())
    }
}

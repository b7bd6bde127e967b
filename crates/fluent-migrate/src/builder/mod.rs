//! Statement builders.
//!
//! Each builder accumulates a declarative description of a schema change and
//! compiles it against a [`MigrationContext`] into guarded [`Operation`]s.
//! Changes the engine cannot perform compile into skip operations.

mod alter_add;
mod alter_change;
mod alter_drop;
mod create_table;
mod drop_table;
mod helpers;

use crate::context::MigrationContext;
use crate::operation::{AlterAction, Operation};

pub use alter_add::AlterTableAdd;
pub use alter_change::AlterTableChange;
pub use alter_drop::AlterTableDrop;
pub use create_table::CreateTable;
pub use drop_table::DropTable;
pub use helpers::{AddForeignKey, AddIndex};

/// Compiles alter actions one operation each, skipping the ones whose
/// features the engine lacks.
fn compile_alter(ctx: &MigrationContext, table: &str, actions: &[AlterAction]) -> Vec<Operation> {
    actions
        .iter()
        .map(|action| {
            let unsupported = ctx.features().unsupported(&action.required_features());
            if unsupported.is_empty() {
                Operation::alter(table, action.clone())
            } else {
                ctx.skip(ctx.unsupported_message(&action.describe(), table, &unsupported))
            }
        })
        .collect()
}

//! Migration runner.
//!
//! Applies pending units in entry order, rolls a unit back in reverse when
//! one of its operations fails, and records a unit in the ledger only after
//! all of its operations succeeded.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::context::MigrationContext;
use crate::database::Database;
use crate::error::{MigrateError, Result};
use crate::feature::FeatureMatrix;
use crate::ledger::Ledger;
use crate::logger::{Logger, TracingLogger};
use crate::migration::Migration;
use crate::operation::{Operation, Outcome};

/// Runs `up` on each operation in order.
///
/// When an operation fails, the operations already applied are reverted in
/// reverse order (failures there are only logged) and the original error is
/// returned. The failing operation's own `down` is not run.
pub async fn apply_operations(ctx: &MigrationContext, ops: &mut [Operation]) -> Result<()> {
    let mut rollback: Vec<usize> = Vec::new();

    for index in 0..ops.len() {
        match ops[index].up(ctx).await {
            Ok(_) => {
                if ops[index].has_down() {
                    rollback.push(index);
                }
            }
            Err(err) => {
                warn!(operation = %ops[index].describe(), error = %err, "Operation failed, rolling back");
                for &done in rollback.iter().rev() {
                    if let Err(rollback_err) = ops[done].down(ctx).await {
                        ctx.logger().warning(&format!(
                            "Rollback of {} failed: {rollback_err}",
                            ops[done].describe()
                        ));
                    }
                }
                return Err(err);
            }
        }
    }
    Ok(())
}

/// Runs `down` on each operation in reverse order.
///
/// When a `down` fails, the operations already reverted are re-applied in
/// reverse (best effort) and the original error is returned.
pub async fn revert_operations(ctx: &MigrationContext, ops: &mut [Operation]) -> Result<()> {
    let mut reverted: Vec<usize> = Vec::new();

    for index in (0..ops.len()).rev() {
        match ops[index].down(ctx).await {
            Ok(Outcome::Changed) => reverted.push(index),
            Ok(Outcome::Unchanged | Outcome::Skipped) => {}
            Err(err) => {
                warn!(operation = %ops[index].describe(), error = %err, "Revert failed, re-applying");
                for &undone in reverted.iter().rev() {
                    if let Err(reapply_err) = ops[undone].up(ctx).await {
                        ctx.logger().warning(&format!(
                            "Re-applying {} failed: {reapply_err}",
                            ops[undone].describe()
                        ));
                    }
                }
                return Err(err);
            }
        }
    }
    Ok(())
}

/// What a [`MigrationManager::migrate`] run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Entries applied in this run, in order.
    pub applied: Vec<String>,
    /// Entries found in the ledger and left alone.
    pub skipped: Vec<String>,
}

/// Applies and reverts migration units against one database.
pub struct MigrationManager<L: Ledger> {
    db: Arc<dyn Database>,
    ledger: L,
    logger: Arc<dyn Logger>,
    matrix: FeatureMatrix,
}

impl<L: Ledger> MigrationManager<L> {
    /// Creates a manager logging through `tracing` with the default feature
    /// matrix.
    pub fn new(db: Arc<dyn Database>, ledger: L) -> Self {
        Self {
            db,
            ledger,
            logger: Arc::new(TracingLogger),
            matrix: FeatureMatrix::default(),
        }
    }

    /// Routes skip notices and progress messages to `logger`.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Replaces the feature matrix.
    #[must_use]
    pub fn with_feature_matrix(mut self, matrix: FeatureMatrix) -> Self {
        self.matrix = matrix;
        self
    }

    /// The ledger.
    #[must_use]
    pub const fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Detects the engine and builds a fresh context.
    pub async fn context(&self) -> MigrationContext {
        MigrationContext::detect(self.db.clone(), self.logger.clone(), self.matrix.clone()).await
    }

    /// Applies every unit whose entry is not in the ledger yet, in entry
    /// order.
    ///
    /// Stops at the first failing unit; units applied before it stay
    /// recorded.
    pub async fn migrate(&self, migrations: &[Migration]) -> Result<MigrationReport> {
        self.logger.info("Starting migration");

        let ordered = sorted(migrations)?;
        let ctx = self.context().await;
        let mut applied: HashSet<String> = self.ledger.list_entries().await?.into_iter().collect();
        let mut report = MigrationReport::default();

        for migration in ordered {
            if applied.contains(migration.entry()) {
                debug!(entry = %migration.entry(), "Already applied");
                report.skipped.push(migration.entry().to_string());
                continue;
            }

            self.logger
                .info(&format!("Try to run upgrade file {}", migration.name()));
            self.apply_unit(&ctx, migration).await?;
            self.ledger.add_entry(migration.entry()).await?;
            applied.insert(migration.entry().to_string());
            report.applied.push(migration.entry().to_string());
            self.logger.info("Done.");
        }

        self.logger.info("Migration done.");
        Ok(report)
    }

    /// Applies one unit without consulting or updating the ledger.
    pub async fn up(&self, migration: &Migration) -> Result<()> {
        let ctx = self.context().await;
        self.apply_unit(&ctx, migration).await
    }

    /// Reverts one unit without updating the ledger.
    pub async fn down(&self, migration: &Migration) -> Result<()> {
        let ctx = self.context().await;
        let mut ops = migration.compile(&ctx)?;
        debug!(entry = %migration.entry(), operations = ops.len(), "Reverting unit");
        revert_operations(&ctx, &mut ops).await
    }

    /// Reverts one unit and removes it from the ledger.
    pub async fn rollback(&self, migration: &Migration) -> Result<()> {
        self.logger
            .info(&format!("Try to run downgrade file {}", migration.name()));
        self.down(migration).await?;
        self.ledger.remove_entry(migration.entry()).await?;
        self.logger.info("Done.");
        Ok(())
    }

    /// Units not in the ledger yet, in entry order.
    pub async fn pending<'a>(&self, migrations: &'a [Migration]) -> Result<Vec<&'a Migration>> {
        let applied: HashSet<String> = self.ledger.list_entries().await?.into_iter().collect();
        Ok(sorted(migrations)?
            .into_iter()
            .filter(|m| !applied.contains(m.entry()))
            .collect())
    }

    async fn apply_unit(&self, ctx: &MigrationContext, migration: &Migration) -> Result<()> {
        let mut ops = migration.compile(ctx)?;
        debug!(entry = %migration.entry(), operations = ops.len(), "Applying unit");
        apply_operations(ctx, &mut ops).await
    }
}

impl<L: Ledger> std::fmt::Debug for MigrationManager<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationManager").finish_non_exhaustive()
    }
}

/// Orders units by name and rejects two units sharing an entry.
fn sorted(migrations: &[Migration]) -> Result<Vec<&Migration>> {
    let mut ordered: Vec<&Migration> = migrations.iter().collect();
    ordered.sort_by(|a, b| a.name().cmp(b.name()));
    let mut seen = HashSet::new();
    for migration in &ordered {
        if !seen.insert(migration.entry()) {
            return Err(MigrateError::DuplicateMigration(migration.entry().to_string()));
        }
    }
    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::engine::EngineInfo;
    use crate::migration::StepItem;
    use crate::operation::CustomOperation;
    use crate::testing::{MemoryLedger, MemoryLogger, RecordingDatabase};

    type Events = Arc<Mutex<Vec<String>>>;

    struct Tracer {
        name: &'static str,
        fail_up: bool,
        fail_down: bool,
        events: Events,
    }

    impl Tracer {
        fn op(name: &'static str, events: &Events) -> Operation {
            Operation::custom(Self {
                name,
                fail_up: false,
                fail_down: false,
                events: events.clone(),
            })
        }

        fn failing_up(name: &'static str, events: &Events) -> Operation {
            Operation::custom(Self {
                name,
                fail_up: true,
                fail_down: false,
                events: events.clone(),
            })
        }

        fn failing_down(name: &'static str, events: &Events) -> Operation {
            Operation::custom(Self {
                name,
                fail_up: false,
                fail_down: true,
                events: events.clone(),
            })
        }

        fn record(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[async_trait]
    impl CustomOperation for Tracer {
        async fn up(&mut self, _ctx: &MigrationContext) -> Result<()> {
            self.record(format!("up {}", self.name));
            if self.fail_up {
                return Err(MigrateError::Operation(format!("{} broke", self.name)));
            }
            Ok(())
        }

        async fn down(&mut self, _ctx: &MigrationContext) -> Result<()> {
            self.record(format!("down {}", self.name));
            if self.fail_down {
                return Err(MigrateError::Operation(format!("{} broke", self.name)));
            }
            Ok(())
        }

        fn has_down(&self) -> bool {
            true
        }

        fn description(&self) -> String {
            self.name.to_string()
        }
    }

    fn context(db: Arc<RecordingDatabase>, logger: Arc<MemoryLogger>) -> MigrationContext {
        MigrationContext::new(db, logger, EngineInfo::unknown(), FeatureMatrix::default())
    }

    fn sql_step(up: &'static str, down: &'static str) -> impl crate::migration::MigrationStep {
        move |_: &MigrationContext| -> Result<Vec<StepItem>> {
            Ok(vec![Operation::sql([up], [down]).into()])
        }
    }

    #[tokio::test]
    async fn test_apply_rolls_back_in_reverse() {
        let events = Events::default();
        let ctx = context(
            Arc::new(RecordingDatabase::new()),
            Arc::new(MemoryLogger::new()),
        );
        let mut ops = vec![
            Tracer::op("a", &events),
            Tracer::op("b", &events),
            Tracer::failing_up("c", &events),
        ];

        let err = apply_operations(&ctx, &mut ops).await.unwrap_err();
        assert!(matches!(err, MigrateError::Operation(ref m) if m == "c broke"));
        assert_eq!(
            *events.lock().unwrap(),
            vec!["up a", "up b", "up c", "down b", "down a"]
        );
    }

    #[tokio::test]
    async fn test_failure_stops_before_later_operations() {
        let events = Events::default();
        let ctx = context(
            Arc::new(RecordingDatabase::new()),
            Arc::new(MemoryLogger::new()),
        );
        let mut ops = vec![
            Tracer::op("a", &events),
            Tracer::failing_up("b", &events),
            Tracer::op("c", &events),
        ];

        let err = apply_operations(&ctx, &mut ops).await.unwrap_err();
        assert!(matches!(err, MigrateError::Operation(ref m) if m == "b broke"));
        assert_eq!(*events.lock().unwrap(), vec!["up a", "up b", "down a"]);
    }

    #[tokio::test]
    async fn test_rollback_failures_are_swallowed() {
        let events = Events::default();
        let logger = Arc::new(MemoryLogger::new());
        let ctx = context(Arc::new(RecordingDatabase::new()), logger.clone());
        let mut ops = vec![
            Tracer::op("a", &events),
            Tracer::failing_down("b", &events),
            Tracer::failing_up("c", &events),
        ];

        let err = apply_operations(&ctx, &mut ops).await.unwrap_err();
        assert!(matches!(err, MigrateError::Operation(ref m) if m == "c broke"));
        assert_eq!(
            *events.lock().unwrap(),
            vec!["up a", "up b", "up c", "down b", "down a"]
        );
        assert_eq!(
            logger.warnings(),
            vec!["Rollback of b failed: Operation failed: b broke"]
        );
    }

    #[tokio::test]
    async fn test_revert_reapplies_on_failure() {
        let events = Events::default();
        let ctx = context(
            Arc::new(RecordingDatabase::new()),
            Arc::new(MemoryLogger::new()),
        );
        let mut ops = vec![
            Tracer::op("a", &events),
            Tracer::failing_down("b", &events),
            Tracer::op("c", &events),
        ];

        assert!(revert_operations(&ctx, &mut ops).await.is_err());
        assert_eq!(*events.lock().unwrap(), vec!["down c", "down b", "up c"]);
    }

    #[tokio::test]
    async fn test_migrate_records_only_successful_units() {
        let db = Arc::new(RecordingDatabase::new());
        db.fail_on("BROKEN");
        let logger = Arc::new(MemoryLogger::new());
        let manager = MigrationManager::new(db.clone(), MemoryLedger::new())
            .with_logger(logger.clone());

        let migrations = vec![
            Migration::new("2015-01-01-12-00-00 broken.php")
                .unwrap()
                .step(sql_step("CREATE TABLE b (id INT)", "DROP TABLE b"))
                .step(sql_step("BROKEN", "SELECT 1")),
            Migration::new("2015-01-01-11-00-00 first.php")
                .unwrap()
                .step(sql_step("CREATE TABLE a (id INT)", "DROP TABLE a")),
        ];

        assert!(manager.migrate(&migrations).await.is_err());
        assert_eq!(
            db.executed(),
            vec!["CREATE TABLE a (id INT)", "CREATE TABLE b (id INT)", "DROP TABLE b"]
        );
        assert_eq!(
            manager.ledger().list_entries().await.unwrap(),
            vec!["2015-01-01-11-00-00"]
        );
        assert_eq!(
            logger.infos(),
            vec![
                "Starting migration",
                "Try to run upgrade file 2015-01-01-11-00-00 first.php",
                "Done.",
                "Try to run upgrade file 2015-01-01-12-00-00 broken.php",
            ]
        );

        let pending = manager.pending(&migrations).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].entry(), "2015-01-01-12-00-00");
    }

    #[tokio::test]
    async fn test_migrate_skips_recorded_units() {
        let db = Arc::new(RecordingDatabase::new());
        let ledger = MemoryLedger::with_entries(["2015-01-01-11-00-00"]).unwrap();
        let manager = MigrationManager::new(db.clone(), ledger)
            .with_logger(Arc::new(MemoryLogger::new()));
        let migrations = vec![
            Migration::new("2015-01-01-11-00-00.php")
                .unwrap()
                .step(sql_step("CREATE TABLE a (id INT)", "DROP TABLE a")),
            Migration::new("2015-01-01-12-00-00.php")
                .unwrap()
                .step(sql_step("CREATE TABLE b (id INT)", "DROP TABLE b")),
        ];

        let report = manager.migrate(&migrations).await.unwrap();
        assert_eq!(report.applied, vec!["2015-01-01-12-00-00"]);
        assert_eq!(report.skipped, vec!["2015-01-01-11-00-00"]);
        assert_eq!(db.executed(), vec!["CREATE TABLE b (id INT)"]);

        let report = manager.migrate(&migrations).await.unwrap();
        assert!(report.applied.is_empty());

        manager.rollback(&migrations[1]).await.unwrap();
        assert_eq!(db.executed().last().map(String::as_str), Some("DROP TABLE b"));
        assert_eq!(
            manager.ledger().list_entries().await.unwrap(),
            vec!["2015-01-01-11-00-00"]
        );
    }

    #[tokio::test]
    async fn test_duplicate_entries_are_rejected() {
        let manager = MigrationManager::new(Arc::new(RecordingDatabase::new()), MemoryLedger::new())
            .with_logger(Arc::new(MemoryLogger::new()));
        let migrations = vec![
            Migration::new("2015-01-01-11-00-00-a.php").unwrap(),
            Migration::new("2015-01-01-11-00-00-b.php").unwrap(),
        ];
        assert!(matches!(
            manager.migrate(&migrations).await,
            Err(MigrateError::DuplicateMigration(entry)) if entry == "2015-01-01-11-00-00"
        ));
    }
}

#![allow(dead_code)]

use std::sync::Arc;

use fluent_migrate::inspector::inspector_for;
use fluent_migrate::prelude::*;
use fluent_migrate::testing::MemoryLogger;
use fluent_migrate_sqlite::SqliteDatabase;

pub async fn memory_db() -> Arc<dyn Database> {
    Arc::new(
        SqliteDatabase::connect(":memory:")
            .await
            .unwrap_or_else(|e| panic!("Failed to open in-memory database: {e}")),
    )
}

pub async fn manager(
    db: &Arc<dyn Database>,
    logger: &Arc<MemoryLogger>,
) -> MigrationManager<DatabaseLedger> {
    let ledger = DatabaseLedger::open(db.clone(), "migrations").await.unwrap();
    MigrationManager::new(db.clone(), ledger).with_logger(logger.clone())
}

pub async fn inspector(db: &Arc<dyn Database>) -> Box<dyn SchemaInspector> {
    let info = EngineInfo::detect(db.as_ref()).await;
    assert_eq!(info.engine, Engine::Sqlite);
    inspector_for(db.clone(), &info)
}

pub fn users_table() -> Migration {
    Migration::new("2024-01-01-10-00-00 create users.rs")
        .unwrap()
        .step(
            CreateTable::new("users")
                .int_column("id")
                .varchar_column("email", 255)
                .primary_key(["id"]),
        )
}

pub async fn column_names(db: &Arc<dyn Database>, table: &str) -> Vec<String> {
    inspector(db)
        .await
        .columns(table)
        .await
        .into_iter()
        .map(|c| c.name)
        .collect()
}

//! Example: Blog Schema Migrations
//!
//! Applies three migration units to an in-memory SQLite database, shows the
//! resulting schema, then rolls the last unit back.
//!
//! Run with: cargo run --example blog -p fluent-migrate-sqlite

use std::sync::Arc;

use fluent_migrate::inspector::inspector_for;
use fluent_migrate::prelude::*;
use fluent_migrate_sqlite::SqliteDatabase;

// =============================================================================
// Migration Definitions
// =============================================================================

fn create_users() -> Result<Migration> {
    Ok(Migration::new("2024-01-01-10-00-00 create users.rs")?.step(
        CreateTable::new("users")
            .int_column("id")
            .varchar_column("username", 100)
            .varchar_column("email", 255)
            .column(columns::boolean("is_active").default_value(true))
            .primary_key(["id"])
            .unique_index("uq_users_email", ["email"]),
    ))
}

fn create_posts() -> Result<Migration> {
    Ok(Migration::new("2024-01-02-10-00-00 create posts.rs")?
        .step(
            CreateTable::new("posts")
                .int_column("id")
                .int_column("author_id")
                .varchar_column("title", 200)
                .column(columns::text("body").nullable(true))
                .primary_key(["id"]),
        )
        // SQLite only creates plain indexes through ALTER.
        .step(AlterTableAdd::new("posts").index("idx_posts_author", ["author_id"])))
}

fn add_bio() -> Result<Migration> {
    Ok(Migration::new("2024-01-03-10-00-00 add bio.rs")?.step(
        AlterTableAdd::new("users")
            .column(columns::text("bio").nullable(true))
            // Column comments are not available on SQLite: skipped with a warning.
            .column(columns::int("karma").nullable(true).comment("reputation")),
    ))
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .without_time()
        .init();

    let db: Arc<dyn Database> = Arc::new(SqliteDatabase::connect(":memory:").await?);
    let ledger = DatabaseLedger::open(db.clone(), "migrations").await?;
    let manager = MigrationManager::new(db.clone(), ledger);

    let migrations = [create_users()?, create_posts()?, add_bio()?];
    let report = manager.migrate(&migrations).await?;
    println!("Applied: {}", report.applied.join(", "));

    let inspector = inspector_for(db.clone(), &EngineInfo::detect(db.as_ref()).await);
    for table in ["users", "posts"] {
        println!("\n{table}:");
        for column in inspector.columns(table).await {
            println!("  {} {}", column.name, column.data_type);
        }
        for index in inspector.indexes(table).await {
            println!("  index {} ({})", index.name, index.columns.join(", "));
        }
    }

    manager.rollback(&migrations[2]).await?;
    println!("\nAfter rollback: {:?}", manager.ledger().list_entries().await?);

    Ok(())
}

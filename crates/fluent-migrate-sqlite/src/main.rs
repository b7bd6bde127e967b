//! fluent-migrate CLI
//!
//! Command-line tool for inspecting a database managed by fluent-migrate:
//! the migration ledger, the detected engine and its feature support, and
//! the live schema of a table.

use std::fmt::Write as _;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use fluent_migrate::inspector::inspector_for;
use fluent_migrate::ledger::entry_timestamp;
use fluent_migrate::prelude::*;
use fluent_migrate_sqlite::SqliteDatabase;

/// Engine-aware schema migrations.
#[derive(Parser)]
#[command(name = "fluent-migrate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (SQLite path or connection string).
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:db.sqlite3")]
    database: String,

    /// Name of the migration ledger table.
    #[arg(short, long, default_value = "migrations")]
    ledger_table: String,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the migration ledger (create the ledger table).
    Init,

    /// Show applied migration entries.
    ShowMigrations,

    /// Show the detected engine and the features it supports.
    Engine,

    /// Show the columns, indexes and foreign keys of a table.
    Inspect {
        /// Table to inspect.
        table: String,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct TableReport {
    table: String,
    columns: Vec<ColumnDefinition>,
    indexes: Vec<IndexDefinition>,
    foreign_keys: Vec<ForeignKeyDefinition>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let db: Arc<dyn Database> = Arc::new(SqliteDatabase::connect(&cli.database).await?);

    match cli.command {
        Commands::Init => {
            info!("Initializing migration ledger...");
            DatabaseLedger::open(db, &cli.ledger_table).await?;
            info!("Ledger table '{}' is ready.", cli.ledger_table);
        }

        Commands::ShowMigrations => {
            let ledger = DatabaseLedger::open(db, &cli.ledger_table).await?;
            let entries = ledger.list_entries().await?;
            if entries.is_empty() {
                println!("No migrations applied.");
            }
            for entry in entries {
                match entry_timestamp(&entry) {
                    Some(at) => println!(" [X] {entry} ({})", at.format("%Y-%m-%d %H:%M:%S")),
                    None => println!(" [X] {entry}"),
                }
            }
        }

        Commands::Engine => {
            let info = EngineInfo::detect(db.as_ref()).await;
            let gate = FeatureGate::new(info, FeatureMatrix::default());
            println!("Engine: {}", gate.describe_engine());
            for feature in Feature::ALL {
                let mark = if gate.supports(feature) { "X" } else { " " };
                println!(" [{mark}] {feature}");
            }
        }

        Commands::Inspect { table, json } => {
            let info = EngineInfo::detect(db.as_ref()).await;
            let inspector = inspector_for(db.clone(), &info);
            if !inspector.table_exists(&table).await {
                anyhow::bail!("Table '{table}' does not exist");
            }

            let report = TableReport {
                columns: inspector.columns(&table).await,
                indexes: inspector.indexes(&table).await,
                foreign_keys: inspector.foreign_keys(&table).await,
                table,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", render_report(&report));
            }
        }
    }

    Ok(())
}

fn render_report(report: &TableReport) -> String {
    let mut out = format!("Table: {}\n", report.table);

    out.push_str("\nColumns:\n");
    for column in &report.columns {
        let null = if column.nullable { "NULL" } else { "NOT NULL" };
        let _ = writeln!(out, "  {} {} {null}", column.name, column.data_type);
    }

    if !report.indexes.is_empty() {
        out.push_str("\nIndexes:\n");
        for index in &report.indexes {
            let kind = if index.primary {
                "PRIMARY KEY"
            } else if index.unique {
                "UNIQUE"
            } else {
                "INDEX"
            };
            let _ = writeln!(out, "  {} {kind} ({})", index.name, index.columns.join(", "));
        }
    }

    if !report.foreign_keys.is_empty() {
        out.push_str("\nForeign keys:\n");
        for fk in &report.foreign_keys {
            let _ = writeln!(
                out,
                "  {} ({}) -> {} ({})",
                fk.name,
                fk.local_columns.join(", "),
                fk.foreign_table,
                fk.foreign_columns.join(", ")
            );
        }
    }

    out
}

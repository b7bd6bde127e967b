//! Fluent, engine-aware schema migrations.
//!
//! `fluent-migrate` applies ordered migration units to a relational database
//! while adapting to what the target engine can actually do:
//! - Builders describe schema changes (`CreateTable`, `AlterTableAdd`, ...)
//! - Every change is checked against a per-engine feature matrix; changes the
//!   engine cannot perform are skipped with a warning instead of failing
//! - Operations inspect the live schema first, so applying one twice is
//!   harmless, and record what they changed so `down` reverts exactly that
//! - A failing unit is rolled back in reverse and is not recorded in the ledger
//!
//! # Architecture
//!
//! - **Engine** - detects the server (`MySQL`, `MariaDB`, `SQLite`, ...) and its version
//! - **Feature matrix** - decides which DDL features an engine supports
//! - **Inspector** - reads tables, columns, indexes and foreign keys
//! - **Renderer** - produces engine-specific DDL
//! - **Builders** - compile declarations into guarded operations
//! - **Manager** - runs units in order, with rollback, and keeps the ledger
//!
//! The crate is driver-agnostic: drivers implement [`database::Database`].
//! `fluent-migrate-sqlite` provides one for SQLite on top of `sqlx`.
//!
//! # Example
//!
//! ```rust,ignore
//! use fluent_migrate::prelude::*;
//!
//! let users = Migration::new("2024-01-01-10-00-00 create users.rs")?
//!     .step(
//!         CreateTable::new("users")
//!             .big_int_column("id")
//!             .varchar_column("email", 255)
//!             .column(columns::text("bio").nullable(true))
//!             .primary_key(["id"])
//!             .unique_index("uq_users_email", ["email"]),
//!     );
//!
//! let posts = Migration::new("2024-01-02-10-00-00 create posts.rs")?
//!     .step(
//!         CreateTable::new("posts")
//!             .big_int_column("id")
//!             .big_int_column("user_id")
//!             .primary_key(["id"]),
//!     )
//!     .step(AlterTableAdd::new("posts").index("idx_posts_user", ["user_id"]));
//!
//! let ledger = DatabaseLedger::open(db.clone(), "migrations").await?;
//! let report = MigrationManager::new(db, ledger)
//!     .migrate(&[users, posts])
//!     .await?;
//! ```

pub mod builder;
pub mod columns;
pub mod context;
pub mod database;
pub mod engine;
pub mod error;
pub mod feature;
pub mod inspector;
pub mod ledger;
pub mod logger;
pub mod manager;
pub mod migration;
pub mod operation;
pub mod renderer;
pub mod schema;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::builder::{
        AddForeignKey, AddIndex, AlterTableAdd, AlterTableChange, AlterTableDrop, CreateTable,
        DropTable,
    };
    pub use crate::columns::{self, ColumnSink};
    pub use crate::context::MigrationContext;
    pub use crate::database::{Database, ExecResult, Param, QueryResult, Row, Value};
    pub use crate::engine::{Engine, EngineInfo, Version};
    pub use crate::error::{MigrateError, Result};
    pub use crate::feature::{Feature, FeatureGate, FeatureMatrix, SupportPolicy, VersionFloor};
    pub use crate::inspector::SchemaInspector;
    pub use crate::ledger::{shorten_entry, DatabaseLedger, Ledger};
    pub use crate::logger::{Logger, TracingLogger};
    pub use crate::manager::{MigrationManager, MigrationReport};
    pub use crate::migration::{Migration, MigrationStep, StepItem};
    pub use crate::operation::{CustomOperation, Operation, Outcome};
    pub use crate::renderer::SqlRenderer;
    pub use crate::schema::{
        ColumnChange, ColumnDefinition, ColumnPosition, DefaultValue, Expr,
        ForeignKeyDefinition, IndexDefinition, ReferentialAction,
    };
}

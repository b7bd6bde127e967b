//! Error types for the migration engine.

/// Errors that can occur while building or running migrations.
///
/// Capability gaps of the target engine are not errors: operations needing an
/// unsupported feature are compiled into skip operations that only log.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Error reported by the database driver.
    #[error("Database error: {0}")]
    Database(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A referential action string is not one of the accepted modes.
    #[error("Invalid {clause} mode '{value}' (expected NO ACTION, CASCADE, RESTRICT, SET NULL or SET DEFAULT)")]
    InvalidReferentialAction {
        /// The clause being configured (`ON UPDATE` or `ON DELETE`).
        clause: &'static str,
        /// The rejected value.
        value: String,
    },

    /// A foreign key definition is malformed.
    #[error("Invalid foreign key '{name}': {message}")]
    InvalidForeignKey {
        /// Foreign key name.
        name: String,
        /// What is wrong with it.
        message: String,
    },

    /// A column change is malformed.
    #[error("Invalid column change: {0}")]
    InvalidColumnChange(String),

    /// A ledger entry name does not start with a `YYYY-MM-DD-HH-MM-SS` timestamp.
    #[error("Invalid migration entry name: {0}")]
    InvalidEntryName(String),

    /// The renderer cannot express a DDL statement for this engine.
    #[error("{action} is not supported by the {engine} renderer")]
    UnsupportedDdl {
        /// Engine the renderer targets.
        engine: &'static str,
        /// The rejected statement kind.
        action: &'static str,
    },

    /// Migration steps expanded into more nested levels than allowed.
    #[error("Migration steps nested deeper than {0} levels")]
    NestingTooDeep(usize),

    /// Two migrations share the same ledger entry.
    #[error("Duplicate migration entry: {0}")]
    DuplicateMigration(String),

    /// A custom operation failed.
    #[error("Operation failed: {0}")]
    Operation(String),
}

impl MigrateError {
    /// Wraps a driver error.
    pub fn database(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Database(Box::new(err))
    }
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

//! Per-run migration context.

use std::sync::Arc;

use tracing::debug;

use crate::database::Database;
use crate::engine::EngineInfo;
use crate::error::Result;
use crate::feature::{join_features, Feature, FeatureGate, FeatureMatrix};
use crate::inspector::{inspector_for, SchemaInspector};
use crate::logger::Logger;
use crate::operation::Operation;
use crate::renderer::{renderer_for, SqlRenderer};

/// Everything operations need while running: the database, the logger, the
/// detected engine with its feature gate, and the engine's inspector and
/// renderer.
///
/// Built once per migration run and shared by reference.
pub struct MigrationContext {
    db: Arc<dyn Database>,
    logger: Arc<dyn Logger>,
    features: FeatureGate,
    inspector: Box<dyn SchemaInspector>,
    renderer: Box<dyn SqlRenderer>,
}

impl MigrationContext {
    /// Builds a context for a known engine using the default inspector and
    /// renderer of that engine.
    #[must_use]
    pub fn new(
        db: Arc<dyn Database>,
        logger: Arc<dyn Logger>,
        engine: EngineInfo,
        matrix: FeatureMatrix,
    ) -> Self {
        let inspector = inspector_for(db.clone(), &engine);
        let renderer = renderer_for(&engine);
        Self {
            db,
            logger,
            features: FeatureGate::new(engine, matrix),
            inspector,
            renderer,
        }
    }

    /// Detects the engine behind `db` and builds a context for it.
    pub async fn detect(db: Arc<dyn Database>, logger: Arc<dyn Logger>, matrix: FeatureMatrix) -> Self {
        let engine = EngineInfo::detect(db.as_ref()).await;
        debug!(engine = %engine.engine, version = ?engine.raw_version, "Detected database engine");
        Self::new(db, logger, engine, matrix)
    }

    /// Replaces the inspector.
    #[must_use]
    pub fn with_inspector(mut self, inspector: Box<dyn SchemaInspector>) -> Self {
        self.inspector = inspector;
        self
    }

    /// Replaces the renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Box<dyn SqlRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// The database handle.
    #[must_use]
    pub fn db(&self) -> &dyn Database {
        self.db.as_ref()
    }

    /// The logger.
    #[must_use]
    pub fn logger(&self) -> &dyn Logger {
        self.logger.as_ref()
    }

    /// The detected engine.
    #[must_use]
    pub const fn engine(&self) -> &EngineInfo {
        self.features.engine()
    }

    /// The feature gate.
    #[must_use]
    pub const fn features(&self) -> &FeatureGate {
        &self.features
    }

    /// The schema inspector.
    #[must_use]
    pub fn inspector(&self) -> &dyn SchemaInspector {
        self.inspector.as_ref()
    }

    /// The SQL renderer.
    #[must_use]
    pub fn renderer(&self) -> &dyn SqlRenderer {
        self.renderer.as_ref()
    }

    /// An operation whose `up` only logs `message` as a warning.
    pub fn skip(&self, message: impl Into<String>) -> Operation {
        Operation::skip(message)
    }

    /// `Skip UP <action> on <table>: unsupported features for <engine> (<features>).`
    #[must_use]
    pub fn unsupported_message(&self, action: &str, table: &str, features: &[Feature]) -> String {
        format!(
            "Skip UP {action} on {table}: unsupported features for {} ({}).",
            self.features.describe_engine(),
            join_features(features)
        )
    }

    /// Executes statements in order.
    pub async fn exec_sql(&self, statements: &[String]) -> Result<()> {
        for sql in statements {
            debug!(sql = %sql, "Executing SQL");
            self.db.exec(sql, &[]).await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for MigrationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationContext")
            .field("engine", self.engine())
            .field("renderer", &self.renderer.engine_name())
            .finish_non_exhaustive()
    }
}

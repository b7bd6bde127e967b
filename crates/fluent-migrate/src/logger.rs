//! Logger collaborator.
//!
//! Skip notices and progress messages go through a [`Logger`] so callers can
//! route them wherever they like. [`TracingLogger`] is the default and simply
//! forwards to `tracing`.

use tracing::{info, warn};

/// Receives the engine's user-facing messages.
pub trait Logger: Send + Sync {
    /// A recoverable condition, such as an operation skipped on this engine.
    fn warning(&self, message: &str);

    /// Progress information.
    fn info(&self, message: &str);
}

/// Forwards messages to `tracing` at WARN and INFO level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn warning(&self, message: &str) {
        warn!(target: "fluent_migrate", "{message}");
    }

    fn info(&self, message: &str) {
        info!(target: "fluent_migrate", "{message}");
    }
}

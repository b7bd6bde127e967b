//! Test doubles.
//!
//! Enabled for this crate's own tests and, through the `testing` feature,
//! for downstream crates.

use std::collections::BTreeSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::database::{Database, ExecResult, Param, QueryResult, Row};
use crate::error::{MigrateError, Result};
use crate::ledger::{shorten_entry, Ledger};
use crate::logger::Logger;

#[derive(Debug, Default)]
struct Recording {
    responses: Vec<(String, Vec<Row>)>,
    failures: Vec<String>,
    queries: Vec<String>,
    executed: Vec<String>,
}

/// A scripted [`Database`].
///
/// Queries return the rows registered for the first needle contained in the
/// SQL text (case-sensitive), or no rows. Statements and queries containing a
/// failure needle fail. Successful statements are recorded in order.
#[derive(Debug, Default)]
pub struct RecordingDatabase {
    inner: Mutex<Recording>,
}

impl RecordingDatabase {
    /// An empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers queries containing `needle` with `rows`, replacing any
    /// previous answer for the same needle.
    pub fn respond(&self, needle: &str, rows: Vec<Row>) {
        let mut inner = self.lock();
        match inner.responses.iter_mut().find(|(n, _)| n == needle) {
            Some((_, existing)) => *existing = rows,
            None => inner.responses.push((needle.to_string(), rows)),
        }
    }

    /// Makes every statement or query containing `needle` fail.
    pub fn fail_on(&self, needle: &str) {
        self.lock().failures.push(needle.to_string());
    }

    /// Queries run so far.
    #[must_use]
    pub fn queries(&self) -> Vec<String> {
        self.lock().queries.clone()
    }

    /// Statements executed successfully so far.
    #[must_use]
    pub fn executed(&self) -> Vec<String> {
        self.lock().executed.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recording> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn check(inner: &Recording, sql: &str) -> Result<()> {
        match inner.failures.iter().find(|needle| sql.contains(needle.as_str())) {
            Some(needle) => Err(MigrateError::database(std::io::Error::other(format!(
                "scripted failure on '{needle}'"
            )))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Database for RecordingDatabase {
    async fn exec(&self, sql: &str, _params: &[Param<'_>]) -> Result<ExecResult> {
        let mut inner = self.lock();
        Self::check(&inner, sql)?;
        inner.executed.push(sql.to_string());
        Ok(ExecResult::default())
    }

    async fn query(&self, sql: &str, _params: &[Param<'_>]) -> Result<QueryResult> {
        let mut inner = self.lock();
        inner.queries.push(sql.to_string());
        Self::check(&inner, sql)?;
        let rows = inner
            .responses
            .iter()
            .find(|(needle, _)| sql.contains(needle.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default();
        Ok(QueryResult::new(rows))
    }
}

/// A [`Logger`] that keeps every message.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    warnings: Mutex<Vec<String>>,
    infos: Mutex<Vec<String>>,
}

impl MemoryLogger {
    /// An empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Warnings logged so far.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        self.warnings
            .lock()
            .map(|w| w.clone())
            .unwrap_or_default()
    }

    /// Info messages logged so far.
    #[must_use]
    pub fn infos(&self) -> Vec<String> {
        self.infos.lock().map(|i| i.clone()).unwrap_or_default()
    }
}

impl Logger for MemoryLogger {
    fn warning(&self, message: &str) {
        if let Ok(mut warnings) = self.warnings.lock() {
            warnings.push(message.to_string());
        }
    }

    fn info(&self, message: &str) {
        if let Ok(mut infos) = self.infos.lock() {
            infos.push(message.to_string());
        }
    }
}

/// A [`Ledger`] kept in memory.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: Mutex<BTreeSet<String>>,
}

impl MemoryLedger {
    /// An empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger pre-filled with entries.
    pub fn with_entries<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = entries
            .into_iter()
            .map(|e| shorten_entry(e.as_ref()))
            .collect::<Result<BTreeSet<_>>>()?;
        Ok(Self {
            entries: Mutex::new(entries),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeSet<String>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn list_entries(&self) -> Result<Vec<String>> {
        Ok(self.lock().iter().cloned().collect())
    }

    async fn add_entry(&self, name: &str) -> Result<()> {
        let entry = shorten_entry(name)?;
        self.lock().insert(entry);
        Ok(())
    }

    async fn remove_entry(&self, name: &str) -> Result<()> {
        let entry = shorten_entry(name)?;
        self.lock().remove(&entry);
        Ok(())
    }
}

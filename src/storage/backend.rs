//! Durable state backend trait
//!
//! Three kinds of state are persisted: the metric-history cache, the
//! achievement ledger, and (optionally) an archive of composed reports.
//!
//! ## Reads vs writes
//!
//! Loads happen once at startup and block initialization, so they are plain
//! synchronous methods. Writes are issued from the persistence actor and are
//! `async`.
//!
//! ## Missing state
//!
//! `load_*` returns `Ok(None)` when nothing was ever written. Callers treat
//! `Err` the same way after logging it: a corrupt or partially written file
//! never blocks startup.

use async_trait::async_trait;

use super::error::StorageResult;
use crate::achievements::Achievement;
use crate::history::HistoryCache;
use crate::narrative::NarrativeReport;

#[async_trait]
pub trait StateBackend: Send + Sync {
    /// Load the metric-history cache written by an earlier process
    fn load_history(&self) -> StorageResult<Option<HistoryCache>>;

    /// Load the persisted achievement ledger
    fn load_ledger(&self) -> StorageResult<Option<Vec<Achievement>>>;

    /// Overwrite the metric-history cache
    async fn save_history(&self, cache: &HistoryCache) -> StorageResult<()>;

    /// Overwrite the full achievement ledger
    async fn save_ledger(&self, ledger: &[Achievement]) -> StorageResult<()>;

    /// Append one report to the archive
    async fn archive_report(&self, report: &NarrativeReport) -> StorageResult<()>;

    /// Human-readable description for logs (e.g. "files at ./state")
    fn describe(&self) -> String;
}

/// Backend that keeps nothing. Loads always come back empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBackend;

#[async_trait]
impl StateBackend for NullBackend {
    fn load_history(&self) -> StorageResult<Option<HistoryCache>> {
        Ok(None)
    }

    fn load_ledger(&self) -> StorageResult<Option<Vec<Achievement>>> {
        Ok(None)
    }

    async fn save_history(&self, _cache: &HistoryCache) -> StorageResult<()> {
        Ok(())
    }

    async fn save_ledger(&self, _ledger: &[Achievement]) -> StorageResult<()> {
        Ok(())
    }

    async fn archive_report(&self, _report: &NarrativeReport) -> StorageResult<()> {
        Ok(())
    }

    fn describe(&self) -> String {
        "none".to_string()
    }
}

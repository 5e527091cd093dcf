//! In-memory state backend (no persistence)
//!
//! Useful for:
//! - Tests that need to observe what was written
//! - Simulating write failures without touching the filesystem
//!
//! State is lost when the backend is dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use super::backend::StateBackend;
use super::error::{StorageError, StorageResult};
use crate::achievements::Achievement;
use crate::history::HistoryCache;
use crate::narrative::NarrativeReport;

#[derive(Debug, Default)]
struct Stored {
    history: Option<HistoryCache>,
    ledger: Option<Vec<Achievement>>,
    reports: Vec<NarrativeReport>,
    writes: u64,
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    stored: Mutex<Stored>,
    fail_writes: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the ledger, as if an earlier process had saved it
    pub fn with_ledger(self, ledger: Vec<Achievement>) -> Self {
        self.lock().ledger = Some(ledger);
        self
    }

    pub fn with_history(self, cache: HistoryCache) -> Self {
        self.lock().history = Some(cache);
        self
    }

    /// Make every subsequent write fail with [`StorageError::Unavailable`]
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn history(&self) -> Option<HistoryCache> {
        self.lock().history.clone()
    }

    pub fn ledger(&self) -> Option<Vec<Achievement>> {
        self.lock().ledger.clone()
    }

    pub fn reports(&self) -> Vec<NarrativeReport> {
        self.lock().reports.clone()
    }

    /// Number of successful writes of any kind
    pub fn writes(&self) -> u64 {
        self.lock().writes
    }

    fn lock(&self) -> MutexGuard<'_, Stored> {
        self.stored.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(
                "in-memory backend set to fail writes".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl StateBackend for MemoryBackend {
    fn load_history(&self) -> StorageResult<Option<HistoryCache>> {
        Ok(self.lock().history.clone())
    }

    fn load_ledger(&self) -> StorageResult<Option<Vec<Achievement>>> {
        Ok(self.lock().ledger.clone())
    }

    async fn save_history(&self, cache: &HistoryCache) -> StorageResult<()> {
        self.check_writable()?;
        let mut stored = self.lock();
        stored.history = Some(cache.clone());
        stored.writes += 1;
        debug!("in-memory backend: history saved");
        Ok(())
    }

    async fn save_ledger(&self, ledger: &[Achievement]) -> StorageResult<()> {
        self.check_writable()?;
        let mut stored = self.lock();
        stored.ledger = Some(ledger.to_vec());
        stored.writes += 1;
        debug!("in-memory backend: ledger saved ({} entries)", ledger.len());
        Ok(())
    }

    async fn archive_report(&self, report: &NarrativeReport) -> StorageResult<()> {
        self.check_writable()?;
        let mut stored = self.lock();
        stored.reports.push(report.clone());
        stored.writes += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

//! JSON files in a state directory
//!
//! Layout:
//!
//! ```text
//! <dir>/metrics-cache.json        history cache
//! <dir>/achievements.json         achievement ledger
//! <dir>/reports/report-<ms>-<seq>.json  report archive
//! ```
//!
//! `<seq>` counts archived reports per backend, so reports stamped in the
//! same millisecond get distinct files.
//!
//! Every write goes to a `.tmp` sibling first and is then renamed over the
//! target, so a crash mid-write leaves the previous file intact.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs;
use tracing::{debug, trace};

use super::backend::StateBackend;
use super::error::StorageResult;
use crate::achievements::Achievement;
use crate::history::HistoryCache;
use crate::narrative::NarrativeReport;

const HISTORY_FILE: &str = "metrics-cache.json";
const LEDGER_FILE: &str = "achievements.json";
const REPORTS_DIR: &str = "reports";

#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,

    /// Shared by clones of this backend
    report_seq: Arc<AtomicU64>,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            report_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn history_path(&self) -> PathBuf {
        self.dir.join(HISTORY_FILE)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.dir.join(LEDGER_FILE)
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.dir.join(REPORTS_DIR)
    }

    /// Archive file name for a report stamped at `millis` with sequence `seq`
    pub fn report_file_name(millis: i64, seq: u64) -> String {
        format!("report-{millis}-{seq}.json")
    }

    fn read_json<T: DeserializeOwned>(path: &Path) -> StorageResult<Option<T>> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                trace!("{} not found", path.display());
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        let value = serde_json::from_str(&text)?;
        debug!("loaded {}", path.display());
        Ok(Some(value))
    }

    async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec_pretty(value)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, path).await?;

        trace!("wrote {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl StateBackend for FileBackend {
    fn load_history(&self) -> StorageResult<Option<HistoryCache>> {
        Self::read_json(&self.history_path())
    }

    fn load_ledger(&self) -> StorageResult<Option<Vec<Achievement>>> {
        Self::read_json(&self.ledger_path())
    }

    async fn save_history(&self, cache: &HistoryCache) -> StorageResult<()> {
        Self::write_json(&self.history_path(), cache).await
    }

    async fn save_ledger(&self, ledger: &[Achievement]) -> StorageResult<()> {
        Self::write_json(&self.ledger_path(), ledger).await
    }

    async fn archive_report(&self, report: &NarrativeReport) -> StorageResult<()> {
        let seq = self.report_seq.fetch_add(1, Ordering::Relaxed);
        let name = Self::report_file_name(report.timestamp.timestamp_millis(), seq);
        Self::write_json(&self.reports_dir().join(name), report).await
    }

    fn describe(&self) -> String {
        format!("files at {}", self.dir.display())
    }
}

//! JSON persistence for run state: strategy history, the canonical record
//! store, and run summaries.
//!
//! Every write goes to a temporary file in the target directory, is flushed,
//! and is then renamed over the destination, so an interrupted run never
//! leaves a half-written file behind.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use premwatch_core::{CanonicalLicenceRecord, RunSummary, StrategyHistory};
use premwatch_normalize::CanonicalSet;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const HISTORY_FILE: &str = "strategy_history.json";
pub const CANONICAL_FILE: &str = "canonical_records.json";
pub const SUMMARIES_DIR: &str = "summaries";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// File-backed state rooted at one data directory.
#[derive(Debug, Clone)]
pub struct StateStore {
    data_dir: PathBuf,
}

impl StateStore {
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    #[must_use]
    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join(HISTORY_FILE)
    }

    #[must_use]
    pub fn canonical_path(&self) -> PathBuf {
        self.data_dir.join(CANONICAL_FILE)
    }

    /// Strategy history, or an empty history when none has been saved yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the file exists but cannot be read or parsed.
    pub fn load_history(&self) -> Result<StrategyHistory, StoreError> {
        Ok(read_json(&self.history_path())?.unwrap_or_default())
    }

    /// # Errors
    ///
    /// Returns [`StoreError`] when the file cannot be written.
    pub fn save_history(&self, history: &StrategyHistory) -> Result<(), StoreError> {
        write_json_atomic(&self.history_path(), history)
    }

    /// Canonical records, or an empty set when none have been saved yet.
    ///
    /// Records are re-keyed by their own identity key on load.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the file exists but cannot be read or parsed.
    pub fn load_canonical(&self) -> Result<CanonicalSet, StoreError> {
        let path = self.canonical_path();
        let Some(stored) = read_json::<BTreeMap<String, CanonicalLicenceRecord>>(&path)? else {
            return Ok(CanonicalSet::new());
        };
        for (key, record) in &stored {
            if *key != record.identity_key {
                tracing::warn!(stored_key = %key, identity_key = %record.identity_key, "canonical record stored under a foreign key");
            }
        }
        let set = CanonicalSet::from_records(stored.into_values());
        tracing::debug!(path = %path.display(), records = set.len(), "loaded canonical records");
        Ok(set)
    }

    /// # Errors
    ///
    /// Returns [`StoreError`] when the file cannot be written.
    pub fn save_canonical(&self, set: &CanonicalSet) -> Result<(), StoreError> {
        write_json_atomic(&self.canonical_path(), set)
    }

    /// Write a summary to `summaries/run_summary_<timestamp>.json` and return its path.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the file cannot be written.
    pub fn save_summary(&self, summary: &RunSummary) -> Result<PathBuf, StoreError> {
        let name = format!(
            "run_summary_{}.json",
            summary.started_at.format("%Y%m%dT%H%M%SZ")
        );
        let path = self.data_dir.join(SUMMARIES_DIR).join(name);
        write_json_atomic(&path, summary)?;
        Ok(path)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(io_error(path)(err)),
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| StoreError::Json {
            path: path.display().to_string(),
            source,
        })
}

fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(io_error(dir))?;

    let content = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
        path: path.display().to_string(),
        source,
    })?;

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);
    {
        let mut file = std::fs::File::create(&temp_path).map_err(io_error(&temp_path))?;
        file.write_all(&content).map_err(io_error(&temp_path))?;
        file.sync_all().map_err(io_error(&temp_path))?;
    }
    std::fs::rename(&temp_path, path).map_err(io_error(path))?;
    tracing::debug!(path = %path.display(), bytes = content.len(), "state written");
    Ok(())
}

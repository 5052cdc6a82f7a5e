//! JSON-file result sink.
//!
//! Keeps a single pretty-printed array of records on disk. Each persist
//! merges new records into whatever the file already holds, skipping any
//! business whose identity key is present.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use mapsweep_shared::{BusinessRecord, MapSweepError, PersistOutcome, Result, ResultSink};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Appends deduplicated records to a JSON array file.
pub struct JsonFileSink {
    path: PathBuf,
    // Serializes read-merge-write cycles from concurrent callers.
    write_lock: Mutex<()>,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records currently in the file. Missing or unreadable files count as empty.
    pub async fn load(&self) -> Vec<BusinessRecord> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "could not read results file; starting empty");
                return Vec::new();
            }
        };
        if raw.trim().is_empty() {
            return Vec::new();
        }
        match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "results file is not a record array; starting empty");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl ResultSink for JsonFileSink {
    async fn persist(&self, records: &[BusinessRecord]) -> Result<PersistOutcome> {
        let _guard = self.write_lock.lock().await;

        let mut stored = self.load().await;
        let mut known: HashSet<_> = stored
            .iter()
            .filter_map(|r| r.identity_key().ok())
            .collect();

        let mut outcome = PersistOutcome::default();
        for record in records {
            if known.insert(record.identity_key()?) {
                stored.push(record.clone());
                outcome.inserted += 1;
            } else {
                outcome.skipped += 1;
            }
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| MapSweepError::io(parent, e))?;
        }
        let body = serde_json::to_string_pretty(&stored)
            .map_err(|e| MapSweepError::Storage(e.to_string()))?;
        tokio::fs::write(&self.path, body)
            .await
            .map_err(|e| MapSweepError::io(&self.path, e))?;

        info!(
            path = %self.path.display(),
            inserted = outcome.inserted,
            skipped = outcome.skipped,
            total = stored.len(),
            "results file updated"
        );
        Ok(outcome)
    }

    fn name(&self) -> &str {
        "json"
    }
}

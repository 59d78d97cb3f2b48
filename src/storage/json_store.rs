//! JSON file storage implementation
//!
//! This module provides a directory-of-JSON-files implementation of the
//! Storage trait: `<output-dir>/<job_id>.json` per job plus one failure log.

use crate::state::{FailureRecord, JobRecord};
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::HarvestError;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory-backed JSON storage
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
    failure_log: String,
}

impl JsonStore {
    /// Opens a store rooted at `dir`, creating the directory if needed
    ///
    /// # Arguments
    ///
    /// * `dir` - The output directory
    /// * `failure_log` - File name of the failure log inside `dir`
    pub fn new(dir: &Path, failure_log: &str) -> Result<Self, HarvestError> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            failure_log: failure_log.to_string(),
        })
    }

    /// Directory holding the records
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record file for a job id
    pub fn job_path(&self, id: &str) -> StorageResult<PathBuf> {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(StorageError::InvalidId(id.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", id)))
    }

    /// Path of the failure log
    pub fn failure_log_path(&self) -> PathBuf {
        self.dir.join(&self.failure_log)
    }

    fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> StorageResult<T> {
        let content = fs::read_to_string(path).map_err(|source| StorageError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| StorageError::Serialization {
            path: path.display().to_string(),
            source,
        })
    }

    /// Writes to a sibling temp file and renames it into place, so a reader
    /// never sees a half-written record
    fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> StorageResult<()> {
        let content =
            serde_json::to_string_pretty(value).map_err(|source| StorageError::Serialization {
                path: path.display().to_string(),
                source,
            })?;

        let tmp_path = path.with_extension("json.tmp");
        let io_err = |source| StorageError::Io {
            path: path.display().to_string(),
            source,
        };
        fs::write(&tmp_path, content).map_err(io_err)?;
        fs::rename(&tmp_path, path).map_err(io_err)
    }
}

impl Storage for JsonStore {
    fn load_job(&self, id: &str) -> StorageResult<Option<JobRecord>> {
        let path = self.job_path(id)?;
        if !path.exists() {
            return Ok(None);
        }
        Self::read_json(&path).map(Some)
    }

    fn save_job(&self, record: &JobRecord) -> StorageResult<()> {
        let path = self.job_path(&record.id)?;
        Self::write_json(&path, record)
    }

    fn load_all_jobs(&self) -> StorageResult<Vec<JobRecord>> {
        let entries = fs::read_dir(&self.dir).map_err(|source| StorageError::Io {
            path: self.dir.display().to_string(),
            source,
        })?;

        let mut records = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let is_json = path.extension().is_some_and(|ext| ext == "json");
            let is_failure_log = path
                .file_name()
                .is_some_and(|name| name == self.failure_log.as_str());
            if !is_json || is_failure_log {
                continue;
            }

            match Self::read_json::<JobRecord>(&path) {
                Ok(record) if !record.id.is_empty() => records.push(record),
                Ok(_) => tracing::warn!("Skipping {}: record has no job id", path.display()),
                Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
            }
        }

        Ok(records)
    }

    fn write_failure_log(&self, failures: &[FailureRecord]) -> StorageResult<()> {
        Self::write_json(&self.failure_log_path(), failures)
    }

    fn load_failure_log(&self) -> StorageResult<Vec<FailureRecord>> {
        let path = self.failure_log_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        Self::read_json(&path)
    }
}

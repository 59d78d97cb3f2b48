//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::state::{reconcile, FailureRecord, JobRecord, Transition};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid record id: {0:?}")]
    InvalidId(String),

    #[error("Serialization error for {path}: {source}")]
    Serialization {
        path: String,
        source: serde_json::Error,
    },

    #[error("IO error for {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// One record is stored per job id and every save replaces the whole record.
/// Workers call into the same backend concurrently, but never for the same
/// id, so implementations need no per-record locking.
pub trait Storage: Send + Sync {
    // ===== Job Records =====

    /// Reads the stored record for a job id
    ///
    /// # Returns
    ///
    /// * `Ok(Some(JobRecord))` - A record exists and parsed cleanly
    /// * `Ok(None)` - Nothing stored for this id
    /// * `Err(StorageError)` - The record exists but could not be read
    fn load_job(&self, id: &str) -> StorageResult<Option<JobRecord>>;

    /// Stores a record, replacing any previous version
    fn save_job(&self, record: &JobRecord) -> StorageResult<()>;

    /// Loads every stored record, skipping ones that cannot be parsed
    fn load_all_jobs(&self) -> StorageResult<Vec<JobRecord>>;

    // ===== Failure Log =====

    /// Replaces the failure log with this run's failures
    fn write_failure_log(&self, failures: &[FailureRecord]) -> StorageResult<()>;

    /// Reads the failure log written by the last run
    fn load_failure_log(&self) -> StorageResult<Vec<FailureRecord>>;

    // ===== Reconciliation =====

    /// Reconciles a fresh record against stored state and persists it
    ///
    /// A stored record that cannot be read is treated as absent, so a
    /// corrupt file degrades to a first discovery instead of a failure.
    fn commit(&self, fresh: JobRecord) -> StorageResult<(JobRecord, Transition)> {
        let prior = match self.load_job(&fresh.id) {
            Ok(prior) => prior,
            Err(e) => {
                tracing::warn!(
                    "Could not read stored record for job {}, treating as new: {}",
                    fresh.id,
                    e
                );
                None
            }
        };

        let (merged, transition) = reconcile(fresh, prior.as_ref());
        self.save_job(&merged)?;
        Ok((merged, transition))
    }
}

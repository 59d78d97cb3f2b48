//! State module for job records and their status over time
//!
//! # Components
//!
//! - `JobRecord`: one scraped posting, in its on-disk shape
//! - `StatusEntry` / `JobStatus`: the append-only status history
//! - `FailureRecord`: a URL that failed during the current run
//! - `reconcile`: merges a fresh record with the one persisted earlier

mod job_record;
mod reconcile;

// Re-export main types
pub use job_record::{parse_timestamp, FailureRecord, JobRecord, JobStatus, StatusEntry};
pub use reconcile::{
    reconcile, Transition, REASON_AVAILABLE_AGAIN, REASON_BECAME_UNAVAILABLE,
    REASON_FIRST_DISCOVERED, REASON_FIRST_DISCOVERED_INACTIVE,
};

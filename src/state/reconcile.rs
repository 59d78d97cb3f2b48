//! Status reconciliation between scrape runs
//!
//! A freshly extracted record knows nothing about earlier runs. Before it is
//! persisted it is merged with the record already on disk for the same job
//! id: the stored history is carried over and a new entry is appended only
//! when the job flipped between active and inactive.

use crate::state::{JobRecord, JobStatus, StatusEntry};

pub const REASON_FIRST_DISCOVERED: &str = "first discovered";
pub const REASON_FIRST_DISCOVERED_INACTIVE: &str = "first discovered as unavailable";
pub const REASON_BECAME_UNAVAILABLE: &str = "became unavailable during re-scrape";
pub const REASON_AVAILABLE_AGAIN: &str = "became available again during re-scrape";

/// What reconciliation did to a record's history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// No prior record existed
    Discovered,
    /// Prior record existed and the status did not change
    Unchanged,
    Deactivated,
    Reactivated,
}

impl Transition {
    /// Returns true when the job changed status since the previous run
    pub fn is_status_change(&self) -> bool {
        matches!(self, Self::Deactivated | Self::Reactivated)
    }
}

/// Merges a fresh record with its previously persisted version
///
/// # Arguments
///
/// * `fresh` - The record produced by the extractor in this run
/// * `prior` - The stored record for the same id, if one could be read
///
/// # Returns
///
/// The record to persist and the transition that was detected
pub fn reconcile(mut fresh: JobRecord, prior: Option<&JobRecord>) -> (JobRecord, Transition) {
    let Some(prior) = prior else {
        if fresh.is_active {
            fresh
                .status_history
                .push(StatusEntry::now(JobStatus::Active, REASON_FIRST_DISCOVERED));
        } else if fresh.status_history.is_empty() {
            // The extractor's short-circuit path already records an entry;
            // only synthesize one when nothing describes the first sighting.
            fresh.status_history.push(StatusEntry::now(
                JobStatus::Inactive,
                REASON_FIRST_DISCOVERED_INACTIVE,
            ));
        }
        return (fresh, Transition::Discovered);
    };

    fresh.status_history = prior.status_history.clone();

    let transition = match (prior.is_active, fresh.is_active) {
        (true, false) => {
            fresh.status_history.push(StatusEntry::now(
                JobStatus::Inactive,
                REASON_BECAME_UNAVAILABLE,
            ));
            tracing::info!("Job {} changed status: ACTIVE -> INACTIVE", fresh.id);
            Transition::Deactivated
        }
        (false, true) => {
            fresh
                .status_history
                .push(StatusEntry::now(JobStatus::Active, REASON_AVAILABLE_AGAIN));
            tracing::info!("Job {} changed status: INACTIVE -> ACTIVE", fresh.id);
            Transition::Reactivated
        }
        _ => Transition::Unchanged,
    };

    (fresh, transition)
}

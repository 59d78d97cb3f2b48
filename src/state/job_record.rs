//! Job record definitions shared by the extractor, reconciler, and storage
//!
//! The serialized field names are the on-disk format read by downstream
//! analysis, so they are fixed with `serde(rename)` rather than following the
//! Rust field names.
use crate::HarvestError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a job posting is currently live on the site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Active,
    Inactive,
}

impl JobStatus {
    /// Maps the boolean `is_active` flag to a status
    pub fn from_active(is_active: bool) -> Self {
        if is_active {
            Self::Active
        } else {
            Self::Inactive
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
        }
    }
}

/// One entry in a job's status history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub status: JobStatus,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

impl StatusEntry {
    /// Creates an entry stamped with the current time
    pub fn now(status: JobStatus, reason: impl Into<String>) -> Self {
        Self {
            status,
            timestamp: Utc::now(),
            reason: reason.into(),
        }
    }
}

/// A single scraped job posting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Numeric identifier taken from the detail URL
    #[serde(rename = "job_id")]
    pub id: String,

    /// Canonical detail-page URL
    #[serde(rename = "url")]
    pub source_url: String,

    /// Time of the most recent successful fetch
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub scraped_at: DateTime<Utc>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(rename = "type_of_work", default)]
    pub work_type: Option<String>,

    #[serde(rename = "salary", default)]
    pub salary_text: Option<String>,

    #[serde(default)]
    pub hours_per_week: Option<String>,

    #[serde(rename = "date_updated", default)]
    pub posted_date_updated: Option<String>,

    #[serde(rename = "job_overview", default)]
    pub overview_text: Option<String>,

    /// Skills in page order; duplicates are kept
    #[serde(rename = "skill_requirements", default)]
    pub skills: Vec<String>,

    #[serde(default = "default_active")]
    pub is_active: bool,

    /// Append-only, chronologically non-decreasing
    #[serde(default)]
    pub status_history: Vec<StatusEntry>,
}

fn default_active() -> bool {
    true
}

impl JobRecord {
    /// Creates an active record with no extracted fields
    pub fn new(id: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source_url: source_url.into(),
            scraped_at: Utc::now(),
            title: None,
            work_type: None,
            salary_text: None,
            hours_per_week: None,
            posted_date_updated: None,
            overview_text: None,
            skills: Vec::new(),
            is_active: true,
            status_history: Vec::new(),
        }
    }

    /// Current status derived from `is_active`
    pub fn status(&self) -> JobStatus {
        JobStatus::from_active(self.is_active)
    }

    /// Status recorded by the most recent history entry, if any
    pub fn last_recorded_status(&self) -> Option<JobStatus> {
        self.status_history.last().map(|entry| entry.status)
    }
}

/// A URL that could not be scraped or persisted during this run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub url: String,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl FailureRecord {
    pub fn new(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            error: error.into(),
            timestamp: Utc::now(),
        }
    }

    /// Captures an error at a task boundary
    pub fn from_error(url: &str, error: &HarvestError) -> Self {
        Self::new(url, error.to_string())
    }
}

/// Accepts RFC 3339 timestamps as well as offset-less ISO-8601 ones, which
/// are read as UTC
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw)))
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

pub use timestamp::parse as parse_timestamp;

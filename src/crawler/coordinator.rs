//! Scrape coordinator - main run orchestration logic
//!
//! This module ties the two phases of a run together:
//! - Discovery of job URLs over the search listing
//! - Detail scraping of every discovered job through the worker pool
//! - Reconciliation and persistence of each record as it completes
//! - Writing the failure log and summarizing the run

use crate::config::{validate, Config};
use crate::crawler::discovery::{discover_job_urls, extract_job_id};
use crate::crawler::extractor::scrape_job;
use crate::crawler::pool::{TaskReport, WorkerPool};
use crate::state::{FailureRecord, Transition};
use crate::storage::{open_storage, Storage};
use crate::HarvestError;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Result of scraping and persisting one job
#[derive(Debug)]
pub enum JobOutcome {
    Saved {
        id: String,
        title: Option<String>,
        is_active: bool,
        transition: Transition,
    },
    Failed {
        id: Option<String>,
        failure: FailureRecord,
    },
}

impl TaskReport for JobOutcome {
    type Input = String;

    fn from_panic(url: String, message: String) -> Self {
        let error = HarvestError::TaskPanicked {
            url: url.clone(),
            message,
        };
        JobOutcome::Failed {
            id: extract_job_id(&url),
            failure: FailureRecord::from_error(&url, &error),
        }
    }

    fn report(&self) -> String {
        match self {
            JobOutcome::Saved {
                id,
                title,
                is_active: true,
                transition,
            } => {
                let mut line = format!(
                    "Job {}: SUCCESS - {}",
                    id,
                    title.as_deref().unwrap_or("untitled")
                );
                if *transition == Transition::Reactivated {
                    line.push_str(" (available again)");
                }
                line
            }
            JobOutcome::Saved {
                id,
                is_active: false,
                transition,
                ..
            } => {
                let mut line = format!("Job {}: UNAVAILABLE - job no longer available", id);
                if *transition == Transition::Deactivated {
                    line.push_str(" (status changed)");
                }
                line
            }
            JobOutcome::Failed { id, failure } => format!(
                "Job {}: ERROR - {}",
                id.as_deref().unwrap_or(&failure.url),
                failure.error
            ),
        }
    }

    fn is_failure(&self) -> bool {
        matches!(self, JobOutcome::Failed { .. })
    }
}

/// Counts for one completed run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Job URLs found during discovery, before any limit
    pub discovered: usize,
    /// Detail pages attempted
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub failed: usize,
    /// Jobs whose status flipped since the previous run
    pub status_changes: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    /// Jobs scraped and persisted, active or not
    pub fn successful(&self) -> usize {
        self.active + self.inactive
    }

    /// Percentage of attempted jobs that were persisted
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.successful() as f64 / self.total as f64 * 100.0
        }
    }

    fn record(&mut self, outcome: &JobOutcome) {
        match outcome {
            JobOutcome::Saved {
                is_active,
                transition,
                ..
            } => {
                if *is_active {
                    self.active += 1;
                } else {
                    self.inactive += 1;
                }
                if transition.is_status_change() {
                    self.status_changes += 1;
                }
            }
            JobOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

/// Main scrape coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    storage: Arc<dyn Storage>,
    pool: WorkerPool,
}

impl Coordinator {
    /// Creates a coordinator backed by the configured output directory
    ///
    /// # Arguments
    ///
    /// * `config` - The scraper configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(HarvestError)` - Invalid configuration or unusable output directory
    pub fn new(config: Config) -> Result<Self, HarvestError> {
        validate(&config)?;
        let storage = open_storage(&config.output)?;
        Ok(Self::with_storage(config, Arc::new(storage)))
    }

    /// Creates a coordinator over an existing storage backend
    pub fn with_storage(config: Config, storage: Arc<dyn Storage>) -> Self {
        let seed = config
            .scraper
            .jitter_seed
            .unwrap_or_else(|| fastrand::u64(..));
        let delay = Duration::try_from_secs_f64(config.scraper.delay_secs).unwrap_or_else(|e| {
            tracing::warn!(
                "Unusable delay {}s ({}), requests will not be paced",
                config.scraper.delay_secs,
                e
            );
            Duration::ZERO
        });
        let pool = WorkerPool::new(
            config.scraper.max_workers,
            delay,
            seed,
            config.http.clone(),
        );

        tracing::debug!("Pacing jitter seed: {}", seed);

        Self {
            config: Arc::new(config),
            storage,
            pool,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Discovers job URLs and applies the job limit
    ///
    /// # Returns
    ///
    /// * `Ok((urls, discovered))` - URLs to scrape in job-id order, and the
    ///   number discovered before the limit
    /// * `Err(HarvestError)` - The worker pool could not start
    pub async fn discover(&self) -> Result<(Vec<String>, usize), HarvestError> {
        let urls = discover_job_urls(
            &self.config.site,
            &self.pool,
            self.config.scraper.max_pages,
        )
        .await?;

        let discovered = urls.len();
        tracing::info!("Found {} unique job URLs", discovered);

        let mut urls = urls.into_urls();
        if let Some(limit) = self.config.scraper.limit_jobs {
            if limit < urls.len() {
                tracing::info!("Limiting to first {} jobs", limit);
                urls.truncate(limit);
            }
        }

        Ok((urls, discovered))
    }

    /// Scrapes, reconciles, and persists every given job URL
    ///
    /// Individual failures are recorded and never abort the run. The failure
    /// log is rewritten at the end with exactly this run's failures.
    pub async fn scrape_jobs(&self, urls: Vec<String>) -> Result<RunSummary, HarvestError> {
        let start = Instant::now();
        let mut summary = RunSummary {
            discovered: urls.len(),
            total: urls.len(),
            ..RunSummary::default()
        };

        tracing::info!(
            "Starting detail scraping of {} jobs with {} workers",
            urls.len(),
            self.pool.worker_count(urls.len())
        );

        let storage = Arc::clone(&self.storage);
        let outcomes = self
            .pool
            .run(urls, move |session, url| {
                let storage = Arc::clone(&storage);
                async move { process_job(&session, storage, url).await }
            })
            .await?;

        let mut failures = Vec::new();
        for outcome in outcomes {
            summary.record(&outcome);
            if let JobOutcome::Failed { failure, .. } = outcome {
                failures.push(failure);
            }
        }

        if let Err(e) = self.storage.write_failure_log(&failures) {
            tracing::error!("Failed to write failure log: {}", e);
        } else if !failures.is_empty() {
            tracing::info!("Recorded {} failed URLs", failures.len());
        }

        summary.elapsed = start.elapsed();
        Ok(summary)
    }

    /// Runs discovery followed by detail scraping
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` - Counts for the completed run
    /// * `Err(HarvestError)` - Nothing was discovered, or the pool could not start
    pub async fn run(&self) -> Result<RunSummary, HarvestError> {
        let start = Instant::now();
        tracing::info!("Starting scrape of {}", self.config.site.search_url);

        let (urls, discovered) = self.discover().await?;
        if urls.is_empty() {
            return Err(HarvestError::NothingDiscovered {
                search_url: self.config.site.search_url.clone(),
            });
        }

        let mut summary = self.scrape_jobs(urls).await?;
        summary.discovered = discovered;
        summary.elapsed = start.elapsed();

        tracing::info!(
            "Scrape completed: {} jobs processed in {:.1}s",
            summary.total,
            summary.elapsed.as_secs_f64()
        );

        Ok(summary)
    }
}

/// Task body for one detail page
///
/// The commit reads and writes record files, so it runs on the blocking pool
/// rather than on the worker's async thread.
async fn process_job(session: &Client, storage: Arc<dyn Storage>, url: String) -> JobOutcome {
    let id = extract_job_id(&url);

    let result = match scrape_job(session, &url).await {
        Ok(record) => match tokio::task::spawn_blocking(move || storage.commit(record)).await {
            Ok(committed) => committed.map_err(HarvestError::from),
            Err(e) => Err(HarvestError::TaskPanicked {
                url: url.clone(),
                message: e.to_string(),
            }),
        },
        Err(e) => Err(e),
    };

    match result {
        Ok((record, transition)) => JobOutcome::Saved {
            id: record.id,
            title: record.title,
            is_active: record.is_active,
            transition,
        },
        Err(e) => JobOutcome::Failed {
            id,
            failure: FailureRecord::from_error(&url, &e),
        },
    }
}

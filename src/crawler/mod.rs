//! Crawler module for job discovery and detail scraping
//!
//! This module contains the core scraping logic, including:
//! - Per-worker HTTP sessions and page fetching
//! - Listing pagination and job URL discovery
//! - Detail page extraction with fallback chains
//! - The bounded worker pool shared by both phases
//! - Overall run coordination

mod coordinator;
mod discovery;
mod extractor;
mod fallback;
mod pool;
mod session;

pub use coordinator::{Coordinator, JobOutcome, RunSummary};
pub use discovery::{
    discover_job_urls, extract_job_id, extract_job_urls, extract_total_jobs, listing_page_url,
    page_count, plan_listing_pages, resolve_page_count, JobUrlSet, PageOutcome,
};
pub use extractor::{extract_job, scrape_job, REASON_MARKED_UNAVAILABLE, UNAVAILABLE_TITLE};
pub use fallback::{non_empty, FallbackChain};
pub use pool::{jitter_factor, Progress, RunAggregator, TaskReport, WorkerPool};
pub use session::{build_session, fetch_html};

use crate::config::Config;
use crate::HarvestError;

/// Runs a complete scrape
///
/// This is the main entry point for a run. It will:
/// 1. Open the output directory
/// 2. Discover job URLs across the search listing
/// 3. Scrape every job detail page with the worker pool
/// 4. Reconcile and persist each record
/// 5. Write the failure log
///
/// # Arguments
///
/// * `config` - The scraper configuration
///
/// # Returns
///
/// * `Ok(RunSummary)` - Counts for the completed run
/// * `Err(HarvestError)` - The run could not start or discovered nothing
///
/// # Example
///
/// ```no_run
/// use job_harvest::config::Config;
/// use job_harvest::crawler::run_scrape;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let summary = run_scrape(Config::default()).await?;
/// println!("Success rate: {:.1}%", summary.success_rate());
/// # Ok(())
/// # }
/// ```
pub async fn run_scrape(config: Config) -> Result<RunSummary, HarvestError> {
    Coordinator::new(config)?.run().await
}

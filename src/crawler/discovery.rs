//! Page discovery over the paginated search listing
//!
//! This module handles:
//! - Reading the total result count from the first listing page
//! - Planning the offset URLs of the remaining pages
//! - Extracting job detail links and their numeric ids
//! - Deduplicating links by job id, preferring the descriptive URL

use crate::config::SiteConfig;
use crate::crawler::pool::{TaskReport, WorkerPool};
use crate::crawler::session::{build_session, fetch_html};
use crate::HarvestError;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::LazyLock;
use url::Url;

static SLUG_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/job/.*?-(\d+)/?$").expect("valid slug id pattern"));
static BARE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/job/(\d+)/?$").expect("valid bare id pattern"));
static DISPLAY_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Displaying\s*\d+\s*out\s*of\s*([\d,]+)\+?\s*jobs")
        .expect("valid display count pattern")
});
static DATALAYER_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""search_result_count"\s*:\s*(\d+)"#).expect("valid datalayer pattern")
});

/// Extracts the numeric job id from a detail URL
///
/// The descriptive form (`/job/Senior-Writer-123`) is tried before the bare
/// form (`/job/123`). Query strings and fragments are ignored.
///
/// # Examples
///
/// ```
/// use job_harvest::crawler::extract_job_id;
///
/// assert_eq!(
///     extract_job_id("https://example.com/jobseekers/job/Senior-Writer-123"),
///     Some("123".to_string())
/// );
/// assert_eq!(extract_job_id("https://example.com/jobseekers/job/123/"), Some("123".to_string()));
/// assert_eq!(extract_job_id("https://example.com/jobseekers/jobsearch"), None);
/// ```
pub fn extract_job_id(url: &str) -> Option<String> {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
    };

    [&*SLUG_ID, &*BARE_ID]
        .iter()
        .find_map(|pattern| pattern.captures(&path))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Job detail URLs keyed by job id
///
/// When two URLs map to the same id the longer one is kept, which favors the
/// descriptive slug over the bare id link.
#[derive(Debug, Clone, Default)]
pub struct JobUrlSet {
    by_id: HashMap<String, String>,
}

impl JobUrlSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a URL, returning true if it introduced a new job id
    ///
    /// URLs without a recognizable id are ignored.
    pub fn insert(&mut self, url: &str) -> bool {
        let Some(id) = extract_job_id(url) else {
            return false;
        };

        match self.by_id.get_mut(&id) {
            Some(existing) => {
                if url.len() > existing.len() {
                    *existing = url.to_string();
                }
                false
            }
            None => {
                self.by_id.insert(id, url.to_string());
                true
            }
        }
    }

    /// Merges another set into this one, returning the number of new ids
    pub fn merge(&mut self, other: JobUrlSet) -> usize {
        other
            .by_id
            .into_values()
            .filter(|url| self.insert(url))
            .count()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.by_id.get(id).map(String::as_str)
    }

    /// Consumes the set, returning URLs ordered by job id
    pub fn into_urls(self) -> Vec<String> {
        let mut entries: Vec<(String, String)> = self.by_id.into_iter().collect();
        entries.sort_by(|a, b| {
            a.0.len()
                .cmp(&b.0.len())
                .then_with(|| a.0.cmp(&b.0))
        });
        entries.into_iter().map(|(_, url)| url).collect()
    }
}

/// Extracts job detail links from one listing page
///
/// Links are resolved against `base_url`, stripped of query string and
/// fragment, and deduplicated by job id.
///
/// # Arguments
///
/// * `html` - The listing page HTML
/// * `base_url` - The URL the page was fetched from
/// * `job_path` - Path fragment identifying detail links (matched case-insensitively)
pub fn extract_job_urls(html: &str, base_url: &Url, job_path: &str) -> JobUrlSet {
    let document = Html::parse_document(html);
    let mut urls = JobUrlSet::new();

    let Ok(selector) = Selector::parse("a[href]") else {
        return urls;
    };
    let job_path = job_path.to_ascii_lowercase();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if !href.to_ascii_lowercase().contains(&job_path) {
            continue;
        }

        match base_url.join(href.trim()) {
            Ok(mut absolute) => {
                absolute.set_query(None);
                absolute.set_fragment(None);
                urls.insert(absolute.as_str());
            }
            Err(e) => tracing::debug!("Skipping unresolvable link {}: {}", href, e),
        }
    }

    urls
}

/// Reads the total number of results advertised by a listing page
///
/// Looks for the "Displaying N out of M jobs" banner first, then for the
/// analytics data layer count.
pub fn extract_total_jobs(html: &str) -> Option<u64> {
    if let Some(caps) = DISPLAY_COUNT.captures(html) {
        let digits: String = caps[1].chars().filter(char::is_ascii_digit).collect();
        if let Ok(total) = digits.parse() {
            return Some(total);
        }
    }

    DATALAYER_COUNT
        .captures(html)
        .and_then(|caps| caps[1].parse().ok())
}

/// Number of listing pages needed for `total` results
pub fn page_count(total: u64, page_size: u32) -> u32 {
    let page_size = u64::from(page_size.max(1));
    u32::try_from(total.div_ceil(page_size)).unwrap_or(u32::MAX)
}

/// Decides how many listing pages to walk
///
/// # Arguments
///
/// * `total_jobs` - Result count read from the first page, if any
/// * `site` - Site configuration (page size and fallback page count)
/// * `max_pages` - Optional user cap
pub fn resolve_page_count(total_jobs: Option<u64>, site: &SiteConfig, max_pages: Option<u32>) -> u32 {
    let pages = match total_jobs {
        Some(total) if total > 0 => page_count(total, site.page_size),
        _ => site.fallback_page_count,
    };

    match max_pages {
        Some(cap) if cap < pages => cap,
        _ => pages,
    }
}

/// URL of a listing page, addressed by result offset
///
/// Page 1 is the search URL itself; page `n` is `<search-url>/<(n-1)*page_size>`.
pub fn listing_page_url(search_url: &str, page: u32, page_size: u32) -> String {
    let offset = u64::from(page.saturating_sub(1)) * u64::from(page_size);
    if offset == 0 {
        search_url.to_string()
    } else {
        format!("{}/{}", search_url.trim_end_matches('/'), offset)
    }
}

/// Listing pages 2..=`total_pages` as `(page number, url)` pairs
pub fn plan_listing_pages(search_url: &str, total_pages: u32, page_size: u32) -> Vec<(u32, String)> {
    (2..=total_pages)
        .map(|page| (page, listing_page_url(search_url, page, page_size)))
        .collect()
}

/// Result of fetching one listing page
#[derive(Debug)]
pub struct PageOutcome {
    pub page: u32,
    pub result: Result<JobUrlSet, HarvestError>,
}

impl TaskReport for PageOutcome {
    type Input = (u32, String);

    fn from_panic((page, url): (u32, String), message: String) -> Self {
        PageOutcome {
            page,
            result: Err(HarvestError::TaskPanicked { url, message }),
        }
    }

    fn report(&self) -> String {
        match &self.result {
            Ok(urls) => format!("Page {}: found {} job URLs", self.page, urls.len()),
            Err(e) => format!("Page {}: ERROR - {}", self.page, e),
        }
    }

    fn is_failure(&self) -> bool {
        self.result.is_err()
    }
}

/// Collects the deduplicated job URLs across all listing pages
///
/// The first page is fetched on its own to learn the result count; the
/// remaining pages go through the worker pool. A failure on the first page
/// yields an empty set, failures on later pages only lose that page.
pub async fn discover_job_urls(
    site: &SiteConfig,
    pool: &WorkerPool,
    max_pages: Option<u32>,
) -> Result<JobUrlSet, HarvestError> {
    let base_url = Url::parse(&site.search_url)?;
    let session = build_session(pool.http_config())?;

    tracing::info!("Fetching first listing page to determine total jobs...");
    let first_page = match fetch_html(&session, &site.search_url).await {
        Ok(html) => html,
        Err(e) => {
            tracing::error!("Error fetching first listing page: {}", e);
            return Ok(JobUrlSet::new());
        }
    };

    let total_jobs = extract_total_jobs(&first_page);
    match total_jobs {
        Some(total) => tracing::info!(
            "Found {} total jobs, {} pages",
            total,
            page_count(total, site.page_size)
        ),
        None => tracing::warn!(
            "Could not determine total jobs, falling back to {} pages",
            site.fallback_page_count
        ),
    }
    let total_pages = resolve_page_count(total_jobs, site, max_pages);

    let mut all_urls = extract_job_urls(&first_page, &base_url, &site.job_path);
    tracing::info!("Page 1: found {} job URLs", all_urls.len());

    let pages = plan_listing_pages(&site.search_url, total_pages, site.page_size);
    if pages.is_empty() {
        return Ok(all_urls);
    }

    tracing::info!("Fetching remaining {} listing pages in parallel...", pages.len());
    let start = std::time::Instant::now();
    let job_path = site.job_path.clone();

    let outcomes = pool
        .run(pages, move |session, (page, url)| {
            let base_url = base_url.clone();
            let job_path = job_path.clone();
            async move {
                let result = fetch_html(&session, &url)
                    .await
                    .map(|html| extract_job_urls(&html, &base_url, &job_path));
                PageOutcome { page, result }
            }
        })
        .await?;

    for outcome in outcomes {
        if let Ok(urls) = outcome.result {
            all_urls.merge(urls);
        }
    }

    tracing::info!(
        "Listing pages fetched in {:.1}s, collected {} unique job URLs",
        start.elapsed().as_secs_f64(),
        all_urls.len()
    );

    Ok(all_urls)
}

use serde::Deserialize;

/// Upper bound on concurrent workers
pub const MAX_WORKERS: usize = 256;

/// Upper bound on the base delay between requests, in seconds
pub const MAX_DELAY_SECS: f64 = 3600.0;

/// Main configuration structure for Job-Harvest
///
/// Every section is optional in the TOML file; missing keys fall back to the
/// defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub scraper: ScraperConfig,
    pub http: HttpConfig,
    pub output: OutputConfig,
}

/// Where to find the listings and how they are paginated
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Base URL of the paginated search listing
    #[serde(rename = "search-url")]
    pub search_url: String,

    /// Path fragment identifying job detail links
    #[serde(rename = "job-path")]
    pub job_path: String,

    /// Number of results per listing page
    #[serde(rename = "page-size")]
    pub page_size: u32,

    /// Pages to walk when the listing does not report a result count
    #[serde(rename = "fallback-page-count")]
    pub fallback_page_count: u32,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            search_url: "https://www.onlinejobs.ph/jobseekers/jobsearch".to_string(),
            job_path: "/jobseekers/job/".to_string(),
            page_size: 30,
            fallback_page_count: 100,
        }
    }
}

/// Worker pool and pacing configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Maximum number of concurrent workers (defaults to the CPU count)
    #[serde(rename = "max-workers")]
    pub max_workers: usize,

    /// Base delay before each request, in seconds
    #[serde(rename = "delay-secs")]
    pub delay_secs: f64,

    /// Upper bound on the number of search pages to walk
    #[serde(rename = "max-pages")]
    pub max_pages: Option<u32>,

    /// Upper bound on the number of job detail pages to fetch
    #[serde(rename = "limit-jobs")]
    pub limit_jobs: Option<usize>,

    /// Seed for the pacing jitter; unset means seeded from the clock
    #[serde(rename = "jitter-seed")]
    pub jitter_seed: Option<u64>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            max_workers: default_worker_count(),
            delay_secs: 1.5,
            max_pages: None,
            limit_jobs: None,
            jitter_seed: None,
        }
    }
}

/// HTTP session configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
                .to_string(),
            timeout_secs: 15,
            connect_timeout_secs: 10,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory holding one JSON file per job
    #[serde(rename = "output-dir")]
    pub output_dir: String,

    /// File name of the failure log inside the output directory
    #[serde(rename = "failure-log")]
    pub failure_log: String,

    /// Path of the corpus statistics report
    #[serde(rename = "stats-path")]
    pub stats_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: "jobs".to_string(),
            failure_log: "failed_jobs.json".to_string(),
            stats_path: "stats.json".to_string(),
        }
    }
}

/// Host CPU count, or 4 when it cannot be determined, capped at [`MAX_WORKERS`]
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .clamp(1, MAX_WORKERS)
}

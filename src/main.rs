//! Job-Harvest main entry point
//!
//! This is the command-line interface for the Job-Harvest scraper.

use anyhow::Context;
use clap::Parser;
use job_harvest::config::{load_config_with_hash, validate, Config};
use job_harvest::crawler::run_scrape;
use job_harvest::output::{
    compute_statistics, load_corpus, print_run_summary, print_statistics, write_statistics,
};
use job_harvest::storage::open_storage;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Job-Harvest: a polite job-board scraper
///
/// Job-Harvest walks a paginated job search listing, scrapes every job
/// detail page with a bounded pool of workers, and keeps one JSON record per
/// job whose status history tracks when postings disappear or come back.
#[derive(Parser, Debug)]
#[command(name = "job-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A polite job-board scraper", long_about = None)]
struct Cli {
    /// Path to an optional TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum number of concurrent workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Base delay between requests in seconds
    #[arg(short, long, value_name = "SECONDS")]
    delay: Option<f64>,

    /// Maximum number of search pages to walk
    #[arg(long)]
    max_pages: Option<u32>,

    /// Maximum number of jobs to scrape
    #[arg(long)]
    limit_jobs: Option<usize>,

    /// Directory for job records and the failure log
    #[arg(short, long)]
    output_dir: Option<String>,

    /// Small test run: one search page, at most 10 jobs
    #[arg(long)]
    test: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate the configuration and show what would be scraped without scraping
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Compute statistics over the stored job records and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = resolve_config(&cli)?;

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_scrape(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("job_harvest=info,warn"),
            1 => EnvFilter::new("job_harvest=debug,info"),
            2 => EnvFilter::new("job_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file if one was given, then layers the flags on top
fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    if let Some(workers) = cli.workers {
        config.scraper.max_workers = workers;
    }
    if let Some(delay) = cli.delay {
        config.scraper.delay_secs = delay;
    }
    if let Some(max_pages) = cli.max_pages {
        config.scraper.max_pages = Some(max_pages);
    }
    if let Some(limit) = cli.limit_jobs {
        config.scraper.limit_jobs = Some(limit);
    }
    if let Some(dir) = &cli.output_dir {
        config.output.output_dir = dir.clone();
    }
    if cli.test {
        tracing::info!("Test mode: scraping 1 search page and at most 10 jobs");
        config.scraper.max_pages = Some(1);
        config.scraper.limit_jobs = Some(10);
    }

    validate(&config).context("Invalid settings")?;
    Ok(config)
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Job-Harvest Dry Run ===\n");

    println!("Site:");
    println!("  Search URL: {}", config.site.search_url);
    println!("  Job path: {}", config.site.job_path);
    println!("  Page size: {}", config.site.page_size);
    println!("  Fallback page count: {}", config.site.fallback_page_count);

    println!("\nScraper:");
    println!("  Max workers: {}", config.scraper.max_workers);
    println!("  Delay: {:.2}s (jittered 50-100%)", config.scraper.delay_secs);
    match config.scraper.max_pages {
        Some(pages) => println!("  Max pages: {}", pages),
        None => println!("  Max pages: all"),
    }
    match config.scraper.limit_jobs {
        Some(limit) => println!("  Job limit: {}", limit),
        None => println!("  Job limit: none"),
    }
    if let Some(seed) = config.scraper.jitter_seed {
        println!("  Jitter seed: {}", seed);
    }

    println!("\nHTTP:");
    println!("  User agent: {}", config.http.user_agent);
    println!("  Timeout: {}s", config.http.timeout_secs);

    println!("\nOutput:");
    println!("  Records: {}/", config.output.output_dir);
    println!(
        "  Failure log: {}",
        Path::new(&config.output.output_dir)
            .join(&config.output.failure_log)
            .display()
    );
    println!("  Statistics: {}", config.output.stats_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: aggregates the stored records
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let store = open_storage(&config.output)?;
    let records = load_corpus(&store)?;

    let stats = compute_statistics(&records);
    write_statistics(&stats, Path::new(&config.output.stats_path))?;
    print_statistics(&stats);

    println!("\n✓ Statistics saved to: {}", config.output.stats_path);
    Ok(())
}

/// Handles the main scrape operation
async fn handle_scrape(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Using {} workers with {:.2}s base delay",
        config.scraper.max_workers,
        config.scraper.delay_secs
    );

    let output = config.output.clone();
    match run_scrape(config).await {
        Ok(summary) => {
            print_run_summary(&summary, &output);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Scrape failed: {}", e);
            Err(e.into())
        }
    }
}

//! Configuration module for Job-Harvest
//!
//! This module handles loading, parsing, and validating the optional TOML
//! configuration file. Command-line flags are layered on top by the binary.
//!
//! # Example
//!
//! ```no_run
//! use job_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Workers: {}", config.scraper.max_workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    default_worker_count, Config, HttpConfig, OutputConfig, ScraperConfig, SiteConfig,
    MAX_DELAY_SECS, MAX_WORKERS,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;

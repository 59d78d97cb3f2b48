use crate::config::types::{
    Config, HttpConfig, OutputConfig, ScraperConfig, SiteConfig, MAX_DELAY_SECS, MAX_WORKERS,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_scraper_config(&config.scraper)?;
    validate_http_config(&config.http)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates listing location and pagination settings
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.search_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid search-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "search-url must use http or https, got '{}'",
            config.search_url
        )));
    }

    if !config.job_path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "job-path must start with '/', got '{}'",
            config.job_path
        )));
    }

    if config.page_size < 1 {
        return Err(ConfigError::Validation(
            "page-size must be >= 1".to_string(),
        ));
    }

    if config.fallback_page_count < 1 {
        return Err(ConfigError::Validation(
            "fallback-page-count must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates worker pool and pacing settings
fn validate_scraper_config(config: &ScraperConfig) -> Result<(), ConfigError> {
    if config.max_workers < 1 || config.max_workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "max-workers must be between 1 and {}, got {}",
            MAX_WORKERS, config.max_workers
        )));
    }

    if !config.delay_secs.is_finite() || config.delay_secs < 0.0 {
        return Err(ConfigError::Validation(format!(
            "delay-secs must be a non-negative number, got {}",
            config.delay_secs
        )));
    }

    if config.delay_secs > MAX_DELAY_SECS {
        return Err(ConfigError::Validation(format!(
            "delay-secs must be at most {}, got {}",
            MAX_DELAY_SECS, config.delay_secs
        )));
    }

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max-pages must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates HTTP session settings
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.output_dir.is_empty() {
        return Err(ConfigError::Validation(
            "output-dir cannot be empty".to_string(),
        ));
    }

    if config.failure_log.is_empty() || config.failure_log.contains('/') {
        return Err(ConfigError::Validation(format!(
            "failure-log must be a plain file name, got '{}'",
            config.failure_log
        )));
    }

    Ok(())
}

use crate::config::types::{BrowserConfig, Config, CrawlerConfig, FilterConfig, OutputConfig};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_browser_config(&config.browser)?;
    validate_filter_config(&config.filter)?;
    validate_output_config(&config.output)?;
    validate_seeds(&config.seeds)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_requests_per_crawl < 1 {
        return Err(ConfigError::Validation(format!(
            "max_requests_per_crawl must be >= 1, got {}",
            config.max_requests_per_crawl
        )));
    }

    if config.max_concurrent_pages_open < 1 || config.max_concurrent_pages_open > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_pages_open must be between 1 and 100, got {}",
            config.max_concurrent_pages_open
        )));
    }

    if config.per_page_pagination_cap < 1 {
        return Err(ConfigError::Validation(format!(
            "per_page_pagination_cap must be >= 1, got {}",
            config.per_page_pagination_cap
        )));
    }

    if config.navigation_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "navigation_timeout_ms must be >= 100ms, got {}ms",
            config.navigation_timeout_ms
        )));
    }

    if config.pagination_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "pagination_timeout_ms must be >= 100ms, got {}ms",
            config.pagination_timeout_ms
        )));
    }

    Ok(())
}

/// Validates renderer configuration
fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    if config.pagination_selector.trim().is_empty() {
        return Err(ConfigError::Validation(
            "pagination_selector cannot be empty".to_string(),
        ));
    }

    Selector::parse(&config.pagination_selector).map_err(|e| {
        ConfigError::Validation(format!(
            "Invalid pagination_selector '{}': {:?}",
            config.pagination_selector, e
        ))
    })?;

    Ok(())
}

fn validate_filter_config(config: &FilterConfig) -> Result<(), ConfigError> {
    if config.path_patterns.iter().any(|p| p.is_empty()) {
        return Err(ConfigError::Validation(
            "path_patterns cannot contain empty patterns".to_string(),
        ));
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.report_path.is_empty() {
        return Err(ConfigError::Validation(
            "report_path cannot be empty".to_string(),
        ));
    }

    if matches!(config.summary_path.as_deref(), Some("")) {
        return Err(ConfigError::Validation(
            "summary_path cannot be empty when set".to_string(),
        ));
    }

    if matches!(config.log_dir.as_deref(), Some("")) {
        return Err(ConfigError::Validation(
            "log_dir cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates the seed list
fn validate_seeds(seeds: &[String]) -> Result<(), ConfigError> {
    if seeds.is_empty() {
        return Err(ConfigError::Validation(
            "At least one seed URL is required".to_string(),
        ));
    }

    for seed in seeds {
        let url = Url::parse(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "Seed URL '{}' must use http or https",
                seed
            )));
        }
    }

    Ok(())
}

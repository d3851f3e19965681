use crate::config::types::{Config, CrawlerConfig, OutputConfig, UserAgentConfig, WebDriverConfig};
use crate::platform::Platform;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_webdriver_config(&config.webdriver)?;
    for platform in Platform::ALL {
        validate_platform_config(config, platform)?;
    }
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_movies < 1 {
        return Err(ConfigError::Validation(format!(
            "max-movies must be >= 1, got {}",
            config.max_movies
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.max_consecutive_page_failures < 1 {
        return Err(ConfigError::Validation(format!(
            "max-consecutive-page-failures must be >= 1, got {}",
            config.max_consecutive_page_failures
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates the user agent pool
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.pool.is_empty() {
        return Err(ConfigError::Validation(
            "user-agent pool must contain at least one entry".to_string(),
        ));
    }

    if let Some(index) = config.pool.iter().position(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "user-agent pool entry {} is blank",
            index
        )));
    }

    Ok(())
}

/// Validates the WebDriver section
fn validate_webdriver_config(config: &WebDriverConfig) -> Result<(), ConfigError> {
    validate_http_url("webdriver endpoint", &config.endpoint)?;

    if config.poll_interval_ms == 0 {
        return Err(ConfigError::Validation(
            "webdriver poll-interval-ms must be > 0".to_string(),
        ));
    }

    if config.ready_timeout_ms < config.poll_interval_ms {
        return Err(ConfigError::Validation(format!(
            "webdriver ready-timeout-ms ({}) must be >= poll-interval-ms ({})",
            config.ready_timeout_ms, config.poll_interval_ms
        )));
    }

    Ok(())
}

/// Validates one platform section after defaults are applied
fn validate_platform_config(config: &Config, platform: Platform) -> Result<(), ConfigError> {
    let settings = config.platform(platform);

    validate_http_url(&format!("{} base-url", platform), &settings.base_url)?;

    if settings.min_delay > settings.max_delay {
        return Err(ConfigError::Validation(format!(
            "{}: min-delay-ms ({}) must be <= max-delay-ms ({})",
            platform,
            settings.min_delay.as_millis(),
            settings.max_delay.as_millis()
        )));
    }

    if settings.retry.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "{}: max-retries must be >= 1, got {}",
            platform, settings.retry.max_attempts
        )));
    }

    let raw = config.platform_config(platform);
    if raw.backoff_base_ms > raw.backoff_max_ms {
        return Err(ConfigError::Validation(format!(
            "{}: backoff-base-ms ({}) must be <= backoff-max-ms ({})",
            platform, raw.backoff_base_ms, raw.backoff_max_ms
        )));
    }

    if settings.request_timeout.is_zero() {
        return Err(ConfigError::Validation(format!(
            "{}: request-timeout-ms must be > 0",
            platform
        )));
    }

    Ok(())
}

/// Validates that a string is an http(s) URL
fn validate_http_url(what: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", what, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use http or https",
            what, value
        )));
    }

    Ok(())
}

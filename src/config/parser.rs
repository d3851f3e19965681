use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use cinesift::config::load_config;
///
/// let config = load_config(Path::new("cinesift.toml")).unwrap();
/// println!("Max movies per platform: {}", config.crawler.max_movies);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
///
/// # Arguments
///
/// * `content` - TOML document; every key is optional
///
/// # Returns
///
/// * `Ok(Config)` - Parsed configuration that passed validation
/// * `Err(ConfigError)` - Malformed TOML or a value that failed validation
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so runs can be matched to the configuration they used.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok((Config, String))` - Validated configuration and its hash
/// * `Err(ConfigError)` - Failed to read, parse or validate the configuration
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutionMode;
    use crate::platform::{Platform, RenderMode};
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[crawler]
max-movies = 50
max-pages = 4
execution = "sequential"

[output]
directory = "./out"

[user-agent]
pool = ["TestAgent/1.0"]

[platforms.douban]
min-delay-ms = 100
max-delay-ms = 200
fetch-details = true

[platforms.imdb]
enabled = false
rendering = "plain"
backoff = "fixed"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.max_movies, 50);
        assert_eq!(config.crawler.max_pages, 4);
        assert_eq!(config.crawler.max_consecutive_page_failures, 3);
        assert_eq!(config.crawler.execution, ExecutionMode::Sequential);
        assert_eq!(config.output.directory, "./out");
        assert_eq!(config.user_agent.pool, vec!["TestAgent/1.0"]);

        let douban = config.platform(Platform::Douban);
        assert_eq!(douban.min_delay, Duration::from_millis(100));
        assert_eq!(douban.max_delay, Duration::from_millis(200));
        assert!(douban.fetch_details);
        assert_eq!(douban.base_url, "https://movie.douban.com/");

        let imdb = config.platform(Platform::Imdb);
        assert!(!imdb.enabled);
        assert_eq!(imdb.rendering, RenderMode::Plain);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();

        let douban = config.platform(Platform::Douban);
        assert_eq!(douban.min_delay, Duration::from_millis(2000));
        assert_eq!(douban.max_delay, Duration::from_millis(5000));
        assert_eq!(douban.rendering, RenderMode::Plain);
        assert_eq!(douban.retry.max_attempts, 3);

        let imdb = config.platform(Platform::Imdb);
        assert_eq!(imdb.rendering, RenderMode::Script);
        assert_eq!(config.webdriver.endpoint, "http://localhost:9515");
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/cinesift.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        assert!(matches!(load_config(file.path()), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_unknown_enum_value_is_parse_error() {
        let result = parse_config("[crawler]\nexecution = \"parallel\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let file = create_temp_config("[platforms.douban]\nmax-retries = 0\n");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("[crawler]\nmax-pages = 1\n");
        let file2 = create_temp_config("[crawler]\nmax-pages = 2\n");

        let (_, hash1) = load_config_with_hash(file1.path()).unwrap();
        let (_, hash2) = load_config_with_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}

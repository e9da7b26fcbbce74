use crate::config::types::{Bound, Config, CrawlerConfig, FetcherConfig, InputConfig, OutputConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_input_config(&config.input)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    // depth >= 0 is always true for u32, so no check needed

    if config.concurrency < 1 || config.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 100, got {}",
            config.concurrency
        )));
    }

    if config.breadth == Bound::Limited(0) {
        return Err(ConfigError::Validation(
            "breadth must be >= 1 or \"unbounded\"".to_string(),
        ));
    }

    Ok(())
}

/// Validates fetcher configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates seed sources
fn validate_input_config(config: &InputConfig) -> Result<(), ConfigError> {
    if config.seeds.is_empty() && config.file.is_none() {
        return Err(ConfigError::Validation(
            "at least one seed URL or a seed file is required".to_string(),
        ));
    }

    for seed in &config.seeds {
        validate_seed(seed)?;
    }

    Ok(())
}

/// Validates a single seed URL
pub(crate) fn validate_seed(seed: &str) -> Result<(), ConfigError> {
    let url = Url::parse(seed)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Seed URL '{}' must use HTTP or HTTPS",
            seed
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' has no host",
            seed
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.lock_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "lock_timeout_ms must be >= 1".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_seed() {
        assert!(validate_seed("https://example.com").is_ok());
        assert!(validate_seed("http://example.com/page").is_ok());

        assert!(validate_seed("").is_err());
        assert!(validate_seed("example.com").is_err());
        assert!(validate_seed("ftp://example.com").is_err());
        assert!(validate_seed("mailto:admin@example.com").is_err());
    }

    #[test]
    fn test_zero_breadth_rejected() {
        let config = CrawlerConfig {
            depth: Bound::Limited(1),
            breadth: Bound::Limited(0),
            follow_external: false,
            follow_internal: true,
            concurrency: 2,
        };
        assert!(matches!(
            validate_crawler_config(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_zero_depth_allowed() {
        let config = CrawlerConfig {
            depth: Bound::Limited(0),
            breadth: Bound::Unbounded,
            follow_external: true,
            follow_internal: true,
            concurrency: 1,
        };
        assert!(validate_crawler_config(&config).is_ok());
    }

    #[test]
    fn test_missing_seed_source_rejected() {
        let input = InputConfig::default();
        assert!(validate_input_config(&input).is_err());
    }

    #[test]
    fn test_crawler_name_characters() {
        let mut fetcher = FetcherConfig::default();
        assert!(validate_fetcher_config(&fetcher).is_ok());

        fetcher.crawler_name = "bad name!".to_string();
        assert!(validate_fetcher_config(&fetcher).is_err());
    }
}

use crate::config::types::{Config, InputConfig};
use crate::config::validation::{validate, validate_seed};
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
/// use webstack_census::config::load_config;
///
/// let config = load_config(Path::new("census.toml")).unwrap();
/// println!("Depth: {}", config.crawler.depth);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at start-up so separate runs can be matched to the configuration
/// that produced them.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Collects every seed URL named by the input configuration
///
/// Inline seeds come first, followed by the lines of the seed file (if any),
/// each wrapped in the configured prefix and suffix. Blank lines are skipped
/// and duplicates are dropped while preserving order. A seed that is not a
/// valid HTTP(S) URL is logged and skipped; only an unreadable seed file is
/// an error.
pub fn load_seeds(input: &InputConfig) -> Result<Vec<String>, ConfigError> {
    let mut seeds: Vec<String> = Vec::new();

    let mut push = |seed: String| {
        if let Err(e) = validate_seed(&seed) {
            tracing::warn!("Skipping seed: {}", e);
            return;
        }
        if !seeds.contains(&seed) {
            seeds.push(seed);
        }
    };

    for seed in &input.seeds {
        push(seed.trim().to_string());
    }

    if let Some(file) = &input.file {
        let content = std::fs::read_to_string(file)?;
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            push(format!("{}{}{}", input.prefix, line, input.suffix));
        }
    }

    Ok(seeds)
}

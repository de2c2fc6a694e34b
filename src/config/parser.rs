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
/// use sumi_sweep::config::load_config;
///
/// let config = load_config(Path::new("sweep.toml")).unwrap();
/// println!("Seeds: {}", config.seeds.len());
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;

    validate(&config)?;

    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// The hash is logged at the start of every run next to the report path.
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
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok((Config, String))` - Successfully loaded configuration and its hash
/// * `Err(ConfigError)` - Failed to load or parse the configuration
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

use super::Config;
use crate::scanner::IgnoreSet;
use anyhow::{Context, Result};
use std::path::Path;

/// Read and validate a configuration file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid TOML, or fails
/// validation.
pub fn parse_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config_str(&content)
        .with_context(|| format!("Invalid config file: {}", path.display()))
}

/// Parse and validate configuration text.
///
/// # Errors
///
/// Returns an error if the text is not valid TOML or fails validation.
pub fn parse_config_str(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("Failed to parse TOML config")?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &Config) -> Result<()> {
    // Compile every pattern once so a typo fails here instead of mid-walk
    let mut ignore = IgnoreSet::empty();
    for pattern in &config.tracking.ignore_patterns {
        ignore.add(pattern)?;
    }
    Ok(())
}

//! Configuration loading for the linkwatch CLI
//!
//! The TOML file mirrors `LinkwatchConfig`; every table and key is
//! optional and falls back to the library defaults.
//!
//! ```toml
//! [evaluator]
//! success_probability = 0.7
//! max_retries = 3
//!
//! [lockout]
//! max_failed_attempts = 5
//! ```

use std::path::Path;

use linkwatch_core::LinkwatchConfig;
use tracing::info;

use crate::error::Result;

/// Load configuration from file or use defaults
pub fn load_configuration(path: Option<&str>) -> Result<LinkwatchConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            load_from_file(path)
        }
        None => {
            info!("Using default configuration");
            Ok(LinkwatchConfig::default())
        }
    }
}

/// Parse and validate a TOML configuration file
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<LinkwatchConfig> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> Result<LinkwatchConfig> {
    let config: LinkwatchConfig = toml::from_str(contents)?;
    config.validate()?;
    Ok(config)
}

/// Render a configuration as TOML
pub fn render_config(config: &LinkwatchConfig) -> Result<String> {
    Ok(toml::to_string_pretty(config)?)
}

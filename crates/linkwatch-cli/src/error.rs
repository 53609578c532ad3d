//! Error handling for the linkwatch CLI

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Linkwatch core error: {0}")]
    Core(#[from] linkwatch_core::LinkwatchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    #[error("Scenario task failed: {0}")]
    Task(String),
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

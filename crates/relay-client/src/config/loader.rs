use std::path::Path;
use thiserror::Error;

use super::types::RelayConfigFile;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Invalid relay URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unsupported relay URL scheme: {0}")]
    UnsupportedScheme(String),
    #[error("Poll interval must be greater than zero")]
    ZeroPollInterval,
}

/// Load relay client configuration from a JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RelayConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Load configuration from a JSON string
pub fn load_config_from_str(json: &str) -> Result<RelayConfigFile, ConfigError> {
    let config: RelayConfigFile = serde_json::from_str(json)?;
    Ok(config)
}

/// Load the default embedded configuration
pub fn load_default_config() -> Result<RelayConfigFile, ConfigError> {
    let default_config = include_str!("relay_config.json");
    load_config_from_str(default_config)
}

impl RelayConfigFile {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = url::Url::parse(&self.relay.url)?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ConfigError::UnsupportedScheme(url.scheme().to_string()));
        }
        if self.client.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(())
    }
}

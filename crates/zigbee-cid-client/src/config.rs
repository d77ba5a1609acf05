//! Client configuration.
//!
//! Loaded from YAML; every field is optional.
//!
//! ```yaml
//! default_timeout_ms: 500
//! event_capacity: 128
//! log_frames: true
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

fn default_timeout_ms() -> u64 {
    2000
}

fn default_event_capacity() -> usize {
    64
}

/// Settings for a [`CidClient`](crate::CidClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Timeout used by [`CidClient::request`](crate::CidClient::request).
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,

    /// Responses buffered per subscriber before the slowest one lags.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Trace every frame written and every chunk received.
    #[serde(default)]
    pub log_frames: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            default_timeout_ms: default_timeout_ms(),
            event_capacity: default_event_capacity(),
            log_frames: false,
        }
    }
}

impl ClientConfig {
    /// Parse a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ClientError> {
        let config: ClientConfig =
            serde_yaml::from_str(yaml).map_err(|e| ClientError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// The default request timeout.
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    fn validate(&self) -> Result<(), ClientError> {
        if self.event_capacity == 0 {
            return Err(ClientError::Config("event_capacity must be at least 1".into()));
        }
        if self.default_timeout_ms == 0 {
            return Err(ClientError::Config("default_timeout_ms must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.default_timeout(), Duration::from_secs(2));
        assert_eq!(config.event_capacity, 64);
        assert!(!config.log_frames);
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = "default_timeout_ms: 250\nlog_frames: true\n";
        let config = ClientConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.default_timeout_ms, 250);
        assert_eq!(config.event_capacity, 64);
        assert!(config.log_frames);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            ClientConfig::from_yaml_str("event_capacity: 0"),
            Err(ClientError::Config(_))
        ));
        assert!(matches!(
            ClientConfig::from_yaml_str("default_timeout_ms: nope"),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = ClientConfig {
            default_timeout_ms: 750,
            event_capacity: 8,
            log_frames: true,
        };
        let text = serde_yaml::to_string(&config).unwrap();
        assert_eq!(ClientConfig::from_yaml_str(&text).unwrap(), config);
    }
}

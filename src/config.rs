//! Immutable pipeline configuration.
//!
//! Configuration is read once at startup from an optional YAML file, then
//! overlaid with CLI flags, validated and frozen into an `Arc` that every
//! pipeline entry point receives. Nothing mutates it afterwards.
//!
//! ```yaml
//! sources:
//!   - https://feeds.bbci.co.uk/news/rss.xml
//!   - https://www.aljazeera.com/xml/rss/all.xml
//! batch_size: 3
//! batch_delay_ms: 2000
//! fetch_timeout_ms: 15000
//! min_words: 55
//! max_words: 60
//! ```

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

/// Desktop Chrome user agent. Many news sites refuse obvious bot clients.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const DEFAULT_SOURCES: &[&str] = &[
    "https://feeds.bbci.co.uk/news/world/rss.xml",
    "https://feeds.npr.org/1001/rss.xml",
    "https://www.aljazeera.com/xml/rss/all.xml",
    "https://rss.nytimes.com/services/xml/rss/nyt/World.xml",
    "https://www.theguardian.com/world/rss",
];

/// Tunables consumed by the batch pipeline.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Feed URLs, in the order they are reported back to clients.
    pub sources: Vec<String>,
    /// Items processed concurrently per batch.
    pub batch_size: usize,
    /// Pause between consecutive batches.
    pub batch_delay_ms: u64,
    /// Deadline for each article fetch. Feed fetches are not bounded.
    pub fetch_timeout_ms: u64,
    pub min_words: usize,
    pub max_words: usize,
    pub user_agent: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sources: DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect(),
            batch_size: 3,
            batch_delay_ms: 2000,
            fetch_timeout_ms: 15000,
            min_words: 55,
            max_words: 60,
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load from a YAML file. Missing keys keep their defaults.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml_str(&raw)?;
        info!(sources = config.sources.len(), "Loaded pipeline configuration");
        Ok(config)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not a map.
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be at least 1".into()));
        }
        if self.max_words == 0 {
            return Err(ConfigError::Invalid("max_words must be at least 1".into()));
        }
        if self.min_words > self.max_words {
            return Err(ConfigError::Invalid(format!(
                "min_words ({}) exceeds max_words ({})",
                self.min_words, self.max_words
            )));
        }
        Ok(())
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.batch_delay(), Duration::from_secs(2));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(15));
        assert_eq!((config.min_words, config.max_words), (55, 60));
        assert!(!config.sources.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "sources:\n  - https://example.com/feed.xml\nbatch_size: 5\n";
        let config = PipelineConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.sources, vec!["https://example.com/feed.xml".to_string()]);
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.batch_delay_ms, 2000);
        assert_eq!(config.max_words, 60);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(PipelineConfig::from_yaml_str("  \n").unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_bad_yaml() {
        assert!(matches!(
            PipelineConfig::from_yaml_str("batch_size: [not, a, number]"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let config = PipelineConfig {
            min_words: 80,
            max_words: 60,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let config = PipelineConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}

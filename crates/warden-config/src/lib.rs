//! Configuration management for Warden
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (`WARDEN_*` prefix, `__` between section and key)
//! 2. warden.local.toml (local overrides)
//! 3. warden.toml (deployment config)
//! 4. ~/.config/warden/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)
//!
//! For example `WARDEN_IDENTITY__TIMEOUT_MS=2500` sets `identity.timeout_ms`.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Main Warden configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    pub identity: IdentityConfig,
    pub reconciler: ReconcilerConfig,
    pub logging: LoggingConfig,
}

/// Identity service client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Bound on one lookup, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self { timeout_ms: 10_000 }
    }
}

impl IdentityConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Tenants reconciled in parallel.
    pub max_concurrency: usize,
    /// Partition holding rows shared across tenants.
    pub shared_partition: String,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            shared_partition: "public".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive; `RUST_LOG` takes precedence.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl WardenConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from a specific deployment directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Parses a single TOML document; missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the services cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identity.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "identity.timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.reconciler.max_concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "reconciler.max_concurrency must be greater than zero".to_string(),
            ));
        }
        if self.reconciler.shared_partition.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "reconciler.shared_partition must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WardenConfig::default();
        assert_eq!(config.identity.timeout(), Duration::from_secs(10));
        assert_eq!(config.reconciler.max_concurrency, 4);
        assert_eq!(config.reconciler.shared_partition, "public");
        assert_eq!(config.logging.filter, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = WardenConfig::from_toml_str(
            r#"
[identity]
timeout_ms = 2500
"#,
        )
        .expect("Failed to parse config");

        assert_eq!(config.identity.timeout_ms, 2500);
        assert_eq!(config.reconciler, ReconcilerConfig::default());
    }

    #[test]
    fn test_validation_rejects_zero_values() {
        let mut config = WardenConfig::default();
        config.identity.timeout_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));

        let mut config = WardenConfig::default();
        config.reconciler.max_concurrency = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));

        let mut config = WardenConfig::default();
        config.reconciler.shared_partition = "  ".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_malformed_toml_is_a_parse_error() {
        let result = WardenConfig::from_toml_str("[identity\ntimeout_ms = 1");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid max_concurrency: {0}. Must be at least 1")]
    InvalidMaxConcurrency(usize),

    #[error("Invalid queue_capacity: {capacity}. Must be at least max_concurrency ({max_concurrency})")]
    InvalidQueueCapacity {
        capacity: usize,
        max_concurrency: usize,
    },

    #[error("Invalid max_fold_attempts: {0}. Must be at least 1")]
    InvalidMaxFoldAttempts(u32),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .foldex/config.yaml (project config)
    /// 3. .foldex/local.yaml (local overrides, optional)
    /// 4. Environment variables (FOLDEX_* prefix, `__` separates nested keys)
    pub fn load() -> Result<Config> {
        let config: Config = Self::figment()
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".foldex/config.yaml"))
            .merge(Yaml::file(".foldex/local.yaml"))
            .merge(Env::prefixed("FOLDEX_").split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.pool.max_concurrency == 0 {
            return Err(ConfigError::InvalidMaxConcurrency(
                config.pool.max_concurrency,
            ));
        }

        if config.pool.queue_capacity < config.pool.max_concurrency {
            return Err(ConfigError::InvalidQueueCapacity {
                capacity: config.pool.queue_capacity,
                max_concurrency: config.pool.max_concurrency,
            });
        }

        if config.max_fold_attempts == 0 {
            return Err(ConfigError::InvalidMaxFoldAttempts(config.max_fold_attempts));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{DedupPolicy, LogFormat};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.policy, DedupPolicy::Replace);
        assert_eq!(config.max_fold_attempts, 64);
        assert_eq!(config.pool.max_concurrency, 4);
        assert_eq!(config.pool.queue_capacity, 10_000);
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
policy: discard
max_fold_attempts: 8
pool:
  max_concurrency: 2
  queue_capacity: 16
logging:
  level: debug
  format: json
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.policy, DedupPolicy::Discard);
        assert_eq!(config.max_fold_attempts, 8);
        assert_eq!(config.pool.max_concurrency, 2);
        assert_eq!(config.pool.queue_capacity, 16);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.logging.enable_console);

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_zero_concurrency() {
        let mut config = Config::default();
        config.pool.max_concurrency = 0;

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidMaxConcurrency(0)
        ));
    }

    #[test]
    fn test_validate_capacity_below_concurrency() {
        let mut config = Config::default();
        config.pool.max_concurrency = 8;
        config.pool.queue_capacity = 4;

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidQueueCapacity {
                capacity: 4,
                max_concurrency: 8
            }
        ));
    }

    #[test]
    fn test_validate_zero_fold_attempts() {
        let config = Config {
            max_fold_attempts: 0,
            ..Default::default()
        };

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidMaxFoldAttempts(0)
        ));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "verbose"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_from_file_merges_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "policy: discard\npool:\n  max_concurrency: 3").unwrap();
        file.flush().unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.policy, DedupPolicy::Discard);
        assert_eq!(config.pool.max_concurrency, 3);
        assert_eq!(
            config.pool.queue_capacity, 10_000,
            "Unset fields keep their defaults"
        );
    }

    #[test]
    fn test_load_from_file_rejects_invalid() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "max_fold_attempts: 0").unwrap();
        file.flush().unwrap();

        assert!(ConfigLoader::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_env_override() {
        temp_env::with_vars(
            [
                ("FOLDEX_POLICY", Some("discard")),
                ("FOLDEX_POOL__MAX_CONCURRENCY", Some("7")),
                ("FOLDEX_LOGGING__LEVEL", Some("warn")),
            ],
            || {
                let config: Config = ConfigLoader::figment().extract().unwrap();
                assert_eq!(config.policy, DedupPolicy::Discard);
                assert_eq!(config.pool.max_concurrency, 7);
                assert_eq!(config.logging.level, "warn");
            },
        );
    }

    #[test]
    fn test_hierarchical_merging() {
        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(
            base_file,
            "max_fold_attempts: 5\nlogging:\n  level: info\n  format: json"
        )
        .unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "max_fold_attempts: 9\nlogging:\n  level: debug").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.max_fold_attempts, 9, "Override should win");
        assert_eq!(
            config.logging.level, "debug",
            "Override should win for nested fields"
        );
        assert_eq!(
            config.logging.format,
            LogFormat::Json,
            "Base value should persist when not overridden"
        );
    }
}

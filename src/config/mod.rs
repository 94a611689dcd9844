//! Configuration system for Omniseal
//!
//! Supports loading configuration from:
//! 1. CLI --config argument
//! 2. ~/.config/omniseal/config.json
//! 3. Default values
//!
//! Environment variables override file values. All limits have documented
//! defaults; the config is passed into the validator at construction so there
//! is no hidden global state and tests can override limits per call.
//!
//! # Examples
//!
//! ```
//! use omniseal::config::ValidatorConfig;
//!
//! let mut config = ValidatorConfig::default();
//! config.max_code_size = 10_000;
//! config.validate().unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Limits applied by the code integrity validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Maximum candidate size in characters
    #[serde(default = "default_max_code_size")]
    pub max_code_size: usize,

    /// Overall wall-clock budget for one validation, in milliseconds
    #[serde(default = "default_max_validation_time_ms")]
    pub max_validation_time_ms: u64,

    /// Budget for the pattern-scanning phase, in milliseconds
    #[serde(default = "default_pattern_timeout_ms")]
    pub pattern_timeout_ms: u64,

    /// Maximum number of syntax tree nodes
    #[serde(default = "default_max_ast_nodes")]
    pub max_ast_nodes: usize,

    /// Maximum length of a single line in characters
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,

    /// Maximum syntax tree nesting depth
    #[serde(default = "default_max_nested_depth")]
    pub max_nested_depth: usize,

    /// Minimum substring length for the repeated-pattern detector
    #[serde(default = "default_duplicate_pattern_min_length")]
    pub duplicate_pattern_min_length: usize,

    /// Minimum consecutive repeats for the repeated-pattern detector
    #[serde(default = "default_duplicate_pattern_min_repeats")]
    pub duplicate_pattern_min_repeats: usize,
}

fn default_max_code_size() -> usize {
    50_000
}

fn default_max_validation_time_ms() -> u64 {
    1_500
}

fn default_pattern_timeout_ms() -> u64 {
    500
}

fn default_max_ast_nodes() -> usize {
    2_500
}

fn default_max_line_length() -> usize {
    500
}

fn default_max_nested_depth() -> usize {
    8
}

fn default_duplicate_pattern_min_length() -> usize {
    10
}

fn default_duplicate_pattern_min_repeats() -> usize {
    3
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_code_size: default_max_code_size(),
            max_validation_time_ms: default_max_validation_time_ms(),
            pattern_timeout_ms: default_pattern_timeout_ms(),
            max_ast_nodes: default_max_ast_nodes(),
            max_line_length: default_max_line_length(),
            max_nested_depth: default_max_nested_depth(),
            duplicate_pattern_min_length: default_duplicate_pattern_min_length(),
            duplicate_pattern_min_repeats: default_duplicate_pattern_min_repeats(),
        }
    }
}

impl ValidatorConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: ValidatorConfig = serde_json::from_str(&content)?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration with standard priority:
    /// 1. Explicit path
    /// 2. ~/.config/omniseal/config.json
    /// 3. Defaults
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit_path {
            if path.exists() {
                tracing::info!("Loading config from: {:?}", path);
                return Self::from_file(path);
            } else {
                return Err(ConfigError::ValidationError(format!(
                    "Config file not found: {:?}",
                    path
                )));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("omniseal").join("config.json");

            if config_path.exists() {
                tracing::info!("Loading config from: {:?}", config_path);
                return Self::from_file(&config_path);
            }
        }

        tracing::info!("Using default configuration with environment overrides");
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        fn env_usize(name: &str) -> Option<usize> {
            std::env::var(name).ok().and_then(|v| v.parse().ok())
        }
        fn env_u64(name: &str) -> Option<u64> {
            std::env::var(name).ok().and_then(|v| v.parse().ok())
        }

        if let Some(v) = env_usize("OMNISEAL_MAX_CODE_SIZE") {
            self.max_code_size = v;
        }
        if let Some(v) = env_u64("OMNISEAL_MAX_VALIDATION_TIME_MS") {
            self.max_validation_time_ms = v;
        }
        if let Some(v) = env_u64("OMNISEAL_PATTERN_TIMEOUT_MS") {
            self.pattern_timeout_ms = v;
        }
        if let Some(v) = env_usize("OMNISEAL_MAX_AST_NODES") {
            self.max_ast_nodes = v;
        }
        if let Some(v) = env_usize("OMNISEAL_MAX_LINE_LENGTH") {
            self.max_line_length = v;
        }
        if let Some(v) = env_usize("OMNISEAL_MAX_NESTED_DEPTH") {
            self.max_nested_depth = v;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_code_size == 0 {
            return Err(ConfigError::ValidationError(
                "max_code_size must be greater than 0".to_string(),
            ));
        }

        if self.max_ast_nodes == 0 {
            return Err(ConfigError::ValidationError(
                "max_ast_nodes must be greater than 0".to_string(),
            ));
        }

        if self.max_line_length == 0 {
            return Err(ConfigError::ValidationError(
                "max_line_length must be greater than 0".to_string(),
            ));
        }

        if self.max_nested_depth == 0 {
            return Err(ConfigError::ValidationError(
                "max_nested_depth must be greater than 0".to_string(),
            ));
        }

        if self.duplicate_pattern_min_length == 0 || self.duplicate_pattern_min_repeats < 2 {
            return Err(ConfigError::ValidationError(
                "duplicate pattern limits must allow at least one repeat".to_string(),
            ));
        }

        Ok(())
    }

    /// Overall validation deadline
    pub fn max_validation_time(&self) -> Duration {
        Duration::from_millis(self.max_validation_time_ms)
    }

    /// Per-phase pattern scanning deadline
    pub fn pattern_timeout(&self) -> Duration {
        Duration::from_millis(self.pattern_timeout_ms)
    }

    /// Get the config directory path
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("omniseal"))
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

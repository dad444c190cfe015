//! Agent Configuration
//!
//! Effective configuration consumed by the Periscope debug agent: the
//! working directory to scan, capture bounds, log level, and the snapshot
//! expiration horizon enforced by the registration loop.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Could not read the configuration file
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Configuration file is not valid TOML
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is outside its allowed range
    #[error("invalid config value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Bounds applied to every snapshot capture
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CaptureConfig {
    /// Hard cap on stack frames reported per snapshot
    #[serde(default = "defaults::max_frames")]
    pub max_frames: usize,

    /// Frames whose arguments/locals are expanded inline; frames beyond
    /// this share a single "not expanded" variable-table entry
    #[serde(default = "defaults::max_expand_frames")]
    pub max_expand_frames: usize,

    /// Members materialized per compound value before truncation
    #[serde(default = "defaults::max_properties")]
    pub max_properties: usize,

    /// Characters of a rendered string before the `...` marker
    #[serde(default = "defaults::max_string_length")]
    pub max_string_length: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_frames: defaults::max_frames(),
            max_expand_frames: defaults::max_expand_frames(),
            max_properties: defaults::max_properties(),
            max_string_length: defaults::max_string_length(),
        }
    }
}

/// Complete agent configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct AgentConfig {
    /// Root directory scanned for debuggable sources
    #[serde(default = "defaults::working_directory")]
    pub working_directory: PathBuf,

    /// Log level for agent diagnostics ("off", "error", "warn", "info",
    /// "debug", "trace")
    #[serde(default = "defaults::log_level")]
    pub log_level: String,

    /// Seconds the registration loop keeps a breakpoint alive before
    /// requesting removal with the expiration message
    #[serde(
        rename = "breakpointExpirationSec",
        default = "defaults::breakpoint_expiration_secs"
    )]
    pub breakpoint_expiration_secs: u64,

    /// Snapshot capture bounds
    #[serde(default)]
    pub capture: CaptureConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            working_directory: defaults::working_directory(),
            log_level: defaults::log_level(),
            breakpoint_expiration_secs: defaults::breakpoint_expiration_secs(),
            capture: CaptureConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Parse a configuration from TOML text and validate it.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: AgentConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capture.max_frames == 0 {
            return Err(ConfigError::Invalid {
                key: "capture.maxFrames",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.capture.max_expand_frames > self.capture.max_frames {
            return Err(ConfigError::Invalid {
                key: "capture.maxExpandFrames",
                reason: format!(
                    "must not exceed capture.maxFrames ({})",
                    self.capture.max_frames
                ),
            });
        }
        if self.log_filter().is_none() {
            return Err(ConfigError::Invalid {
                key: "logLevel",
                reason: format!("unknown level `{}`", self.log_level),
            });
        }
        Ok(())
    }

    /// Map the configured level string to a `log` filter, if recognized.
    pub fn log_filter(&self) -> Option<log::LevelFilter> {
        match self.log_level.to_ascii_lowercase().as_str() {
            "off" => Some(log::LevelFilter::Off),
            "error" => Some(log::LevelFilter::Error),
            "warn" | "warning" => Some(log::LevelFilter::Warn),
            "info" => Some(log::LevelFilter::Info),
            "debug" => Some(log::LevelFilter::Debug),
            "trace" => Some(log::LevelFilter::Trace),
            _ => None,
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn working_directory() -> PathBuf {
        PathBuf::from(".")
    }

    pub fn log_level() -> String {
        "warn".to_string()
    }

    pub fn breakpoint_expiration_secs() -> u64 {
        600
    }

    pub fn max_frames() -> usize {
        20
    }

    pub fn max_expand_frames() -> usize {
        5
    }

    pub fn max_properties() -> usize {
        10
    }

    pub fn max_string_length() -> usize {
        100
    }
}

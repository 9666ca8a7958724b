//! Configuration management for Display Chime
//!
//! Handles loading and validating the optional YAML configuration file and
//! merging command-line overrides on top of it.

use crate::devices::IdGranularity;
use crate::poll::DEFAULT_POLL_INTERVAL;
use crate::toggle::SoundPaths;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::info;

/// Display watched when nothing else is configured
pub const DEFAULT_TARGET_DEVICE_ID: &str = "XYM1564";

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    /// Identifier of the display to watch for
    #[serde(default = "default_target_device_id")]
    pub target_device_id: String,
    /// Sound restored into the device-connect slot
    #[serde(default = "default_inserted_sound_path")]
    pub inserted_sound_path: String,
    /// Sound restored into the device-disconnect slot
    #[serde(default = "default_removed_sound_path")]
    pub removed_sound_path: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub id_granularity: IdGranularity,
    #[serde(default)]
    pub log: LogConfig,
}

/// Log file configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LogConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Overrides the application logs directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    /// Number of daily log files kept
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

/// Values given on the command line, applied over the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub target_device_id: Option<String>,
    pub inserted_sound_path: Option<String>,
    pub removed_sound_path: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub id_granularity: Option<IdGranularity>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            target_device_id: default_target_device_id(),
            inserted_sound_path: default_inserted_sound_path(),
            removed_sound_path: default_removed_sound_path(),
            poll_interval_ms: default_poll_interval_ms(),
            id_granularity: IdGranularity::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
            max_files: default_max_log_files(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file.
    ///
    /// Not validated here: command-line overrides are applied first, then
    /// the caller runs [`AppConfig::validate`] once on the merged result.
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path.display()))
    }

    /// Load the file if it exists, otherwise fall back to the defaults.
    pub async fn load_or_default(path: &Path) -> Result<Self> {
        if !fs::try_exists(path).await.unwrap_or(false) {
            info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        Self::load(path).await
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(target) = overrides.target_device_id {
            self.target_device_id = target;
        }
        if let Some(path) = overrides.inserted_sound_path {
            self.inserted_sound_path = path;
        }
        if let Some(path) = overrides.removed_sound_path {
            self.removed_sound_path = path;
        }
        if let Some(ms) = overrides.poll_interval_ms {
            self.poll_interval_ms = ms;
        }
        if let Some(granularity) = overrides.id_granularity {
            self.id_granularity = granularity;
        }
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if self.target_device_id.trim().is_empty() {
            anyhow::bail!("target_device_id cannot be empty");
        }
        if self.id_granularity == IdGranularity::Model && self.target_device_id.contains('\\') {
            anyhow::bail!(
                "target_device_id '{}' looks like an instance path, use id_granularity: instance",
                self.target_device_id
            );
        }
        if self.inserted_sound_path.is_empty() {
            anyhow::bail!("inserted_sound_path cannot be empty");
        }
        if self.removed_sound_path.is_empty() {
            anyhow::bail!("removed_sound_path cannot be empty");
        }
        if self.poll_interval_ms == 0 {
            anyhow::bail!("poll_interval_ms must be greater than 0");
        }
        if self.log.max_files == 0 {
            anyhow::bail!("log.max_files must be at least 1");
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn sound_paths(&self) -> SoundPaths {
        SoundPaths {
            inserted: self.inserted_sound_path.clone(),
            removed: self.removed_sound_path.clone(),
        }
    }
}

// Default value functions
fn default_target_device_id() -> String { DEFAULT_TARGET_DEVICE_ID.to_string() }
fn default_inserted_sound_path() -> String { r"C:\Windows\Media\Windows Hardware Insert.wav".to_string() }
fn default_removed_sound_path() -> String { r"C:\Windows\Media\Windows Hardware Remove.wav".to_string() }
fn default_poll_interval_ms() -> u64 { DEFAULT_POLL_INTERVAL.as_millis() as u64 }
fn default_true() -> bool { true }
fn default_max_log_files() -> usize { 7 }

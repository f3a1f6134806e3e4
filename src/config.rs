// Configuration management for Sdvault

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::recorder::RecordKind;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Raw block device holding the removable medium
    pub device_path: PathBuf,

    /// Where the medium is mounted while present
    pub mount_path: PathBuf,

    /// Recording policy for sessions opened by the drivers
    #[serde(default)]
    pub record_kind: RecordKind,

    /// Artifact rotation threshold in seconds
    #[serde(default = "default_rotate_secs")]
    pub rotate_secs: u32,

    /// How often the medium/day poller runs, in seconds
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Cadence of the sample-delivery loops, in seconds
    #[serde(default = "default_sample_interval_secs")]
    pub sample_interval_secs: u64,

    /// Free-space floor in bytes; when the mounted medium drops below this,
    /// the capacity-policy driver evicts the oldest day. 0 disables eviction.
    #[serde(default)]
    pub min_free_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_path: PathBuf::from("/dev/mmcblk0"),
            mount_path: PathBuf::from("/tmp/sdvault"),
            record_kind: RecordKind::default(),
            rotate_secs: default_rotate_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            sample_interval_secs: default_sample_interval_secs(),
            min_free_bytes: 0,
        }
    }
}

impl Config {
    /// Load config from disk or return default
    pub fn load_or_default(config_path: &Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(config) => return config,
                    Err(e) => {
                        log::warn!("Failed to parse config: {}", e);
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read config file: {}", e);
                }
            }
        }

        Self::default()
    }

    /// Save config to disk
    pub fn save(&self, config_path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(config_path, contents)?;

        Ok(())
    }
}

/// Default rotation threshold (for serde)
fn default_rotate_secs() -> u32 {
    300
}

/// Default poller cadence (for serde)
fn default_poll_interval_secs() -> u64 {
    60
}

/// Default sample cadence (for serde)
fn default_sample_interval_secs() -> u64 {
    1
}

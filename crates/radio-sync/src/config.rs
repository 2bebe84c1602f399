use anyhow::{bail, Context};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::platform;
use super::tags::TagPolicy;
use super::target::NamingPolicy;

/// Daemon configuration, read from a TOML file.
///
/// `station.url`, `station.api_key` and `download.destination_folder` have no
/// defaults; a file without them fails to load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub station: StationConfig,
    pub download: DownloadConfig,
    #[serde(default)]
    pub tags: TagsConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationConfig {
    /// Base URL of the station site, e.g. `https://station.example/`.
    pub url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Root folder; each show gets a `<short_name>/` subfolder.
    pub destination_folder: PathBuf,
    #[serde(default = "default_lookahead_minutes")]
    pub lookahead_minutes: u32,
    #[serde(default = "default_media_subtype")]
    pub media_subtype: String,
    #[serde(default)]
    pub naming: NamingPolicy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagsConfig {
    #[serde(default)]
    pub policy: TagPolicy,
}

/// Minutes past every hour at which the daemon runs the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_schedule_minutes")]
    pub minutes: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Directory holding the log file.
    #[serde(default = "platform::log_dir")]
    pub path: PathBuf,
    /// Log file stem; the file is `<name>.log`.
    #[serde(default = "default_log_name")]
    pub name: String,
    /// `tracing_subscriber::EnvFilter` directive, e.g. `info` or `debug`.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_max_bytes")]
    pub max_bytes: u64,
    #[serde(default = "default_log_backups")]
    pub backups: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            minutes: default_schedule_minutes(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: platform::log_dir(),
            name: default_log_name(),
            level: default_log_level(),
            max_bytes: default_log_max_bytes(),
            backups: default_log_backups(),
        }
    }
}

fn default_lookahead_minutes() -> u32 {
    10
}

fn default_media_subtype() -> String {
    "mp3".to_string()
}

fn default_schedule_minutes() -> Vec<u32> {
    vec![20, 50]
}

fn default_log_name() -> String {
    "radio-sync".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_max_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_log_backups() -> u32 {
    20
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::config_path);

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file {}", config_path.display()))
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }

    pub fn lookahead(&self) -> Duration {
        Duration::minutes(i64::from(self.download.lookahead_minutes))
    }

    fn validate(&self) -> anyhow::Result<()> {
        reqwest::Url::parse(&self.station.url)
            .with_context(|| format!("station.url is not a valid URL: {}", self.station.url))?;
        if self.station.api_key.is_empty() {
            bail!("station.api_key must not be empty");
        }
        if self.download.destination_folder.as_os_str().is_empty() {
            bail!("download.destination_folder must not be empty");
        }
        if self.download.media_subtype.is_empty() {
            bail!("download.media_subtype must not be empty");
        }
        if self.schedule.minutes.is_empty() {
            bail!("schedule.minutes must list at least one minute");
        }
        if let Some(bad) = self.schedule.minutes.iter().find(|m| **m > 59) {
            bail!("schedule.minutes contains {bad}, expected 0..=59");
        }
        Ok(())
    }
}

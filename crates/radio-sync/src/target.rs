//! Local file naming

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Suffix used by [`NamingPolicy::Overwrite`].
pub const NEWEST_SUFFIX: &str = "newest";

/// How the per-show file is named.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamingPolicy {
    /// `<short_name>-newest.mp3`, replaced by every download.
    #[default]
    Overwrite,
    /// `<short_name>-YYYY-MM-DD.mp3`, one file per broadcast day.
    DateSuffixed,
}

impl NamingPolicy {
    pub fn suffix(&self, start: NaiveDateTime) -> String {
        match self {
            Self::Overwrite => NEWEST_SUFFIX.to_string(),
            Self::DateSuffixed => start.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Where one run's download lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    path: PathBuf,
}

impl DownloadTarget {
    pub fn new(
        destination_root: &Path,
        short_name: &str,
        policy: NamingPolicy,
        start: NaiveDateTime,
    ) -> Self {
        let file_name = format!("{}-{}.mp3", short_name, policy.suffix(start));
        Self {
            path: destination_root.join(short_name).join(file_name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The show folder.
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }
}

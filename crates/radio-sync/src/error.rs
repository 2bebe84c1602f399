use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Pipeline stage an error surfaced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolve,
    Show,
    Materialize,
    Tag,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Resolve => "resolve",
            Self::Show => "show",
            Self::Materialize => "materialize",
            Self::Tag => "tag",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything that can end a pipeline run early.
///
/// None of these are retried inside a run; the next scheduled run is the retry.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("[{stage}] request to {url} failed: {source}")]
    Network {
        stage: Stage,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("[{stage}] malformed response: {detail}")]
    Malformed { stage: Stage, detail: String },

    #[error("[{stage}] filesystem error at {}: {source}", path.display())]
    Filesystem {
        stage: Stage,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[tag] failed to write tags to {}: {source}", path.display())]
    Tagging {
        path: PathBuf,
        #[source]
        source: lofty::error::LoftyError,
    },
}

impl SyncError {
    pub fn network(stage: Stage, url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            stage,
            url: url.into(),
            source,
        }
    }

    pub fn malformed(stage: Stage, detail: impl Into<String>) -> Self {
        Self::Malformed {
            stage,
            detail: detail.into(),
        }
    }

    pub fn filesystem(stage: Stage, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            stage,
            path: path.into(),
            source,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            Self::Network { stage, .. }
            | Self::Malformed { stage, .. }
            | Self::Filesystem { stage, .. } => *stage,
            Self::Tagging { .. } => Stage::Tag,
        }
    }
}

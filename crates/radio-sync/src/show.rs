//! Show detail lookup

use serde::Deserialize;
use tracing::debug;

use crate::api::StationClient;
use crate::error::{Stage, SyncError};

/// Show metadata from the show-detail endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShowInfo {
    /// Used as the album tag.
    pub title: String,
    /// Folder and file stem on disk.
    pub short_name: String,
    #[serde(default)]
    pub hosts: Vec<Host>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Host {
    pub display_name: String,
}

impl Host {
    pub fn new(display_name: &str) -> Self {
        Self {
            display_name: display_name.to_string(),
        }
    }
}

impl ShowInfo {
    /// Host names joined with `,` in API order.
    pub fn artist(&self) -> String {
        join_hosts(&self.hosts)
    }
}

/// Blank display names are left out.
pub fn join_hosts(hosts: &[Host]) -> String {
    hosts
        .iter()
        .map(|h| h.display_name.as_str())
        .filter(|name| !name.trim().is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

/// Fetch and validate show details.
pub async fn fetch_show(station: &StationClient, show_id: &str) -> Result<ShowInfo, SyncError> {
    let show = station.show(show_id).await?;
    validate(&show)?;

    debug!("Show Name (album): {}", show.title);
    debug!("Short Name (local folder): {}", show.short_name);
    debug!("Hosts (artist): {}", show.artist());
    Ok(show)
}

fn validate(show: &ShowInfo) -> Result<(), SyncError> {
    if show.title.trim().is_empty() {
        return Err(SyncError::malformed(
            Stage::Show,
            format!("show {:?} has an empty title", show.short_name),
        ));
    }
    if show.artist().is_empty() {
        return Err(SyncError::malformed(
            Stage::Show,
            format!("show {:?} has no named hosts", show.short_name),
        ));
    }
    if !is_safe_short_name(&show.short_name) {
        return Err(SyncError::malformed(
            Stage::Show,
            format!("short_name {:?} is not usable as a folder name", show.short_name),
        ));
    }
    Ok(())
}

/// A single, non-traversing path component.
pub fn is_safe_short_name(short_name: &str) -> bool {
    !short_name.is_empty()
        && short_name != "."
        && short_name != ".."
        && !short_name.contains(['/', '\\', '\0'])
}

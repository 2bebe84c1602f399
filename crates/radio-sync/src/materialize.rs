//! Streaming download into the show folder

use futures_util::StreamExt;
use std::path::Path;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::api::StationClient;
use crate::error::{Stage, SyncError};

/// Create `local_path`'s parent folder if it is missing.
///
/// Returns `true` when the folder had to be created, which means the show is
/// new to the downstream player.
pub async fn ensure_parent_dir(local_path: &Path) -> Result<bool, SyncError> {
    let Some(dir) = local_path.parent().filter(|d| !d.as_os_str().is_empty()) else {
        return Ok(false);
    };

    if tokio::fs::try_exists(dir)
        .await
        .map_err(|e| SyncError::filesystem(Stage::Materialize, dir, e))?
    {
        return Ok(false);
    }

    warn!("Had to make directory {}", dir.display());
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| SyncError::filesystem(Stage::Materialize, dir, e))?;
    Ok(true)
}

/// Download `remote_url` to `local_path`, replacing any existing file.
///
/// The body is streamed into a hidden temp file next to `local_path` and
/// renamed into place once complete, so readers only ever see a whole file.
/// Returns the number of bytes written.
pub async fn materialize(
    station: &StationClient,
    remote_url: &str,
    local_path: &Path,
) -> Result<u64, SyncError> {
    info!("Downloading {} to {}", remote_url, local_path.display());

    let response = station
        .http()
        .get(remote_url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| SyncError::network(Stage::Materialize, remote_url, e))?;

    let staging = staging_file(local_path, Stage::Materialize)?;
    let (std_file, temp_path) = staging.into_parts();
    let mut out = tokio::fs::File::from_std(std_file);
    let fs_err = |e| SyncError::filesystem(Stage::Materialize, &*temp_path, e);

    let mut written = 0u64;
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| SyncError::network(Stage::Materialize, remote_url, e))?;
        out.write_all(&chunk).await.map_err(fs_err)?;
        written += chunk.len() as u64;
    }
    out.flush().await.map_err(fs_err)?;
    out.sync_all().await.map_err(fs_err)?;
    drop(out);

    temp_path
        .persist(local_path)
        .map_err(|e| SyncError::filesystem(Stage::Materialize, local_path, e.error))?;

    info!("download complete ({} bytes)", written);
    Ok(written)
}

/// Hidden temp file in the same folder as `final_path`, so it can be renamed
/// over it atomically.
pub(crate) fn staging_file(final_path: &Path, stage: Stage) -> Result<NamedTempFile, SyncError> {
    let dir = final_path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let mut builder = tempfile::Builder::new();
    builder.prefix(".radio-sync-").suffix(".part");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o644));
    }

    builder
        .tempfile_in(dir)
        .map_err(|e| SyncError::filesystem(stage, dir, e))
}

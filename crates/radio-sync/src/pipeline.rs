//! One acquisition run: resolve → show → select → materialize → tag

use chrono::{Duration, NaiveDateTime};
use std::path::PathBuf;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::api::StationClient;
use crate::config::Config;
use crate::error::SyncError;
use crate::materialize;
use crate::media::select_asset;
use crate::resolver::{self, format_remaining, Resolution};
use crate::show::fetch_show;
use crate::tags::{self, TagFields};
use crate::target::DownloadTarget;

/// How a run that did not fail ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The next broadcast is further away than the lookahead.
    NotImminent {
        title: String,
        start: NaiveDateTime,
        remaining: Duration,
    },
    /// Imminent, but no media of the required subtype; nothing was downloaded.
    NoAsset { target: PathBuf },
    /// Downloaded and tagged.
    Tagged { target: PathBuf, bytes: u64 },
}

/// Run the pipeline once against `station` as of `now` (station-local time).
pub async fn run_once(
    config: &Config,
    station: &StationClient,
    now: NaiveDateTime,
) -> Result<RunOutcome, SyncError> {
    let span = info_span!("run", station = %station.base_url(), now = %now);
    run_stages(config, station, now).instrument(span).await
}

async fn run_stages(
    config: &Config,
    station: &StationClient,
    now: NaiveDateTime,
) -> Result<RunOutcome, SyncError> {
    info!("Starting process");

    let broadcast = match resolver::resolve(station, now, config.lookahead()).await? {
        Resolution::Imminent(broadcast) => broadcast,
        Resolution::Pending {
            broadcast,
            remaining,
        } => {
            debug!(
                "Next show ({}) in {}, not running download step yet",
                broadcast.title,
                format_remaining(remaining)
            );
            info!("Finished process");
            return Ok(RunOutcome::NotImminent {
                title: broadcast.title,
                start: broadcast.start,
                remaining,
            });
        }
    };

    debug!(
        "Found a show that will start within {} minutes: {} (show id {})",
        config.download.lookahead_minutes, broadcast.title, broadcast.show_id
    );

    let subtype = config.download.media_subtype.as_str();
    let remote_url = select_asset(&broadcast, subtype);

    let show = fetch_show(station, &broadcast.show_id).await?;
    let target = DownloadTarget::new(
        &config.download.destination_folder,
        &show.short_name,
        config.download.naming,
        broadcast.start,
    );
    debug!("Local Filename: {}", target.path().display());

    materialize::ensure_parent_dir(target.path()).await?;

    let Some(remote_url) = remote_url else {
        warn!("No {} file was attached to the broadcast!", subtype);
        info!("Finished process");
        return Ok(RunOutcome::NoAsset {
            target: target.path().to_path_buf(),
        });
    };

    let bytes = materialize::materialize(station, remote_url, target.path()).await?;

    let fields = TagFields {
        title: broadcast.title.clone(),
        album: show.title.clone(),
        artist: show.artist(),
    };
    debug!("Adding mp3 tag");
    tags::write_tags(target.path(), &fields, config.tags.policy).await?;

    info!("Finished process");
    Ok(RunOutcome::Tagged {
        target: target.path().to_path_buf(),
        bytes,
    })
}

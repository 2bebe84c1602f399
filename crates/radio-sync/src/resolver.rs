//! Upcoming broadcast lookup and the "imminent" decision

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::api::StationClient;
use crate::error::{Stage, SyncError};

/// Format of `start` in the upcoming-broadcasts payload.
pub const START_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One scheduled airing, as returned by the upcoming-broadcasts endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Broadcast {
    /// Station-local start time.
    #[serde(deserialize_with = "de_start")]
    pub start: NaiveDateTime,
    #[serde(deserialize_with = "de_show_id")]
    pub show_id: String,
    pub title: String,
    #[serde(default)]
    pub media: Vec<MediaAsset>,
}

/// One encoding of a broadcast's audio.
///
/// Embed-only variants (video players and the like) carry no `url`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MediaAsset {
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl MediaAsset {
    pub fn new(subtype: &str, url: &str) -> Self {
        Self {
            subtype: Some(subtype.to_string()),
            url: Some(url.to_string()),
        }
    }
}

/// What the resolver decided about the next broadcast.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Imminent(Broadcast),
    Pending {
        broadcast: Broadcast,
        /// Time left until the broadcast starts.
        remaining: Duration,
    },
}

impl Resolution {
    pub fn into_imminent(self) -> Option<Broadcast> {
        match self {
            Self::Imminent(broadcast) => Some(broadcast),
            Self::Pending { .. } => None,
        }
    }
}

pub fn parse_start(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw, START_FORMAT)
}

/// `start <= now + lookahead`. Broadcasts that already started count too.
pub fn is_imminent(start: NaiveDateTime, now: NaiveDateTime, lookahead: Duration) -> bool {
    match now.checked_add_signed(lookahead) {
        Some(deadline) => start <= deadline,
        None => true,
    }
}

pub fn classify(broadcast: Broadcast, now: NaiveDateTime, lookahead: Duration) -> Resolution {
    if is_imminent(broadcast.start, now, lookahead) {
        Resolution::Imminent(broadcast)
    } else {
        let remaining = broadcast.start - now;
        Resolution::Pending {
            broadcast,
            remaining,
        }
    }
}

/// Decode the head of the upcoming list. Later entries are never looked at.
pub fn next_broadcast(upcoming: Vec<Value>) -> Result<Broadcast, SyncError> {
    let first = upcoming
        .into_iter()
        .next()
        .ok_or_else(|| SyncError::malformed(Stage::Resolve, "upcoming broadcast list is empty"))?;

    serde_json::from_value(first)
        .map_err(|e| SyncError::malformed(Stage::Resolve, format!("next broadcast: {e}")))
}

/// Fetch the upcoming broadcasts and classify the first one.
///
/// An imminent broadcast must have a title, since it becomes the title tag.
pub async fn resolve(
    station: &StationClient,
    now: NaiveDateTime,
    lookahead: Duration,
) -> Result<Resolution, SyncError> {
    let next = next_broadcast(station.upcoming_broadcasts().await?)?;
    debug!("Next Broadcast at {} (show {})", next.start, next.show_id);

    let resolution = classify(next, now, lookahead);
    if let Resolution::Imminent(broadcast) = &resolution {
        if broadcast.title.trim().is_empty() {
            return Err(SyncError::malformed(
                Stage::Resolve,
                format!("broadcast of show {} has an empty title", broadcast.show_id),
            ));
        }
    }
    Ok(resolution)
}

/// "D days, H hours, M minutes, S seconds"
pub fn format_remaining(remaining: Duration) -> String {
    let total = remaining.num_seconds().max(0);
    let (days, rem) = (total / 86_400, total % 86_400);
    let (hours, rem) = (rem / 3_600, rem % 3_600);
    let (minutes, seconds) = (rem / 60, rem % 60);
    format!("{days} days, {hours} hours, {minutes} minutes, {seconds} seconds")
}

fn de_start<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_start(&raw)
        .map_err(|e| serde::de::Error::custom(format!("invalid start time {raw:?}: {e}")))
}

/// Some station backends send the show id as a number.
fn de_show_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

//! Broadcast acquisition for radio station schedules.
//!
//! Polls a station's "upcoming broadcasts" API and, when the next broadcast
//! is about to start, downloads its audio into
//! `<destination>/<short_name>/<short_name>-<suffix>.mp3` and tags it with
//! the broadcast title, show title and hosts.

pub mod api;
pub mod config;
pub mod error;
pub mod materialize;
pub mod media;
pub mod pipeline;
pub mod platform;
pub mod resolver;
pub mod show;
pub mod tags;
pub mod target;

pub use config::Config;
pub use error::{Stage, SyncError};
pub use pipeline::{run_once, RunOutcome};

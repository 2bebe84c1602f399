//! Wall-clock run schedule: fixed minutes past every hour.

use anyhow::bail;
use chrono::{Duration, NaiveDateTime, Timelike};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    /// Sorted, deduplicated, all in `0..=59`.
    minutes: Vec<u32>,
}

impl Schedule {
    pub fn new(minutes: &[u32]) -> anyhow::Result<Self> {
        if minutes.is_empty() {
            bail!("schedule needs at least one minute");
        }
        if let Some(bad) = minutes.iter().find(|m| **m > 59) {
            bail!("schedule minute {bad} is out of range 0..=59");
        }
        let mut minutes = minutes.to_vec();
        minutes.sort_unstable();
        minutes.dedup();
        Ok(Self { minutes })
    }

    pub fn minutes(&self) -> &[u32] {
        &self.minutes
    }

    /// First scheduled time strictly after `after`.
    pub fn next_fire(&self, after: NaiveDateTime) -> NaiveDateTime {
        let into_hour = Duration::seconds(i64::from(after.minute() * 60 + after.second()))
            + Duration::nanoseconds(i64::from(after.nanosecond()));
        let hour_start = after - into_hour;

        for hour in 0..=1 {
            for minute in &self.minutes {
                let candidate =
                    hour_start + Duration::hours(hour) + Duration::minutes(i64::from(*minute));
                if candidate > after {
                    return candidate;
                }
            }
        }
        // unreachable with a non-empty minute list
        hour_start + Duration::hours(1)
    }
}

//! Telescope observations. Read-only here: the telescope's own database is
//! the source of truth and times in it are GPS seconds.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

// ─── GPS time ────────────────────────────────────────────────────────────────

/// Seconds between the Unix epoch and the GPS epoch (1980-01-06T00:00:00Z).
pub const GPS_EPOCH_UNIX: i64 = 315_964_800;

/// GPS time runs ahead of UTC by the leap seconds inserted since 1980.
pub const GPS_UTC_LEAP_SECONDS: i64 = 18;

pub fn gps_to_utc(gps_seconds: i64) -> DateTime<Utc> {
  Utc
    .timestamp_opt(gps_seconds + GPS_EPOCH_UNIX - GPS_UTC_LEAP_SECONDS, 0)
    .single()
    .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

pub fn utc_to_gps(at: DateTime<Utc>) -> i64 {
  at.timestamp() - GPS_EPOCH_UNIX + GPS_UTC_LEAP_SECONDS
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// One scheduled or completed observation, with the number of data files
/// archived for it so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
  /// The GPS start second, which the telescope uses as the observation id.
  pub observation_number: i64,
  pub obsname:            String,
  pub projectid:          String,
  pub start_time:         DateTime<Utc>,
  pub stop_time:          DateTime<Utc>,
  pub files:              i64,
}

impl Observation {
  pub fn is_running_at(&self, at: DateTime<Utc>) -> bool {
    self.start_time <= at && at < self.stop_time
  }
}

/// Scheduled observations still to come.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FutureObservationCounts {
  pub total:   i64,
  /// Those that will have finished within the next 24 hours.
  pub next_24: i64,
}

/// The status-page snapshot: what is observing right now and the two most
/// recently finished observations of the monitored project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservingStatus {
  pub current:  Option<Observation>,
  pub previous: Vec<Observation>,
}

// ─── Waiting time ────────────────────────────────────────────────────────────

/// Render a wait in the largest unit that is at least one, e.g. `"1.50 Days"`.
pub fn format_wait(wait: Duration) -> String {
  let seconds = wait.num_milliseconds() as f64 / 1000.0;
  let minutes = seconds / 60.0;
  let hours = minutes / 60.0;
  let days = hours / 24.0;
  let weeks = days / 7.0;

  let (value, unit) = [
    (weeks, "Weeks"),
    (days, "Days"),
    (hours, "Hours"),
    (minutes, "Minutes"),
  ]
  .into_iter()
  .find(|(v, _)| *v >= 1.0)
  .unwrap_or((seconds, "Seconds"));

  format!("{value:.2} {unit}")
}

//! Download-lag report built from the archive's "recent files" listing.
//!
//! The first line of the listing names the most recently downloaded file.
//! It carries the local download date and time, and the file name embeds the
//! observation id and the observation timestamp (UTC, `YYYYMMDDhhmmss`).

use std::{fmt, sync::LazyLock};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use regex::Regex;

use crate::{Error, Result};

static DATE_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"[0-9]{4}-[0-9]{2}-[0-9]{2}").expect("valid regex"));
static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"[0-9]{2}:[0-9]{2}:[0-9]{2}\.[0-9]{3}").expect("valid regex")
});
static OBSTIME_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"[0-9]{14}").expect("valid regex"));
static OBSID_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^([0-9]{10,})_").expect("valid regex"));

/// The parsed lag between an observation and the download of its data.
#[derive(Debug, Clone, PartialEq)]
pub struct LastDownload {
  /// Absent when the file name does not start with an observation id.
  pub obsid:         Option<String>,
  pub downloaded_at: DateTime<Utc>,
  pub observed_at:   DateTime<Utc>,
}

impl LastDownload {
  /// Parse the first line of a listing whose timestamps are in `listing_tz`.
  pub fn parse(listing: &str, listing_tz: FixedOffset) -> Result<Self> {
    let line = listing.lines().next().unwrap_or_default();

    let date = DATE_RE
      .find(line)
      .ok_or(Error::ListingParse("date match not found"))?;
    let time = TIME_RE
      .find(line)
      .ok_or(Error::ListingParse("time match not found"))?;
    let obstime = OBSTIME_RE
      .find(line)
      .ok_or(Error::ListingParse("obstime match not found"))?;

    let local_date = NaiveDate::parse_from_str(date.as_str(), "%Y-%m-%d")
      .map_err(|_| Error::ListingParse("date match not found"))?;
    let local_time = NaiveTime::parse_from_str(time.as_str(), "%H:%M:%S%.3f")
      .map_err(|_| Error::ListingParse("time match not found"))?;
    let downloaded_at = listing_tz
      .from_local_datetime(&local_date.and_time(local_time))
      .single()
      .ok_or(Error::ListingParse("time match not found"))?
      .with_timezone(&Utc);

    let observed_at = NaiveDateTime::parse_from_str(obstime.as_str(), "%Y%m%d%H%M%S")
      .map_err(|_| Error::ListingParse("obstime match not found"))?
      .and_utc();

    let obsid = OBSID_RE
      .captures(line)
      .and_then(|c| c.get(1))
      .map(|m| m.as_str().to_owned());

    Ok(Self { obsid, downloaded_at, observed_at })
  }

  /// Lag in fractional days; negative if the clocks disagree.
  pub fn lag_days(&self) -> f64 {
    (self.downloaded_at - self.observed_at).num_seconds() as f64 / 86_400.0
  }
}

impl fmt::Display for LastDownload {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "last download {} at {}, with observation time of {}, lag of {:.2} days",
      self.obsid.as_deref().unwrap_or("(unknown)"),
      self.downloaded_at.format("%Y-%m-%d %H:%M:%S"),
      self.observed_at.format("%Y-%m-%d %H:%M:%S"),
      self.lag_days(),
    )
  }
}

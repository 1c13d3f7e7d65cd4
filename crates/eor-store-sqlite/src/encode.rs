//! Encoding and decoding helpers between domain types and the plain values
//! stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with a fixed microsecond width
//! and a `Z` suffix, so they compare correctly as text. Observed dates are
//! stored as `YYYY-MM-DD`. Tag masks are stored as their raw integer.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use eor_core::{
  graph::GraphPoint,
  log::ObservationLog,
  observation::{Observation, gps_to_utc},
  tag::TagMask,
  user::User,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Columns selected for every log read; `users.name` is joined in.
pub const LOG_COLUMNS: &str = "l.id, l.created_date, l.observed_date, \
                               l.author_user_id, u.name, l.note, l.tags";

/// Raw values read from an `observation_logs` row joined with `users`.
pub struct RawLog {
  pub id:               i64,
  pub created_date:     String,
  pub observed_date:    String,
  pub author_user_id:   i64,
  pub author_user_name: String,
  pub note:             String,
  pub tags:             u32,
}

impl RawLog {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:               row.get(0)?,
      created_date:     row.get(1)?,
      observed_date:    row.get(2)?,
      author_user_id:   row.get(3)?,
      author_user_name: row.get(4)?,
      note:             row.get(5)?,
      tags:             row.get(6)?,
    })
  }

  pub fn into_log(self) -> Result<ObservationLog> {
    Ok(ObservationLog {
      id:               self.id,
      created_date:     decode_dt(&self.created_date)?,
      observed_date:    decode_date(&self.observed_date)?,
      author_user_id:   self.author_user_id,
      author_user_name: self.author_user_name,
      note:             self.note,
      tags:             TagMask::from_bits(self.tags),
    })
  }
}

pub const USER_COLUMNS: &str =
  "id, username, name, email, created_at, deactivated_date, admin_level";

/// Raw values read from a `users` row. The password hash is selected
/// separately and only for credential checks.
pub struct RawUser {
  pub id:               i64,
  pub username:         String,
  pub name:             String,
  pub email:            String,
  pub created_at:       String,
  pub deactivated_date: Option<String>,
  pub admin_level:      i32,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:               row.get(0)?,
      username:         row.get(1)?,
      name:             row.get(2)?,
      email:            row.get(3)?,
      created_at:       row.get(4)?,
      deactivated_date: row.get(5)?,
      admin_level:      row.get(6)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:               self.id,
      username:         self.username,
      name:             self.name,
      email:            self.email,
      created_at:       decode_dt(&self.created_at)?,
      deactivated_date: self.deactivated_date.as_deref().map(decode_dt).transpose()?,
      admin_level:      self.admin_level,
    })
  }
}

pub const GRAPH_COLUMNS: &str = "id, created_date, hours_scheduled, hours_observed, \
                                 hours_with_data, hours_with_uvfits, data_transfer_rate";

pub struct RawGraphPoint {
  pub id:                 i64,
  pub created_date:       String,
  pub hours_scheduled:    f64,
  pub hours_observed:     f64,
  pub hours_with_data:    f64,
  pub hours_with_uvfits:  f64,
  pub data_transfer_rate: f64,
}

impl RawGraphPoint {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                 row.get(0)?,
      created_date:       row.get(1)?,
      hours_scheduled:    row.get(2)?,
      hours_observed:     row.get(3)?,
      hours_with_data:    row.get(4)?,
      hours_with_uvfits:  row.get(5)?,
      data_transfer_rate: row.get(6)?,
    })
  }

  pub fn into_point(self) -> Result<GraphPoint> {
    Ok(GraphPoint {
      id:                 self.id,
      created_date:       decode_dt(&self.created_date)?,
      hours_scheduled:    self.hours_scheduled,
      hours_observed:     self.hours_observed,
      hours_with_data:    self.hours_with_data,
      hours_with_uvfits:  self.hours_with_uvfits,
      data_transfer_rate: self.data_transfer_rate,
    })
  }
}

/// Columns selected for every observation read; `files` is a `COUNT` over
/// the joined `data_files` rows, so queries using this must `GROUP BY`.
pub const OBSERVATION_COLUMNS: &str = "s.starttime, s.stoptime, s.obsname, s.projectid, \
                                       COUNT(f.id)";

/// Raw values read from `mwa_setting`, with start and stop in GPS seconds.
pub struct RawObservation {
  pub starttime: i64,
  pub stoptime:  i64,
  pub obsname:   String,
  pub projectid: String,
  pub files:     i64,
}

impl RawObservation {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      starttime: row.get(0)?,
      stoptime:  row.get(1)?,
      obsname:   row.get(2)?,
      projectid: row.get(3)?,
      files:     row.get(4)?,
    })
  }

  pub fn into_observation(self) -> Observation {
    Observation {
      observation_number: self.starttime,
      obsname:            self.obsname,
      projectid:          self.projectid,
      start_time:         gps_to_utc(self.starttime),
      stop_time:          gps_to_utc(self.stoptime),
      files:              self.files,
    }
  }
}

//! Daily observing-efficiency samples plotted on the dashboard charts.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::observation::Observation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphPoint {
  pub id:                 i64,
  pub created_date:       DateTime<Utc>,
  pub hours_scheduled:    f64,
  pub hours_observed:     f64,
  pub hours_with_data:    f64,
  pub hours_with_uvfits:  f64,
  pub data_transfer_rate: f64,
}

/// Input to [`crate::store::DashboardStore::record_graph_point`]; the store
/// assigns `id` and `created_date`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NewGraphPoint {
  pub hours_scheduled:    f64,
  pub hours_observed:     f64,
  pub hours_with_data:    f64,
  pub hours_with_uvfits:  f64,
  pub data_transfer_rate: f64,
}

impl NewGraphPoint {
  /// Cumulative hours over the monitored projects' schedule as of `now`.
  ///
  /// An observation counts as observed once it has stopped, and as having
  /// data once any file for it is archived. UVFITS hours and the transfer
  /// rate come from systems the schedule mirror does not cover and are
  /// left at zero.
  pub fn from_schedule<'a, I>(observations: I, now: DateTime<Utc>) -> Self
  where
    I: IntoIterator<Item = &'a Observation>,
  {
    observations.into_iter().fold(Self::default(), |mut point, obs| {
      let hours = (obs.stop_time - obs.start_time).num_seconds() as f64 / 3600.0;
      point.hours_scheduled += hours;
      if obs.stop_time < now {
        point.hours_observed += hours;
      }
      if obs.files > 0 {
        point.hours_with_data += hours;
      }
      point
    })
  }
}

fn round4(v: f64) -> f64 { (v * 10_000.0).round() / 10_000.0 }

impl GraphPoint {
  /// The point with every series rounded to four decimal places.
  #[must_use]
  pub fn rounded(self) -> Self {
    Self {
      hours_scheduled: round4(self.hours_scheduled),
      hours_observed: round4(self.hours_observed),
      hours_with_data: round4(self.hours_with_data),
      hours_with_uvfits: round4(self.hours_with_uvfits),
      data_transfer_rate: round4(self.data_transfer_rate),
      ..self
    }
  }
}

/// Start of the `last_x_months` window ending at `now`.
pub fn window_start(now: DateTime<Utc>, months: u32) -> DateTime<Utc> {
  now
    .checked_sub_months(Months::new(months))
    .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

//! Batch jobs run from the command line rather than over HTTP.
//!
//! `collect-graph-data` appends one chart sample computed from the schedule
//! mirror, and is meant to run from cron. `load-schedule` feeds the mirror
//! from a text export of the telescope schedule.

use chrono::{DateTime, Utc};
use eor_core::{
  graph::{GraphPoint, NewGraphPoint},
  store::{DashboardStore, ObservationSource},
};
use eor_store_sqlite::SqliteObservationSource;

use crate::Error;

// ─── Chart samples ────────────────────────────────────────────────────────────

/// Sample the monitored projects' schedule as of `now` and store the result.
pub async fn collect_graph_point<S, O>(
  store: &S,
  observations: &O,
  now: DateTime<Utc>,
) -> Result<GraphPoint, Error>
where
  S: DashboardStore,
  O: ObservationSource,
{
  let schedule = observations
    .project_observations()
    .await
    .map_err(|e| Error::Observations(Box::new(e)))?;
  let sample = NewGraphPoint::from_schedule(&schedule, now);
  tracing::debug!(observations = schedule.len(), ?sample, "schedule sampled");

  store
    .record_graph_point(sample)
    .await
    .map_err(|e| Error::Store(Box::new(e)))
}

// ─── Schedule mirror ──────────────────────────────────────────────────────────

/// One line of a schedule export.
///
/// ```text
/// observation,<starttime>,<stoptime>,<projectid>,<obsname>
/// file,<observation_num>,<filename>
/// ```
///
/// Times are GPS seconds. Blank lines and lines starting with `#` are
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleRecord {
  Observation {
    starttime: i64,
    stoptime:  i64,
    projectid: String,
    obsname:   String,
  },
  DataFile {
    observation_num: i64,
    filename:        String,
  },
}

/// How many rows a schedule load wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleLoad {
  pub observations: usize,
  pub data_files:   usize,
}

fn gps_field(field: Option<&str>, line: usize) -> Result<i64, Error> {
  field
    .and_then(|f| f.trim().parse().ok())
    .ok_or(Error::ScheduleLine { line, reason: "expected GPS seconds" })
}

fn text_field(field: Option<&str>, line: usize) -> Result<String, Error> {
  field
    .map(str::trim)
    .filter(|f| !f.is_empty())
    .map(str::to_owned)
    .ok_or(Error::ScheduleLine { line, reason: "missing field" })
}

/// Parse a whole export. Line numbers in errors start at 1.
pub fn parse_schedule(text: &str) -> Result<Vec<ScheduleRecord>, Error> {
  let mut records = Vec::new();
  for (i, raw) in text.lines().enumerate() {
    let line = i + 1;
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') {
      continue;
    }

    let mut fields = raw.splitn(5, ',');
    let record = match fields.next().map(str::trim) {
      Some("observation") => {
        let starttime = gps_field(fields.next(), line)?;
        let stoptime = gps_field(fields.next(), line)?;
        if stoptime <= starttime {
          return Err(Error::ScheduleLine { line, reason: "stoptime must be after starttime" });
        }
        ScheduleRecord::Observation {
          starttime,
          stoptime,
          projectid: text_field(fields.next(), line)?,
          obsname: text_field(fields.next(), line)?,
        }
      }
      Some("file") => {
        let mut rest = raw.splitn(3, ',').skip(1);
        ScheduleRecord::DataFile {
          observation_num: gps_field(rest.next(), line)?,
          filename:        text_field(rest.next(), line)?,
        }
      }
      _ => return Err(Error::ScheduleLine { line, reason: "unknown record kind" }),
    };
    records.push(record);
  }
  Ok(records)
}

/// Parse `text` and write every record into the mirror. Nothing is written
/// if any line fails to parse.
pub async fn load_schedule(
  source: &SqliteObservationSource,
  text: &str,
) -> Result<ScheduleLoad, Error> {
  let records = parse_schedule(text)?;
  let mut load = ScheduleLoad::default();
  for record in records {
    match record {
      ScheduleRecord::Observation { starttime, stoptime, projectid, obsname } => {
        source
          .load_observation(starttime, stoptime, &obsname, &projectid)
          .await
          .map_err(|e| Error::Observations(Box::new(e)))?;
        load.observations += 1;
      }
      ScheduleRecord::DataFile { observation_num, filename } => {
        source
          .load_data_file(observation_num, &filename)
          .await
          .map_err(|e| Error::Observations(Box::new(e)))?;
        load.data_files += 1;
      }
    }
  }
  Ok(load)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn schedule_lines_parse() {
    let text = "\
# exported 2014-08-05
observation,1091000000,1091000112,G0009,high_season1

file,1091000000,1091000000_gpubox01_00.fits
";
    assert_eq!(
      parse_schedule(text).unwrap(),
      vec![
        ScheduleRecord::Observation {
          starttime: 1_091_000_000,
          stoptime:  1_091_000_112,
          projectid: "G0009".into(),
          obsname:   "high_season1".into(),
        },
        ScheduleRecord::DataFile {
          observation_num: 1_091_000_000,
          filename:        "1091000000_gpubox01_00.fits".into(),
        },
      ]
    );
  }

  #[test]
  fn obsname_may_contain_commas() {
    let records = parse_schedule("observation,10,20,G0010,low,ra=0,dec=-27").unwrap();
    assert!(matches!(
      &records[0],
      ScheduleRecord::Observation { obsname, .. } if obsname == "low,ra=0,dec=-27"
    ));
  }

  #[test]
  fn bad_lines_report_their_number() {
    for (text, reason) in [
      ("observation,abc,20,G0009,x", "expected GPS seconds"),
      ("observation,20,10,G0009,x", "stoptime must be after starttime"),
      ("observation,10,20,G0009", "missing field"),
      ("file,10", "missing field"),
      ("calibrator,10,20", "unknown record kind"),
    ] {
      let err = parse_schedule(&format!("# header\n{text}")).unwrap_err();
      assert!(
        matches!(err, Error::ScheduleLine { line: 2, reason: r } if r == reason),
        "{text}: {err}"
      );
    }
  }
}

//! Legacy status endpoints polled by the old monitoring page.
//!
//! | Path | Body |
//! |------|------|
//! | `GET /obsquery` | `text/xml` snapshot of current and last observations |
//! | `GET /next_observation` | Time until the next observation, plain text |
//! | `GET /last_download` | Download-lag sentence, plain text |

use std::io::Cursor;

use axum::{
  Router,
  extract::State,
  http::header,
  response::IntoResponse,
  routing::get,
};
use chrono::{DateTime, Utc};
use eor_core::{
  download::LastDownload,
  observation::{Observation, ObservingStatus, format_wait},
  store::{DashboardStore, ObservationSource},
};
use quick_xml::{
  Writer,
  events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};

use crate::{AppState, error::Error};

pub fn router<S, O>(state: AppState<S, O>) -> Router
where
  S: DashboardStore + Clone + 'static,
  O: ObservationSource + Clone + 'static,
{
  Router::new()
    .route("/obsquery", get(obsquery::<S, O>))
    .route("/next_observation", get(next_observation::<S, O>))
    .route("/last_download", get(last_download::<S, O>))
    .with_state(state)
}

fn observations_error<E: std::error::Error + Send + Sync + 'static>(e: E) -> Error {
  Error::Observations(Box::new(e))
}

// ─── obsquery ─────────────────────────────────────────────────────────────────

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn text_elem(w: &mut Writer<Cursor<Vec<u8>>>, tag: &str, text: &str) -> Result<(), Error> {
  w.write_event(Event::Start(BytesStart::new(tag)))?;
  w.write_event(Event::Text(BytesText::new(text)))?;
  w.write_event(Event::End(BytesEnd::new(tag)))?;
  Ok(())
}

fn observation_elems(w: &mut Writer<Cursor<Vec<u8>>>, obs: &Observation) -> Result<(), Error> {
  text_elem(w, "observation_number", &obs.observation_number.to_string())?;
  text_elem(w, "obsname", &obs.obsname)?;
  text_elem(w, "projectid", &obs.projectid)?;
  text_elem(w, "files", &obs.files.to_string())?;
  text_elem(w, "date", &obs.start_time.format(TIME_FORMAT).to_string())
}

/// Render the `<obsquery>` document. `curobs` always carries `isobs`; a
/// missing previous observation leaves its element empty.
pub fn obsquery_xml(status: &ObservingStatus) -> Result<String, Error> {
  let mut w = Writer::new(Cursor::new(Vec::new()));
  w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
  w.write_event(Event::Start(BytesStart::new("obsquery")))?;

  w.write_event(Event::Start(BytesStart::new("curobs")))?;
  match &status.current {
    Some(obs) => {
      text_elem(&mut w, "isobs", "1")?;
      observation_elems(&mut w, obs)?;
    }
    None => text_elem(&mut w, "isobs", "0")?,
  }
  w.write_event(Event::End(BytesEnd::new("curobs")))?;

  for (i, tag) in ["lastobs1", "lastobs2"].into_iter().enumerate() {
    w.write_event(Event::Start(BytesStart::new(tag)))?;
    if let Some(obs) = status.previous.get(i) {
      observation_elems(&mut w, obs)?;
    }
    w.write_event(Event::End(BytesEnd::new(tag)))?;
  }

  w.write_event(Event::End(BytesEnd::new("obsquery")))?;
  Ok(String::from_utf8_lossy(&w.into_inner().into_inner()).into_owned())
}

/// `GET /legacy/obsquery`
pub async fn obsquery<S, O>(
  State(state): State<AppState<S, O>>,
) -> Result<impl IntoResponse, Error>
where
  S: DashboardStore + Clone + 'static,
  O: ObservationSource + Clone + 'static,
{
  let now = Utc::now();
  let observations = &state.api.observations;
  let status = ObservingStatus {
    current:  observations
      .current_observation(now)
      .await
      .map_err(observations_error)?,
    previous: observations
      .last_observations(now, &state.config.legacy_project, 2)
      .await
      .map_err(observations_error)?,
  };
  Ok(([(header::CONTENT_TYPE, "text/xml")], obsquery_xml(&status)?))
}

// ─── next_observation ─────────────────────────────────────────────────────────

/// The countdown sentence for the next observation of `project`.
pub fn next_observation_text(
  next: Option<&Observation>,
  project: &str,
  now: DateTime<Utc>,
) -> String {
  match next {
    Some(obs) => format!(
      "{} ({})",
      format_wait(obs.start_time - now),
      obs.start_time.format(TIME_FORMAT)
    ),
    None => format!("No {project} Observations Scheduled At this Time."),
  }
}

/// `GET /legacy/next_observation`
pub async fn next_observation<S, O>(
  State(state): State<AppState<S, O>>,
) -> Result<String, Error>
where
  S: DashboardStore + Clone + 'static,
  O: ObservationSource + Clone + 'static,
{
  let now = Utc::now();
  let project = &state.config.legacy_project;
  let next = state
    .api
    .observations
    .next_observation(now, project)
    .await
    .map_err(observations_error)?;
  Ok(next_observation_text(next.as_ref(), project, now))
}

// ─── last_download ────────────────────────────────────────────────────────────

/// `GET /legacy/last_download`
pub async fn last_download<S, O>(
  State(state): State<AppState<S, O>>,
) -> Result<String, Error>
where
  S: DashboardStore + Clone + 'static,
  O: ObservationSource + Clone + 'static,
{
  let offset = state.config.listing_offset()?;
  let listing = state
    .http
    .get(&state.config.file_listing_url)
    .send()
    .await?
    .error_for_status()?
    .text()
    .await?;
  let report = LastDownload::parse(&listing, offset)?;
  tracing::debug!(lag_days = report.lag_days(), "parsed file listing");
  Ok(report.to_string())
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};

  use super::*;

  fn obs(n: i64, name: &str, start: DateTime<Utc>) -> Observation {
    Observation {
      observation_number: n,
      obsname:            name.into(),
      projectid:          "G0009".into(),
      start_time:         start,
      stop_time:          start + Duration::seconds(112),
      files:              24,
    }
  }

  #[test]
  fn obsquery_without_current_observation() {
    let start = Utc.with_ymd_and_hms(2014, 8, 5, 1, 2, 3).unwrap();
    let xml = obsquery_xml(&ObservingStatus {
      current:  None,
      previous: vec![obs(1091322139, "high_1", start)],
    })
    .unwrap();

    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(xml.contains("<curobs><isobs>0</isobs></curobs>"));
    assert!(xml.contains(
      "<lastobs1><observation_number>1091322139</observation_number>\
       <obsname>high_1</obsname><projectid>G0009</projectid><files>24</files>\
       <date>2014-08-05 01:02:03</date></lastobs1>"
    ));
    assert!(xml.contains("<lastobs2></lastobs2>"));
    assert!(xml.ends_with("</obsquery>"));
  }

  #[test]
  fn obsquery_escapes_names() {
    let start = Utc.with_ymd_and_hms(2014, 8, 5, 1, 2, 3).unwrap();
    let xml = obsquery_xml(&ObservingStatus {
      current:  Some(obs(1, "a<b&c", start)),
      previous: vec![],
    })
    .unwrap();
    assert!(xml.contains("<isobs>1</isobs>"));
    assert!(xml.contains("<obsname>a&lt;b&amp;c</obsname>"));
  }

  #[test]
  fn next_observation_sentences() {
    let now = Utc.with_ymd_and_hms(2014, 8, 5, 0, 0, 0).unwrap();
    let next = obs(1, "high_2", now + Duration::hours(36));
    assert_eq!(
      next_observation_text(Some(&next), "G0009", now),
      "1.50 Days (2014-08-06 12:00:00)"
    );
    assert_eq!(
      next_observation_text(None, "G0009", now),
      "No G0009 Observations Scheduled At this Time."
    );
  }
}

use std::sync::Arc;

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
  response::Response,
};
use chrono::{Duration, TimeZone, Utc};
use eor_core::{
  observation::utc_to_gps,
  store::{DashboardStore, ObservationSource},
};
use eor_store_sqlite::{SqliteObservationSource, SqliteStore};
use tower::ServiceExt as _;

use crate::{
  AppState, Error, ServerConfig,
  jobs::{ScheduleLoad, collect_graph_point, load_schedule},
  router,
};

fn config(file_listing_url: &str) -> ServerConfig {
  ServerConfig {
    host:                       "127.0.0.1".into(),
    port:                       0,
    store_path:                 ":memory:".into(),
    observation_db_path:        ":memory:".into(),
    beam_image_dir:             std::env::temp_dir(),
    projects:                   vec!["G0009".into(), "G0010".into()],
    legacy_project:             "G0009".into(),
    file_listing_url:           file_listing_url.into(),
    listing_utc_offset_minutes: -300,
    observation_cache_secs:     600,
  }
}

async fn state(file_listing_url: &str) -> AppState<SqliteStore, SqliteObservationSource> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let observations =
    SqliteObservationSource::open_in_memory(vec!["G0009".into(), "G0010".into()])
      .await
      .unwrap();

  let now = utc_to_gps(Utc::now());
  let hour = Duration::hours(1).num_seconds();
  observations.load_observation(now - 3 * hour, now - 3 * hour + 120, "high_1", "G0009").await.unwrap();
  observations.load_observation(now - 2 * hour, now - 2 * hour + 120, "high_2", "G0009").await.unwrap();
  observations.load_observation(now - hour, now - hour + 120, "other", "C001").await.unwrap();
  observations.load_observation(now - 60, now + 60, "low_1", "G0010").await.unwrap();
  observations.load_observation(now + 30 * hour, now + 30 * hour + 120, "high_3", "G0009").await.unwrap();
  for i in 0..3 {
    observations.load_data_file(now - 2 * hour, &format!("{i}.fits")).await.unwrap();
  }

  AppState::new(Arc::new(store), Arc::new(observations), config(file_listing_url))
}

async fn get(state: AppState<SqliteStore, SqliteObservationSource>, uri: &str) -> Response {
  router(state)
    .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
    .await
    .unwrap()
}

async fn text_body(resp: Response) -> String {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn obsquery_reports_current_and_last_two() {
  let resp = get(state("http://127.0.0.1:9/").await, "/legacy/obsquery").await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/xml");

  let xml = text_body(resp).await;
  assert!(xml.contains("<curobs><isobs>1</isobs>"));
  assert!(xml.contains("<obsname>low_1</obsname>"));

  let last1 = xml.find("<lastobs1>").unwrap();
  let last2 = xml.find("<lastobs2>").unwrap();
  assert!(xml[last1..last2].contains("<obsname>high_2</obsname><projectid>G0009</projectid><files>3</files>"));
  assert!(xml[last2..].contains("<obsname>high_1</obsname>"));
  assert!(!xml.contains("other"));
}

#[tokio::test]
async fn next_observation_counts_down_to_legacy_project() {
  let resp = get(state("http://127.0.0.1:9/").await, "/legacy/next_observation").await;
  assert_eq!(resp.status(), StatusCode::OK);
  let text = text_body(resp).await;
  assert!(text.ends_with(')'), "{text}");
  assert!(text.contains(" Days ("), "{text}");
}

#[tokio::test]
async fn last_download_unreachable_listing_is_bad_gateway() {
  let resp = get(state("http://127.0.0.1:9/").await, "/legacy/last_download").await;
  assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
  assert!(text_body(resp).await.starts_with("could not fetch file listing"));
}

#[tokio::test]
async fn api_is_mounted_under_prefix() {
  let resp = get(state("http://127.0.0.1:9/").await, "/api/observation_logs").await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// ─── Batch jobs ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn loaded_schedule_feeds_graph_collection() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let observations = SqliteObservationSource::open_in_memory(vec!["G0009".into()])
    .await
    .unwrap();
  let now = Utc.with_ymd_and_hms(2014, 8, 5, 12, 0, 0).unwrap();
  let gps = utc_to_gps(now);

  let export = format!(
    "observation,{a},{a_end},G0009,high_1\n\
     observation,{b},{b_end},G0009,high_2\n\
     observation,{c},{c_end},C001,cal\n\
     file,{a},{a}_gpubox01_00.fits\n\
     file,{a},{a}_gpubox02_00.fits\n",
    a = gps - 7200,
    a_end = gps - 5400,
    b = gps + 1800,
    b_end = gps + 3600,
    c = gps - 600,
    c_end = gps + 600,
  );
  let load = load_schedule(&observations, &export).await.unwrap();
  assert_eq!(load, ScheduleLoad { observations: 3, data_files: 2 });
  assert_eq!(observations.project_observations().await.unwrap().len(), 2);

  let point = collect_graph_point(&store, &observations, now).await.unwrap();
  assert_eq!(point.hours_scheduled, 1.0);
  assert_eq!(point.hours_observed, 0.5);
  assert_eq!(point.hours_with_data, 0.5);
  let stored = store.list_graph_points(None).await.unwrap();
  assert_eq!(stored.len(), 1);
  assert_eq!(stored[0].id, point.id);
  assert_eq!(stored[0].hours_with_data, 0.5);
}

#[tokio::test]
async fn bad_schedule_writes_nothing() {
  let observations = SqliteObservationSource::open_in_memory(vec!["G0009".into()])
    .await
    .unwrap();
  let export = "observation,100,200,G0009,ok\nobservation,300,nope,G0009,bad\n";

  let err = load_schedule(&observations, export).await.unwrap_err();
  assert!(matches!(err, Error::ScheduleLine { line: 2, .. }));
  assert!(observations.project_observations().await.unwrap().is_empty());
}

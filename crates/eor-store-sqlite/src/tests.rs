//! Integration tests for the SQLite backends against in-memory databases.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use eor_core::{
  graph::NewGraphPoint,
  log::{LogQuery, NewLog},
  observation::utc_to_gps,
  store::{DashboardStore, ObservationSource},
  tag::{Tag, TagMask},
  user::{NewUser, ProfileUpdate, User},
};

use crate::{Error, SqliteObservationSource, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn user(s: &SqliteStore, username: &str) -> User {
  s.create_user(
    NewUser {
      username:    username.into(),
      name:        format!("{username} name"),
      email:       format!("{username}@example.org"),
      admin_level: 0,
    },
    "$argon2id$stub".into(),
  )
  .await
  .unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

fn new_log(d: NaiveDate, tags: TagMask) -> NewLog {
  NewLog::new(d, format!("note for {d}"), tags).unwrap()
}

fn core_error(e: Error) -> eor_core::Error {
  match e {
    Error::Core(inner) => inner,
    other => panic!("expected a core error, got {other:?}"),
  }
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_user() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  assert!(alice.is_active());
  assert_eq!(alice.admin_level, 0);

  let fetched = s.get_user(alice.id).await.unwrap().unwrap();
  assert_eq!(fetched, alice);
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
  let s = store().await;
  user(&s, "alice").await;

  let err = s
    .create_user(
      NewUser {
        username:    "alice".into(),
        name:        "Other".into(),
        email:       "other@example.org".into(),
        admin_level: 0,
      },
      "hash".into(),
    )
    .await
    .unwrap_err();
  assert_eq!(core_error(err), eor_core::Error::UsernameTaken("alice".into()));
}

#[tokio::test]
async fn credentials_return_hash() {
  let s = store().await;
  let alice = user(&s, "alice").await;

  let (found, hash) = s.get_credentials("alice").await.unwrap().unwrap();
  assert_eq!(found.id, alice.id);
  assert_eq!(hash, "$argon2id$stub");
  assert!(s.get_credentials("nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn deactivation_round_trips() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let at = Utc.with_ymd_and_hms(2014, 8, 5, 6, 32, 0).unwrap();

  let off = s.set_deactivated_date(alice.id, Some(at)).await.unwrap();
  assert_eq!(off.deactivated_date, Some(at));

  let on = s.set_deactivated_date(alice.id, None).await.unwrap();
  assert!(on.is_active());
}

#[tokio::test]
async fn deactivating_missing_user_is_not_found() {
  let s = store().await;
  let err = s.set_deactivated_date(42, None).await.unwrap_err();
  assert_eq!(core_error(err), eor_core::Error::UserNotFound(42));
}

#[tokio::test]
async fn profile_update_keeps_absent_fields() {
  let s = store().await;
  let alice = user(&s, "alice").await;

  let updated = s
    .update_profile(
      alice.id,
      ProfileUpdate { name: Some("Alice L".into()), ..Default::default() },
      Some("new-hash".into()),
    )
    .await
    .unwrap();
  assert_eq!(updated.name, "Alice L");
  assert_eq!(updated.email, alice.email);

  let (_, hash) = s.get_credentials("alice").await.unwrap().unwrap();
  assert_eq!(hash, "new-hash");
}

#[tokio::test]
async fn admin_level_and_password_by_username() {
  let s = store().await;
  user(&s, "alice").await;

  let admin = s.set_admin_level("alice", 2).await.unwrap();
  assert!(admin.is_admin());

  s.set_password_hash("alice", "reset".into()).await.unwrap();
  let (_, hash) = s.get_credentials("alice").await.unwrap().unwrap();
  assert_eq!(hash, "reset");

  let err = s.set_admin_level("nobody", 1).await.unwrap_err();
  assert_eq!(
    core_error(err),
    eor_core::Error::UsernameNotFound("nobody".into())
  );
}

#[tokio::test]
async fn users_list_in_id_order() {
  let s = store().await;
  let a = user(&s, "alice").await;
  let b = user(&s, "bob").await;

  let ids: Vec<_> = s.list_users().await.unwrap().iter().map(|u| u.id).collect();
  assert_eq!(ids, vec![a.id, b.id]);
}

// ─── Observation logs ────────────────────────────────────────────────────────

#[tokio::test]
async fn create_log_joins_author_name() {
  let s = store().await;
  let alice = user(&s, "alice").await;

  let tags = TagMask::from_iter([Tag::Fine, Tag::HardwareIssue]);
  let entry = s
    .create_log(alice.id, new_log(date(2014, 8, 4), tags))
    .await
    .unwrap();

  assert_eq!(entry.author_user_id, alice.id);
  assert_eq!(entry.author_user_name, "alice name");
  assert_eq!(entry.tags.bits(), 10);
  assert_eq!(entry.observed_date, date(2014, 8, 4));

  let fetched = s.get_log(entry.id).await.unwrap().unwrap();
  assert_eq!(fetched, entry);
}

#[tokio::test]
async fn update_log_replaces_fields() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let entry = s
    .create_log(alice.id, new_log(date(2014, 8, 4), Tag::Fine.into()))
    .await
    .unwrap();

  let updated = s
    .update_log(entry.id, NewLog::new(date(2014, 8, 5), "rerun".into(), Tag::Bad.into()).unwrap())
    .await
    .unwrap();

  assert_eq!(updated.id, entry.id);
  assert_eq!(updated.created_date, entry.created_date);
  assert_eq!(updated.observed_date, date(2014, 8, 5));
  assert_eq!(updated.note, "rerun");
  assert_eq!(updated.tags, TagMask::from(Tag::Bad));
}

#[tokio::test]
async fn update_missing_log_is_not_found() {
  let s = store().await;
  let err = s
    .update_log(7, new_log(date(2014, 8, 5), Tag::Bad.into()))
    .await
    .unwrap_err();
  assert_eq!(core_error(err), eor_core::Error::LogNotFound(7));
}

#[tokio::test]
async fn delete_is_permanent() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let entry = s
    .create_log(alice.id, new_log(date(2014, 8, 4), Tag::Fine.into()))
    .await
    .unwrap();

  assert!(s.delete_log(entry.id).await.unwrap());
  assert!(s.get_log(entry.id).await.unwrap().is_none());
  assert!(!s.delete_log(entry.id).await.unwrap());
}

/// Twenty-five entries, one per day from 2014-08-01, all authored by one
/// user. Odd days are tagged `fine`, even days `bad`.
async fn seeded() -> SqliteStore {
  let s = store().await;
  let alice = user(&s, "alice").await;
  for day in 1..=25 {
    let tag = if day % 2 == 1 { Tag::Fine } else { Tag::Bad };
    s.create_log(alice.id, new_log(date(2014, 8, day), tag.into()))
      .await
      .unwrap();
  }
  s
}

#[tokio::test]
async fn pages_are_disjoint_and_newest_first() {
  let s = seeded().await;

  let first = s
    .list_logs(&LogQuery { limit: 10, offset: 0, ..Default::default() })
    .await
    .unwrap();
  let second = s
    .list_logs(&LogQuery { limit: 10, offset: 10, ..Default::default() })
    .await
    .unwrap();
  let third = s
    .list_logs(&LogQuery { limit: 10, offset: 20, ..Default::default() })
    .await
    .unwrap();

  assert_eq!(first.len(), 10);
  assert_eq!(second.len(), 10);
  assert_eq!(third.len(), 5);

  let dates: Vec<_> = first
    .iter()
    .chain(&second)
    .chain(&third)
    .map(|e| e.observed_date)
    .collect();
  let expected: Vec<_> = (1..=25).rev().map(|d| date(2014, 8, d)).collect();
  assert_eq!(dates, expected);
}

#[tokio::test]
async fn same_day_entries_break_ties_by_newest_id() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let a = s
    .create_log(alice.id, new_log(date(2014, 8, 4), Tag::Fine.into()))
    .await
    .unwrap();
  let b = s
    .create_log(alice.id, new_log(date(2014, 8, 4), Tag::Bad.into()))
    .await
    .unwrap();

  let ids: Vec<_> = s
    .list_logs(&LogQuery::default())
    .await
    .unwrap()
    .iter()
    .map(|e| e.id)
    .collect();
  assert_eq!(ids, vec![b.id, a.id]);
}

#[tokio::test]
async fn tag_filter_matches_any_bit() {
  let s = seeded().await;

  let all = s
    .list_logs(&LogQuery { limit: 100, ..Default::default() })
    .await
    .unwrap();
  assert_eq!(all.len(), 25);

  let bad = s
    .list_logs(&LogQuery { tags: Tag::Bad.into(), limit: 100, ..Default::default() })
    .await
    .unwrap();
  assert_eq!(bad.len(), 12);
  assert!(bad.iter().all(|e| e.tags.contains(Tag::Bad)));

  let either = s
    .list_logs(&LogQuery {
      tags: TagMask::from_iter([Tag::Bad, Tag::Fine]),
      limit: 100,
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(either.len(), 25);

  let none = s
    .list_logs(&LogQuery { tags: Tag::NoData.into(), limit: 100, ..Default::default() })
    .await
    .unwrap();
  assert!(none.is_empty());
}

#[tokio::test]
async fn date_range_is_inclusive() {
  let s = seeded().await;
  let query = LogQuery::from_params(None, Some("2014-08-03"), Some("2014-08-06"), Some(100), None)
    .unwrap();

  let dates: Vec<_> = s
    .list_logs(&query)
    .await
    .unwrap()
    .iter()
    .map(|e| e.observed_date)
    .collect();
  assert_eq!(
    dates,
    vec![date(2014, 8, 6), date(2014, 8, 5), date(2014, 8, 4), date(2014, 8, 3)]
  );
}

#[tokio::test]
async fn latest_log_is_newest_observed() {
  let s = store().await;
  assert!(s.latest_log().await.unwrap().is_none());

  let s = seeded().await;
  let latest = s.latest_log().await.unwrap().unwrap();
  assert_eq!(latest.observed_date, date(2014, 8, 25));
}

// ─── Graph data ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn graph_points_filter_by_window() {
  let s = store().await;
  let base = Utc.with_ymd_and_hms(2014, 1, 15, 0, 0, 0).unwrap();
  for month in 0..6 {
    s.record_graph_point_at(
      NewGraphPoint { hours_scheduled: f64::from(month), ..Default::default() },
      base + Duration::days(30 * i64::from(month)),
    )
    .await
    .unwrap();
  }

  assert_eq!(s.list_graph_points(None).await.unwrap().len(), 6);

  let since = base + Duration::days(90);
  let recent = s.list_graph_points(Some(since)).await.unwrap();
  let scheduled: Vec<_> = recent.iter().map(|p| p.hours_scheduled).collect();
  assert_eq!(scheduled, vec![3.0, 4.0, 5.0]);
}

// ─── Observations ────────────────────────────────────────────────────────────

async fn observations() -> (SqliteObservationSource, chrono::DateTime<Utc>) {
  let src = SqliteObservationSource::open_in_memory(vec!["G0009".into(), "G0010".into()])
    .await
    .expect("in-memory observation source");
  let now = Utc.with_ymd_and_hms(2014, 8, 5, 12, 0, 0).unwrap();
  let gps = utc_to_gps(now);

  // Finished G0009 observations, oldest first.
  src.load_observation(gps - 3000, gps - 2888, "high_1", "G0009").await.unwrap();
  src.load_observation(gps - 2000, gps - 1888, "high_2", "G0009").await.unwrap();
  src.load_observation(gps - 1000, gps - 888, "low_1", "G0010").await.unwrap();
  // A calibrator from another project, running now.
  src.load_observation(gps - 50, gps + 62, "cal", "C001").await.unwrap();
  // Scheduled.
  src.load_observation(gps + 3600, gps + 3712, "high_3", "G0009").await.unwrap();
  src.load_observation(gps + 3 * 86_400, gps + 3 * 86_400 + 112, "high_4", "G0009")
    .await
    .unwrap();
  src.load_observation(gps + 7200, gps + 7312, "other", "D0001").await.unwrap();

  for file in 0..3 {
    src
      .load_data_file(gps - 2000, &format!("{}_gpubox{file:02}.fits", gps - 2000))
      .await
      .unwrap();
  }

  (src, now)
}

#[tokio::test]
async fn recent_observations_are_ours_newest_first_with_file_counts() {
  let (src, now) = observations().await;
  let recent = src.recent_observations(now, 5).await.unwrap();

  let names: Vec<_> = recent.iter().map(|o| o.obsname.as_str()).collect();
  assert_eq!(names, vec!["low_1", "high_2", "high_1"]);
  assert_eq!(recent[1].files, 3);
  assert_eq!(recent[0].files, 0);
}

#[tokio::test]
async fn future_counts_split_next_day() {
  let (src, now) = observations().await;
  let counts = src.future_observation_counts(now).await.unwrap();
  assert_eq!(counts.total, 2);
  assert_eq!(counts.next_24, 1);
}

#[tokio::test]
async fn current_observation_ignores_project() {
  let (src, now) = observations().await;
  let current = src.current_observation(now).await.unwrap().unwrap();
  assert_eq!(current.obsname, "cal");
  assert!(current.is_running_at(now));
}

#[tokio::test]
async fn last_and_next_for_one_project() {
  let (src, now) = observations().await;

  let last = src.last_observations(now, "G0009", 2).await.unwrap();
  let names: Vec<_> = last.iter().map(|o| o.obsname.as_str()).collect();
  assert_eq!(names, vec!["high_2", "high_1"]);

  let next = src.next_observation(now, "G0009").await.unwrap().unwrap();
  assert_eq!(next.obsname, "high_3");
  assert_eq!(next.start_time, now + Duration::hours(1));

  assert!(src.next_observation(now, "G9999").await.unwrap().is_none());
}

#[tokio::test]
async fn project_observations_span_past_and_future() {
  let (src, now) = observations().await;
  let all = src.project_observations().await.unwrap();

  let names: Vec<_> = all.iter().map(|o| o.obsname.as_str()).collect();
  assert_eq!(names, vec!["high_1", "high_2", "low_1", "high_3", "high_4"]);
  assert_eq!(all[1].files, 3);

  let point = NewGraphPoint::from_schedule(&all, now);
  assert!(point.hours_scheduled > point.hours_observed);
  assert_eq!(point.hours_with_data, 112.0 / 3600.0);
}

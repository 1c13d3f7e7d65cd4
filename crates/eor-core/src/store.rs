//! Storage traits.
//!
//! [`DashboardStore`] owns the data this service writes (logs, users, chart
//! samples). [`ObservationSource`] is a read-only view of the telescope's
//! schedule, which lives in a database this service never writes to.
//!
//! Higher layers (`eor-api`, `eor-server`) depend on these abstractions, not
//! on any concrete backend. All methods return `Send` futures so the traits
//! can be used from a multi-threaded tokio runtime.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  graph::{GraphPoint, NewGraphPoint},
  log::{LogId, LogQuery, NewLog, ObservationLog},
  observation::{FutureObservationCounts, Observation},
  user::{NewUser, ProfileUpdate, User, UserId},
};

// ─── Dashboard store ─────────────────────────────────────────────────────────

pub trait DashboardStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Observation logs ──────────────────────────────────────────────────

  /// Persist a new entry and return it with server-assigned fields filled.
  fn create_log(
    &self,
    author: UserId,
    log: NewLog,
  ) -> impl Future<Output = Result<ObservationLog, Self::Error>> + Send + '_;

  /// Returns `None` if no entry has this id.
  fn get_log(
    &self,
    id: LogId,
  ) -> impl Future<Output = Result<Option<ObservationLog>, Self::Error>> + Send + '_;

  /// Replace the editable fields of an entry. Errors if it does not exist.
  fn update_log(
    &self,
    id: LogId,
    log: NewLog,
  ) -> impl Future<Output = Result<ObservationLog, Self::Error>> + Send + '_;

  /// Permanently remove an entry. Returns `false` if it did not exist.
  fn delete_log(
    &self,
    id: LogId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// One page of entries, newest `observed_date` first.
  fn list_logs<'a>(
    &'a self,
    query: &'a LogQuery,
  ) -> impl Future<Output = Result<Vec<ObservationLog>, Self::Error>> + Send + 'a;

  /// The newest entry, if any.
  fn latest_log(
    &self,
  ) -> impl Future<Output = Result<Option<ObservationLog>, Self::Error>> + Send + '_;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Persist a user with an already-hashed password. A duplicate username
  /// is reported as [`crate::Error::UsernameTaken`].
  fn create_user(
    &self,
    user: NewUser,
    password_hash: String,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// The user and their stored password hash, for login.
  fn get_credentials<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<(User, String)>, Self::Error>> + Send + 'a;

  /// Every user, ordered by id.
  fn list_users(
    &self,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  /// Write the activation state computed by [`User::transition`].
  fn set_deactivated_date(
    &self,
    id: UserId,
    deactivated_date: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Apply a self-service profile change. `password_hash` replaces the
  /// stored hash when present.
  fn update_profile(
    &self,
    id: UserId,
    update: ProfileUpdate,
    password_hash: Option<String>,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn set_password_hash<'a>(
    &'a self,
    username: &'a str,
    password_hash: String,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + 'a;

  fn set_admin_level<'a>(
    &'a self,
    username: &'a str,
    admin_level: i32,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + 'a;

  // ── Chart samples ─────────────────────────────────────────────────────

  fn record_graph_point(
    &self,
    point: NewGraphPoint,
  ) -> impl Future<Output = Result<GraphPoint, Self::Error>> + Send + '_;

  /// Samples in `created_date` order, optionally only those at or after
  /// `since`.
  fn list_graph_points(
    &self,
    since: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<Vec<GraphPoint>, Self::Error>> + Send + '_;
}

// ─── Observation source ──────────────────────────────────────────────────────

/// Read-only access to the telescope schedule and its archived data files.
///
/// Every method takes `now` explicitly; the telescope database's own clock
/// is never consulted.
pub trait ObservationSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Observations of the monitored projects that have started, newest first.
  fn recent_observations(
    &self,
    now: DateTime<Utc>,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Observation>, Self::Error>> + Send + '_;

  /// Counts of monitored-project observations scheduled after `now`.
  fn future_observation_counts(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<FutureObservationCounts, Self::Error>> + Send + '_;

  /// The observation (of any project) running at `now`.
  fn current_observation(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Observation>, Self::Error>> + Send + '_;

  /// Up to `limit` finished observations of `project`, newest first.
  fn last_observations<'a>(
    &'a self,
    now: DateTime<Utc>,
    project: &'a str,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Observation>, Self::Error>> + Send + 'a;

  /// Every observation of the monitored projects, past and scheduled,
  /// oldest first.
  fn project_observations(
    &self,
  ) -> impl Future<Output = Result<Vec<Observation>, Self::Error>> + Send + '_;

  /// The first observation of `project` starting after `now`.
  fn next_observation<'a>(
    &'a self,
    now: DateTime<Utc>,
    project: &'a str,
  ) -> impl Future<Output = Result<Option<Observation>, Self::Error>> + Send + 'a;
}

//! JSON REST API for the EoR status service.
//!
//! Exposes an axum [`Router`] backed by any [`DashboardStore`] and
//! [`ObservationSource`]. TLS and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", eor_api::api_router(state.clone()))
//! ```

pub mod account;
pub mod auth;
pub mod beam_images;
pub mod cache;
pub mod error;
pub mod graph_data;
pub mod mit_data;
pub mod observation_logs;
pub mod session;
pub mod users;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Router,
  routing::{get, post},
};
use eor_core::{
  observation::{FutureObservationCounts, Observation},
  store::{DashboardStore, ObservationSource},
};

use cache::Cached;
pub use error::ApiError;
use session::SessionStore;

/// How many started observations `GET /mit_data/observations` lists.
pub const RECENT_OBSERVATION_LIMIT: usize = 5;

/// Settings the API needs beyond its backends.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  /// Directory scanned by `GET /beam_images`.
  pub beam_image_dir:    PathBuf,
  /// How long observation responses are served from memory.
  pub observation_cache: Duration,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      beam_image_dir:    PathBuf::from("/var/beam_images"),
      observation_cache: Duration::from_secs(600),
    }
  }
}

/// Shared state threaded through all API handlers.
#[derive(Clone)]
pub struct ApiState<S, O> {
  pub store:        Arc<S>,
  pub observations: Arc<O>,
  pub sessions:     Arc<SessionStore>,
  pub config:       Arc<ApiConfig>,
  recent_cache:     Arc<Cached<Vec<Observation>>>,
  future_cache:     Arc<Cached<FutureObservationCounts>>,
}

impl<S, O> ApiState<S, O>
where
  S: DashboardStore,
  O: ObservationSource,
{
  pub fn new(store: Arc<S>, observations: Arc<O>, config: ApiConfig) -> Self {
    Self {
      store,
      observations,
      sessions: Arc::new(SessionStore::default()),
      recent_cache: Arc::new(Cached::new(config.observation_cache)),
      future_cache: Arc::new(Cached::new(config.observation_cache)),
      config: Arc::new(config),
    }
  }
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, O>(state: ApiState<S, O>) -> Router<()>
where
  S: DashboardStore + Clone + 'static,
  O: ObservationSource + Clone + 'static,
{
  Router::new()
    // Observation logs
    .route(
      "/observation_logs",
      get(observation_logs::list::<S, O>).post(observation_logs::create::<S, O>),
    )
    .route("/observation_logs/latest", get(observation_logs::latest::<S, O>))
    .route(
      "/observation_logs/{id}",
      axum::routing::put(observation_logs::update::<S, O>)
        .delete(observation_logs::delete_one::<S, O>),
    )
    // Users
    .route("/users", get(users::list::<S, O>).post(users::create::<S, O>))
    .route("/users/{id}", get(users::get_one::<S, O>).put(users::update::<S, O>))
    // Session and self-service
    .route(
      "/current_user",
      get(account::current_user::<S, O>)
        .post(account::update_current_user::<S, O>)
        .put(account::update_current_user::<S, O>),
    )
    .route("/login", post(account::login::<S, O>))
    .route("/logout", get(account::logout::<S, O>).post(account::logout::<S, O>))
    // Telescope data
    .route("/mit_data/observations", get(mit_data::observations::<S, O>))
    .route(
      "/mit_data/future_observation_counts",
      get(mit_data::future_observation_counts::<S, O>),
    )
    .route("/graph_data", get(graph_data::list::<S, O>))
    .route("/beam_images", get(beam_images::list::<S, O>))
    .with_state(state)
}

//! HTTP server for the EoR status service.
//!
//! Mounts the JSON API from `eor-api` under `/api` and serves the legacy
//! plain-text and XML status endpoints under `/legacy`.

pub mod error;
pub mod jobs;
pub mod legacy;

pub use error::Error;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::Router;
use chrono::FixedOffset;
use eor_api::{ApiConfig, ApiState, api_router};
use eor_core::store::{DashboardStore, ObservationSource};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 5000 }
fn default_projects() -> Vec<String> { vec!["G0009".into(), "G0010".into()] }
fn default_legacy_project() -> String { "G0009".into() }
fn default_listing_url() -> String {
  "http://eor-02.mit.edu:7777/QUERY?query=files_list_recent&format=list".into()
}
fn default_listing_offset() -> i32 { -300 }
fn default_cache_secs() -> u64 { 600 }

/// Runtime server configuration, deserialised from `config.toml` and
/// `EOR_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                       String,
  #[serde(default = "default_port")]
  pub port:                       u16,
  /// The dashboard's own database (users, logs, chart samples).
  pub store_path:                 PathBuf,
  /// Local mirror of the telescope schedule.
  pub observation_db_path:        PathBuf,
  pub beam_image_dir:             PathBuf,
  /// Projects listed by the recent and future observation endpoints.
  #[serde(default = "default_projects")]
  pub projects:                   Vec<String>,
  /// Project reported by the legacy endpoints.
  #[serde(default = "default_legacy_project")]
  pub legacy_project:             String,
  #[serde(default = "default_listing_url")]
  pub file_listing_url:           String,
  /// UTC offset of the timestamps in the file listing.
  #[serde(default = "default_listing_offset")]
  pub listing_utc_offset_minutes: i32,
  #[serde(default = "default_cache_secs")]
  pub observation_cache_secs:     u64,
}

impl ServerConfig {
  pub fn listing_offset(&self) -> Result<FixedOffset, Error> {
    FixedOffset::east_opt(self.listing_utc_offset_minutes * 60)
      .ok_or(Error::InvalidOffset(self.listing_utc_offset_minutes))
  }

  pub fn api_config(&self) -> ApiConfig {
    ApiConfig {
      beam_image_dir:    self.beam_image_dir.clone(),
      observation_cache: Duration::from_secs(self.observation_cache_secs),
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S, O> {
  pub api:    ApiState<S, O>,
  pub config: Arc<ServerConfig>,
  pub http:   reqwest::Client,
}

impl<S, O> AppState<S, O>
where
  S: DashboardStore,
  O: ObservationSource,
{
  pub fn new(store: Arc<S>, observations: Arc<O>, config: ServerConfig) -> Self {
    Self {
      api: ApiState::new(store, observations, config.api_config()),
      config: Arc::new(config),
      http: reqwest::Client::new(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the complete application router.
pub fn router<S, O>(state: AppState<S, O>) -> Router
where
  S: DashboardStore + Clone + 'static,
  O: ObservationSource + Clone + 'static,
{
  Router::new()
    .nest("/api", api_router(state.api.clone()))
    .nest("/legacy", legacy::router(state))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests;

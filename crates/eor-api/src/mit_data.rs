//! Handlers for `/mit_data` endpoints: the telescope schedule as seen from
//! the dashboard.
//!
//! Both responses are cached in memory for
//! [`ApiConfig::observation_cache`](crate::ApiConfig::observation_cache).
//! No authentication is required.

use axum::{Json, extract::State};
use chrono::Utc;
use eor_core::{
  observation::{FutureObservationCounts, Observation},
  store::{DashboardStore, ObservationSource},
};
use serde::{Deserialize, Serialize};

use crate::{ApiState, RECENT_OBSERVATION_LIMIT, error::ApiError};

#[derive(Debug, Serialize, Deserialize)]
pub struct ObservationList {
  pub observations: Vec<Observation>,
}

/// `GET /mit_data/observations`: the most recent monitored observations
/// that have started, newest first.
pub async fn observations<S, O>(
  State(state): State<ApiState<S, O>>,
) -> Result<Json<ObservationList>, ApiError>
where
  S: DashboardStore + Clone + 'static,
  O: ObservationSource + Clone + 'static,
{
  let observations = state
    .recent_cache
    .get_or_refresh(|| {
      state
        .observations
        .recent_observations(Utc::now(), RECENT_OBSERVATION_LIMIT)
    })
    .await
    .map_err(ApiError::store)?;
  Ok(Json(ObservationList { observations }))
}

/// `GET /mit_data/future_observation_counts`
pub async fn future_observation_counts<S, O>(
  State(state): State<ApiState<S, O>>,
) -> Result<Json<FutureObservationCounts>, ApiError>
where
  S: DashboardStore + Clone + 'static,
  O: ObservationSource + Clone + 'static,
{
  let counts = state
    .future_cache
    .get_or_refresh(|| state.observations.future_observation_counts(Utc::now()))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(counts))
}

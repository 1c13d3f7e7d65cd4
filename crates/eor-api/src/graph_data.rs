//! Handler for `GET /graph_data`.

use axum::{
  Json,
  extract::{Query, State},
};
use chrono::Utc;
use eor_core::{
  graph::{GraphPoint, window_start},
  store::{DashboardStore, ObservationSource},
};
use serde::{Deserialize, Serialize};

use crate::{ApiState, auth::CurrentUser, error::ApiError};

#[derive(Debug, Default, Deserialize)]
pub struct GraphParams {
  /// Only samples from the last N months; all samples when absent.
  pub last_x_months: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GraphData {
  pub graph_data: Vec<GraphPoint>,
}

/// `GET /graph_data[?last_x_months=N]`: oldest first, every series rounded
/// to four decimal places.
pub async fn list<S, O>(
  State(state): State<ApiState<S, O>>,
  CurrentUser(_): CurrentUser,
  Query(params): Query<GraphParams>,
) -> Result<Json<GraphData>, ApiError>
where
  S: DashboardStore + Clone + 'static,
  O: ObservationSource + Clone + 'static,
{
  let since = params.last_x_months.map(|m| window_start(Utc::now(), m));
  let graph_data = state
    .store
    .list_graph_points(since)
    .await
    .map_err(ApiError::store)?
    .into_iter()
    .map(GraphPoint::rounded)
    .collect();
  Ok(Json(GraphData { graph_data }))
}

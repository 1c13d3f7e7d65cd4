//! Handlers for `/observation_logs` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/observation_logs` | `?tags=&limit=&offset=&from_date=&to_date=` |
//! | `POST`   | `/observation_logs` | Body: `{"observed_date":"2014-08-04","tags":10,"note":"..."}` |
//! | `GET`    | `/observation_logs/latest` | `null` when there are no entries |
//! | `PUT`    | `/observation_logs/{id}` | Partial body; author or admin only |
//! | `DELETE` | `/observation_logs/{id}` | Author or admin only |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use eor_core::{
  log::{LogDraft, LogId, LogPatch, LogQuery, ObservationLog},
  store::{DashboardStore, ObservationSource},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{ApiState, auth::CurrentUser, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub tags:      Option<u32>,
  pub limit:     Option<u32>,
  pub offset:    Option<u32>,
  pub from_date: Option<String>,
  pub to_date:   Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogList {
  pub observation_logs: Vec<ObservationLog>,
}

/// `GET /observation_logs`
pub async fn list<S, O>(
  State(state): State<ApiState<S, O>>,
  CurrentUser(_): CurrentUser,
  Query(params): Query<ListParams>,
) -> Result<Json<LogList>, ApiError>
where
  S: DashboardStore + Clone + 'static,
  O: ObservationSource + Clone + 'static,
{
  let query = LogQuery::from_params(
    params.tags,
    params.from_date.as_deref(),
    params.to_date.as_deref(),
    params.limit,
    params.offset,
  )?;
  let observation_logs = state.store.list_logs(&query).await.map_err(ApiError::store)?;
  Ok(Json(LogList { observation_logs }))
}

// ─── Latest ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct LatestLog {
  pub observation_log: Option<ObservationLog>,
}

/// `GET /observation_logs/latest`
pub async fn latest<S, O>(
  State(state): State<ApiState<S, O>>,
  CurrentUser(_): CurrentUser,
) -> Result<Json<LatestLog>, ApiError>
where
  S: DashboardStore + Clone + 'static,
  O: ObservationSource + Clone + 'static,
{
  let observation_log = state.store.latest_log().await.map_err(ApiError::store)?;
  Ok(Json(LatestLog { observation_log }))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /observation_logs`
pub async fn create<S, O>(
  State(state): State<ApiState<S, O>>,
  CurrentUser(user): CurrentUser,
  Json(body): Json<LogDraft>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DashboardStore + Clone + 'static,
  O: ObservationSource + Clone + 'static,
{
  let new_log = body.validate()?;
  let entry = state
    .store
    .create_log(user.id, new_log)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(id = entry.id, author = %user.username, tags = %entry.tags, "observation log created");
  Ok((StatusCode::CREATED, Json(entry)))
}

// ─── Update ───────────────────────────────────────────────────────────────────

async fn fetch_modifiable<S: DashboardStore>(
  store: &S,
  id: LogId,
  user: &eor_core::user::User,
) -> Result<ObservationLog, ApiError> {
  let entry = store
    .get_log(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("observation log {id} not found")))?;
  entry.authorize_modify(user)?;
  Ok(entry)
}

/// `PUT /observation_logs/{id}`
pub async fn update<S, O>(
  State(state): State<ApiState<S, O>>,
  CurrentUser(user): CurrentUser,
  Path(id): Path<LogId>,
  Json(patch): Json<LogPatch>,
) -> Result<Json<ObservationLog>, ApiError>
where
  S: DashboardStore + Clone + 'static,
  O: ObservationSource + Clone + 'static,
{
  let current = fetch_modifiable(state.store.as_ref(), id, &user).await?;
  let replacement = patch.apply(&current)?;
  let entry = state
    .store
    .update_log(id, replacement)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(id, editor = %user.username, "observation log updated");
  Ok(Json(entry))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /observation_logs/{id}`
pub async fn delete_one<S, O>(
  State(state): State<ApiState<S, O>>,
  CurrentUser(user): CurrentUser,
  Path(id): Path<LogId>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: DashboardStore + Clone + 'static,
  O: ObservationSource + Clone + 'static,
{
  fetch_modifiable(state.store.as_ref(), id, &user).await?;
  if !state.store.delete_log(id).await.map_err(ApiError::store)? {
    return Err(ApiError::NotFound(format!("observation log {id} not found")));
  }
  tracing::info!(id, editor = %user.username, "observation log deleted");
  Ok(Json(json!({})))
}

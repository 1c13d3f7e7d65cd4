//! Login, logout and self-service account handlers.

use axum::{
  Json,
  extract::State,
  http::{HeaderMap, StatusCode, header},
  response::IntoResponse,
};
use eor_core::{
  store::{DashboardStore, ObservationSource},
  user::{ProfileUpdate, User},
};
use serde::Deserialize;
use serde_json::json;

use crate::{
  ApiState,
  auth::{CurrentUser, check_credentials, hash_password},
  error::ApiError,
  session::{clear_cookie, set_cookie, token_from_cookies},
};

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub username: String,
  pub password: String,
}

/// `POST /login`: issues a session cookie and returns the user.
pub async fn login<S, O>(
  State(state): State<ApiState<S, O>>,
  Json(body): Json<LoginBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DashboardStore + Clone + 'static,
  O: ObservationSource + Clone + 'static,
{
  let user = check_credentials(state.store.as_ref(), &body.username, &body.password)
    .await
    .inspect_err(|_| tracing::warn!(username = %body.username, "login refused"))?;

  let token = state.sessions.create(user.id).await;
  tracing::info!(username = %user.username, "logged in");
  Ok((
    StatusCode::CREATED,
    [(header::SET_COOKIE, set_cookie(token))],
    Json(user),
  ))
}

/// `GET|POST /logout`: ends the session, if any. Always succeeds.
pub async fn logout<S, O>(
  State(state): State<ApiState<S, O>>,
  headers: HeaderMap,
) -> impl IntoResponse
where
  S: DashboardStore + Clone + 'static,
  O: ObservationSource + Clone + 'static,
{
  let token = headers
    .get(header::COOKIE)
    .and_then(|v| v.to_str().ok())
    .and_then(token_from_cookies);
  if let Some(token) = token {
    state.sessions.remove(token).await;
  }
  ([(header::SET_COOKIE, clear_cookie())], Json(json!({})))
}

/// `GET /current_user`
pub async fn current_user<S, O>(
  State(_state): State<ApiState<S, O>>,
  CurrentUser(user): CurrentUser,
) -> Json<User>
where
  S: DashboardStore + Clone + 'static,
  O: ObservationSource + Clone + 'static,
{
  Json(user)
}

/// `POST|PUT /current_user`: body: `{"name"?, "email"?, "password"?}`.
/// A blank password leaves the current one in place.
pub async fn update_current_user<S, O>(
  State(state): State<ApiState<S, O>>,
  CurrentUser(user): CurrentUser,
  Json(body): Json<ProfileUpdate>,
) -> Result<Json<User>, ApiError>
where
  S: DashboardStore + Clone + 'static,
  O: ObservationSource + Clone + 'static,
{
  let update = body.normalized()?;
  let hash = update
    .password
    .as_deref()
    .map(hash_password)
    .transpose()
    .map_err(|e| ApiError::Internal(e.to_string().into()))?;

  let updated = state
    .store
    .update_profile(user.id, ProfileUpdate { password: None, ..update }, hash)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(updated))
}

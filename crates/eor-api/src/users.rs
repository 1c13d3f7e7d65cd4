//! Handlers for `/users` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/users` | Admin only |
//! | `POST` | `/users` | Admin only. Body: `{"username","name","email","password"}` |
//! | `GET`  | `/users/{id}` | 404 if not found |
//! | `PUT`  | `/users/{id}` | Admin only. Body: `{"deactivate":true}` or `{"reactivate":true}` |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use eor_core::{
  store::{DashboardStore, ObservationSource},
  user::{Transition, User, UserDraft, UserId},
};
use serde::{Deserialize, Serialize};

use crate::{
  ApiState,
  auth::{AdminUser, CurrentUser, hash_password},
  error::ApiError,
};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct UserList {
  pub users: Vec<User>,
}

/// `GET /users`
pub async fn list<S, O>(
  State(state): State<ApiState<S, O>>,
  AdminUser(_): AdminUser,
) -> Result<Json<UserList>, ApiError>
where
  S: DashboardStore + Clone + 'static,
  O: ObservationSource + Clone + 'static,
{
  let users = state.store.list_users().await.map_err(ApiError::store)?;
  Ok(Json(UserList { users }))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /users`
pub async fn create<S, O>(
  State(state): State<ApiState<S, O>>,
  AdminUser(admin): AdminUser,
  Json(body): Json<UserDraft>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DashboardStore + Clone + 'static,
  O: ObservationSource + Clone + 'static,
{
  let (new_user, password) = body.validate()?;
  let hash = hash_password(&password).map_err(|e| ApiError::Internal(e.to_string().into()))?;
  let user = state
    .store
    .create_user(new_user, hash)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(id = user.id, username = %user.username, by = %admin.username, "user created");
  Ok((StatusCode::CREATED, Json(user)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /users/{id}`
pub async fn get_one<S, O>(
  State(state): State<ApiState<S, O>>,
  CurrentUser(_): CurrentUser,
  Path(id): Path<UserId>,
) -> Result<Json<User>, ApiError>
where
  S: DashboardStore + Clone + 'static,
  O: ObservationSource + Clone + 'static,
{
  let user = state
    .store
    .get_user(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))?;
  Ok(Json(user))
}

// ─── Activation ───────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBody {
  #[serde(default)]
  pub deactivate: bool,
  #[serde(default)]
  pub reactivate: bool,
}

impl UpdateBody {
  fn transition(&self) -> Result<Transition, ApiError> {
    match (self.deactivate, self.reactivate) {
      (true, false) => Ok(Transition::Deactivate),
      (false, true) => Ok(Transition::Reactivate),
      _ => Err(ApiError::BadRequest(
        "exactly one of \"deactivate\" or \"reactivate\" must be true".into(),
      )),
    }
  }
}

/// `PUT /users/{id}`
pub async fn update<S, O>(
  State(state): State<ApiState<S, O>>,
  AdminUser(admin): AdminUser,
  Path(id): Path<UserId>,
  Json(body): Json<UpdateBody>,
) -> Result<Json<User>, ApiError>
where
  S: DashboardStore + Clone + 'static,
  O: ObservationSource + Clone + 'static,
{
  let transition = body.transition()?;
  let user = state
    .store
    .get_user(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))?;

  let deactivated_date = user.transition(transition, Utc::now())?;
  let user = state
    .store
    .set_deactivated_date(id, deactivated_date)
    .await
    .map_err(ApiError::store)?;
  if let Transition::Deactivate = transition {
    let revoked = state.sessions.revoke_user(id).await;
    tracing::debug!(id, revoked, "sessions revoked");
  }
  tracing::info!(id, ?transition, by = %admin.username, "user activation changed");
  Ok(Json(user))
}

//! API error type and [`axum::response::IntoResponse`] implementation.

use std::error::Error as StdError;

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("authentication required")]
  Unauthorized,

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn StdError + Send + Sync>),
}

impl ApiError {
  /// Classify a backend error.
  ///
  /// Stores wrap domain errors (a duplicate username, a missing row) in
  /// their own error type, so the source chain is searched for an
  /// [`eor_core::Error`] first. Anything else is an internal failure.
  pub fn store<E>(e: E) -> Self
  where
    E: StdError + Send + Sync + 'static,
  {
    let mut cur: Option<&(dyn StdError + 'static)> = Some(&e);
    while let Some(err) = cur {
      if let Some(core) = err.downcast_ref::<eor_core::Error>() {
        return core.clone().into();
      }
      cur = err.source();
    }
    Self::Internal(Box::new(e))
  }
}

impl From<eor_core::Error> for ApiError {
  fn from(e: eor_core::Error) -> Self {
    use eor_core::Error as E;
    if e.is_validation() {
      return Self::BadRequest(e.to_string());
    }
    match e {
      E::NotAuthorized(_) => Self::Forbidden(e.to_string()),
      E::AlreadyDeactivated(_)
      | E::NotDeactivated(_)
      | E::AdminNotDeactivatable(_)
      | E::UsernameTaken(_) => Self::Conflict(e.to_string()),
      E::LogNotFound(_) | E::UserNotFound(_) | E::UsernameNotFound(_) => {
        Self::NotFound(e.to_string())
      }
      other => Self::Internal(Box::new(other)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Internal(e) => {
        tracing::error!(error = %e, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_owned())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

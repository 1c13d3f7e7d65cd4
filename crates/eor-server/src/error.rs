//! Error types and axum `IntoResponse` implementation for the legacy
//! endpoints. These answer in plain text, like the scripts they replace.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("could not fetch file listing: {0}")]
  Listing(#[from] reqwest::Error),

  #[error("{0}")]
  Core(#[from] eor_core::Error),

  #[error("xml error: {0}")]
  Xml(#[from] std::io::Error),

  #[error("invalid listing_utc_offset_minutes: {0}")]
  InvalidOffset(i32),

  #[error("observation source error: {0}")]
  Observations(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("dashboard store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("schedule line {line}: {reason}")]
  ScheduleLine { line: usize, reason: &'static str },
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = match &self {
      Error::Listing(_) | Error::Core(eor_core::Error::ListingParse(_)) => StatusCode::BAD_GATEWAY,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
      tracing::error!(error = %self, "legacy request failed");
    }
    (status, self.to_string()).into_response()
  }
}

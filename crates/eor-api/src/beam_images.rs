//! Handler for `GET /beam_images`: the rendered primary-beam plots.

use std::path::Path;

use axum::{
  Json,
  extract::{Query, State},
};
use eor_core::store::{DashboardStore, ObservationSource};
use serde::{Deserialize, Serialize};

use crate::{ApiState, error::ApiError};

const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Default, Deserialize)]
pub struct ImageParams {
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImageList {
  pub images: Vec<String>,
}

/// `.png` file names in `dir`, newest (greatest name) first.
pub async fn png_names(dir: &Path) -> std::io::Result<Vec<String>> {
  let mut entries = tokio::fs::read_dir(dir).await?;
  let mut names = Vec::new();
  while let Some(entry) = entries.next_entry().await? {
    if let Ok(name) = entry.file_name().into_string()
      && name.ends_with(".png")
    {
      names.push(name);
    }
  }
  names.sort_unstable_by(|a, b| b.cmp(a));
  Ok(names)
}

/// `GET /beam_images?limit=N[&offset=M]`
pub async fn list<S, O>(
  State(state): State<ApiState<S, O>>,
  Query(params): Query<ImageParams>,
) -> Result<Json<ImageList>, ApiError>
where
  S: DashboardStore + Clone + 'static,
  O: ObservationSource + Clone + 'static,
{
  let limit = params.limit.filter(|&n| n > 0).unwrap_or(DEFAULT_LIMIT);
  let offset = params.offset.unwrap_or(0);

  let images = png_names(&state.config.beam_image_dir)
    .await
    .map_err(|e| ApiError::Internal(Box::new(e)))?
    .into_iter()
    .skip(offset)
    .take(limit)
    .collect();
  Ok(Json(ImageList { images }))
}

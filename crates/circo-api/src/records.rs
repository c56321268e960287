//! Handlers for `/records` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/records/{category}` | The current collection |
//! | `PUT`  | `/records/{category}` | `directory` and `calendar` only; body: JSON array; full replace |
//!
//! The other categories are written through `/imports`.

use axum::{
  Json,
  extract::{Path, State},
};
use circo_core::{
  record::{RecordBatch, RecordCategory},
  store::{ArchiveStore, RecordStore},
};
use serde::Serialize;
use serde_json::{Value, json};

use crate::{AppState, error::ApiError};

fn category(name: &str) -> Result<RecordCategory, ApiError> {
  name
    .parse()
    .map_err(|_| ApiError::NotFound(format!("unknown record category {name:?}")))
}

/// `GET /records/{category}`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Path(name): Path<String>,
) -> Result<Json<RecordBatch>, ApiError>
where
  S: RecordStore + ArchiveStore + 'static,
{
  let batch = state
    .store
    .load_category(category(&name)?)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(batch))
}

#[derive(Debug, Serialize)]
pub struct ReplaceReport {
  pub category: RecordCategory,
  pub imported: usize,
}

/// `PUT /records/{category}`, body: JSON array of records
pub async fn replace<S>(
  State(state): State<AppState<S>>,
  Path(name): Path<String>,
  Json(records): Json<Value>,
) -> Result<Json<ReplaceReport>, ApiError>
where
  S: RecordStore + ArchiveStore + 'static,
{
  let category = category(&name)?;
  if !matches!(category, RecordCategory::Directory | RecordCategory::Calendar) {
    return Err(ApiError::BadRequest(format!(
      "{category} records are written through /imports"
    )));
  }

  let batch: RecordBatch = serde_json::from_value(json!({
    "category": category,
    "records":  records,
  }))
  .map_err(|e| ApiError::Unprocessable(e.to_string()))?;

  let imported = state
    .store
    .replace_category(batch)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(%category, imported, "category replaced");
  Ok(Json(ReplaceReport { category, imported }))
}

//! Handlers for `/archives` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/archives` | Summaries, oldest year first |
//! | `GET`    | `/archives/{year}` | Full snapshot; 404 if absent |
//! | `POST`   | `/archives/{year}` | Build from the current records; 201, or 409 if the year exists or is being built |
//! | `DELETE` | `/archives/{year}` | 204, or 404 if absent |
//!
//! `{year}` is `2024-2025`, `2024/2025` or `2024`.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use circo_core::{
  SchoolYear,
  snapshot::{ArchiveSnapshot, ArchiveSummary, ResolutionReport},
  store::{ArchiveStore, RecordStore},
};
use serde::Serialize;

use crate::{AppState, error::ApiError};

pub(crate) fn school_year(raw: &str) -> Result<SchoolYear, ApiError> {
  raw.parse().map_err(|e: circo_core::Error| ApiError::BadRequest(e.to_string()))
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /archives`
pub async fn list<S>(State(state): State<AppState<S>>) -> Result<Json<Vec<ArchiveSummary>>, ApiError>
where
  S: RecordStore + ArchiveStore + 'static,
{
  let archives = state.store.list_archives().await.map_err(ApiError::store)?;
  Ok(Json(archives))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /archives/{year}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(year): Path<String>,
) -> Result<Json<ArchiveSnapshot>, ApiError>
where
  S: RecordStore + ArchiveStore + 'static,
{
  let year = school_year(&year)?;
  let snapshot = state
    .store
    .get_archive(year)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("no archive for {year}")))?;
  Ok(Json(snapshot))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// What a successful build reports back.
#[derive(Debug, Serialize)]
pub struct ArchiveCreated {
  pub summary:         ArchiveSummary,
  pub resolution:      ResolutionReport,
  pub computed_digest: String,
}

impl From<&ArchiveSnapshot> for ArchiveCreated {
  fn from(snapshot: &ArchiveSnapshot) -> Self {
    Self {
      summary:         snapshot.summary(),
      resolution:      snapshot.raw.resolution,
      computed_digest: snapshot.computed_digest.clone(),
    }
  }
}

/// `POST /archives/{year}`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Path(year): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore + ArchiveStore + 'static,
{
  let year = school_year(&year)?;
  let mut config = state.district.read().await.clone();
  config.school_year = year;

  let snapshot = state
    .builder
    .build(state.store.as_ref(), &config, Utc::now())
    .await?;
  Ok((StatusCode::CREATED, Json(ArchiveCreated::from(&snapshot))))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /archives/{year}`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  Path(year): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: RecordStore + ArchiveStore + 'static,
{
  let year = school_year(&year)?;
  let deleted = state.store.delete_archive(year).await.map_err(ApiError::store)?;
  if !deleted {
    return Err(ApiError::NotFound(format!("no archive for {year}")));
  }
  tracing::info!(%year, "archive deleted");
  Ok(StatusCode::NO_CONTENT)
}

//! Handlers for `/year` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/year` | Current school year and enrollment history |
//! | `POST` | `/year/roll` | Archive the current year, then advance; 201 |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use circo_core::{
  config::DistrictState,
  snapshot::ArchiveSummary,
  store::{ArchiveStore, RecordStore},
};
use serde::Serialize;

use crate::{AppState, error::ApiError};

/// `GET /year`
pub async fn current<S>(State(state): State<AppState<S>>) -> Json<DistrictState>
where
  S: RecordStore + ArchiveStore + 'static,
{
  Json(state.district.read().await.state())
}

#[derive(Debug, Serialize)]
pub struct RolledOver {
  pub archived: ArchiveSummary,
  pub current:  DistrictState,
}

/// `POST /year/roll`
pub async fn roll<S>(State(state): State<AppState<S>>) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore + ArchiveStore + 'static,
{
  // Held across the build so two roll-overs cannot both advance.
  let mut district = state.district.write().await;
  let (snapshot, next) = state
    .builder
    .roll_over(state.store.as_ref(), &district, Utc::now())
    .await?;
  *district = next;

  Ok((
    StatusCode::CREATED,
    Json(RolledOver {
      archived: snapshot.summary(),
      current:  district.state(),
    }),
  ))
}

//! Handler for `/imports` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/imports/{kind}` | Body: the raw document, UTF-8 or Windows-1252; optional `?source=<id>`; 422 if unreadable |

use axum::{
  Json,
  body::Bytes,
  extract::{Path, Query, State},
};
use circo_core::{
  store::{ArchiveStore, RecordStore},
  text::decode_export,
};
use circo_parse::DocumentKind;
use circo_reconcile::{ImportReport, import_document};
use serde::Deserialize;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ImportParams {
  /// Identifies the document in reports and records. Defaults to
  /// `upload.<kind>`.
  pub source: Option<String>,
}

/// `POST /imports/{kind}[?source=<id>]`
pub async fn import<S>(
  State(state): State<AppState<S>>,
  Path(kind): Path<String>,
  Query(params): Query<ImportParams>,
  body: Bytes,
) -> Result<Json<ImportReport>, ApiError>
where
  S: RecordStore + ArchiveStore + 'static,
{
  let kind = DocumentKind::from_name(&kind).map_err(|e| ApiError::NotFound(e.to_string()))?;
  let source_id = params.source.unwrap_or_else(|| format!("upload.{kind}"));
  let ctx = state.parse_context().await;

  let input = decode_export(&body);

  let report = import_document(state.store.as_ref(), kind, &source_id, &input, &ctx).await?;
  Ok(Json(report))
}

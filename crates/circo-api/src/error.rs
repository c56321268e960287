//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use circo_reconcile::{ArchiveError, IntakeError};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("unauthorized")]
  Unauthorized,

  #[error("conflict: {0}")]
  Conflict(String),

  /// The document was understood as a request but could not be read.
  #[error("unprocessable document: {0}")]
  Unprocessable(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

impl From<ArchiveError> for ApiError {
  fn from(e: ArchiveError) -> Self {
    match e {
      ArchiveError::InFlight(_) | ArchiveError::AlreadyExists(_) | ArchiveError::Year(_) => {
        Self::Conflict(e.to_string())
      }
      other => Self::store(other),
    }
  }
}

impl From<IntakeError> for ApiError {
  fn from(e: IntakeError) -> Self {
    match e {
      IntakeError::Malformed(circo_parse::Error::UnknownKind(kind)) => {
        Self::NotFound(format!("unknown document kind {kind:?}"))
      }
      IntakeError::Malformed(inner) => Self::Unprocessable(inner.to_string()),
      other => Self::store(other),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
      ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
      ApiError::Store(e) => {
        tracing::error!(error = %e, "request failed");
        StatusCode::INTERNAL_SERVER_ERROR
      }
    };
    let message = match self {
      ApiError::NotFound(m)
      | ApiError::BadRequest(m)
      | ApiError::Conflict(m)
      | ApiError::Unprocessable(m) => m,
      other => other.to_string(),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

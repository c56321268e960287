//! Error type for `circo-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] circo_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// The file was written by a newer schema than this build understands.
  #[error("unsupported schema version {found} (expected at most {supported})")]
  SchemaVersion { found: i64, supported: i64 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

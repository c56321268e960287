//! Error types for `circo-core`.

use thiserror::Error;

use crate::SchoolYear;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid school code: {0:?}")]
  InvalidUai(String),

  #[error("invalid school year: {0:?}")]
  InvalidSchoolYear(String),

  #[error("no school year follows {0}")]
  LastSchoolYear(SchoolYear),

  #[error("unknown employment status: {0:?}")]
  UnknownStatus(String),

  #[error("unknown record category: {0:?}")]
  UnknownCategory(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

//! Error types for archive builds and imports.

use circo_core::SchoolYear;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ArchiveError {
  /// Another build of the same year is running in this process.
  #[error("an archive build for {0} is already in progress")]
  InFlight(SchoolYear),

  /// A snapshot for the year exists; it must be deleted first.
  #[error("an archive for {0} already exists")]
  AlreadyExists(SchoolYear),

  #[error("failed to read records: {0}")]
  Load(#[source] BoxError),

  /// The snapshot (or the rolled-over state) could not be written. Nothing
  /// partial is left behind.
  #[error("failed to persist archive: {0}")]
  Persistence(#[source] BoxError),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  /// The district cannot advance, e.g. past the last school year.
  #[error(transparent)]
  Year(#[from] circo_core::Error),
}

#[derive(Debug, Error)]
pub enum IntakeError {
  /// The document could not be read at all; nothing was written.
  #[error(transparent)]
  Malformed(#[from] circo_parse::Error),

  #[error("failed to persist records: {0}")]
  Persistence(#[source] BoxError),

  #[error("parser task failed: {0}")]
  Task(#[from] tokio::task::JoinError),
}

impl ArchiveError {
  pub(crate) fn load(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Load(Box::new(e))
  }

  pub(crate) fn persistence(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Persistence(Box::new(e))
  }
}

impl IntakeError {
  pub(crate) fn persistence(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Persistence(Box::new(e))
  }
}

pub type Result<T, E = ArchiveError> = std::result::Result<T, E>;

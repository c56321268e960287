//! Error types for the circo-parse document parser.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The document as a whole cannot be read; other documents in the same
  /// batch are unaffected.
  #[error("malformed document {source_id}: {reason}")]
  MalformedDocument { source_id: String, reason: String },

  #[error("unknown document kind: {0:?}")]
  UnknownKind(String),
}

impl Error {
  pub(crate) fn malformed(source_id: &str, reason: impl Into<String>) -> Self {
    Self::MalformedDocument {
      source_id: source_id.to_string(),
      reason:    reason.into(),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

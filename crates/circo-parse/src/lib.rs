//! Document parser for Circo.
//!
//! Turns one raw export into canonical records. Pure synchronous; no HTTP or
//! database dependencies.
//!
//! Two families of input are supported:
//!
//! - markup exports (identity and structure pages), read table by table;
//! - workbook exports, delivered as JSON sheets (an array of row objects for
//!   assessments, an array of row arrays for rosters).
//!
//! A document that cannot be read at all yields
//! [`Error::MalformedDocument`]. A row that cannot be resolved is skipped and
//! counted in [`ParsedDocument::skipped`]; it never aborts the document.
//!
//! # Quick start
//!
//! ```no_run
//! use circo_parse::{DocumentKind, ParseContext, parse_document};
//!
//! let html = "<table><tr><td>UAI</td><td>9730200E</td></tr></table>";
//! let ctx = ParseContext::today();
//! let parsed = parse_document(DocumentKind::Identity, "fiche.html", html, &ctx).unwrap();
//! println!("{} records, {} skipped", parsed.batch.len(), parsed.skipped);
//! ```

mod assessment;
mod cell;
pub mod error;
mod identity;
mod markup;
pub mod roster;
mod structure;

use chrono::{NaiveDate, Utc};
use circo_core::{
  config::ClassificationRules,
  record::{RecordBatch, RecordCategory},
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub use error::{Error, Result};

// ─── Public types ────────────────────────────────────────────────────────────

/// The declared kind of an incoming document.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
  Identity,
  Structure,
  Assessment,
  Roster,
}

impl DocumentKind {
  /// Parse a kind name as it appears in routes and on the command line.
  pub fn from_name(name: &str) -> Result<Self> {
    name
      .parse()
      .map_err(|_| Error::UnknownKind(name.to_string()))
  }

  /// The record category documents of this kind produce.
  pub fn category(self) -> RecordCategory {
    match self {
      Self::Identity => RecordCategory::Identity,
      Self::Structure => RecordCategory::Structure,
      Self::Assessment => RecordCategory::Assessment,
      Self::Roster => RecordCategory::Roster,
    }
  }
}

/// Inputs that make parsing deterministic: the reference date for tenure
/// computation and the roster classification rules.
#[derive(Debug, Clone)]
pub struct ParseContext {
  pub as_of: NaiveDate,
  pub rules: ClassificationRules,
}

impl ParseContext {
  pub fn new(as_of: NaiveDate, rules: ClassificationRules) -> Self {
    Self { as_of, rules }
  }

  /// Today's date with default rules.
  pub fn today() -> Self {
    Self::new(Utc::now().date_naive(), ClassificationRules::default())
  }
}

/// The records read from one document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
  pub batch:   RecordBatch,
  /// Rows (or, for single-record kinds, the record itself) that could not be
  /// resolved to their required fields.
  pub skipped: usize,
}

// ─── Public API ──────────────────────────────────────────────────────────────

/// Parse one document of the declared `kind`.
///
/// `source_id` identifies the document in errors and in the records it
/// produces.
pub fn parse_document(
  kind: DocumentKind,
  source_id: &str,
  input: &str,
  ctx: &ParseContext,
) -> Result<ParsedDocument> {
  let parsed = match kind {
    DocumentKind::Identity => identity::parse(input, source_id)?,
    DocumentKind::Structure => structure::parse(input, source_id)?,
    DocumentKind::Assessment => assessment::parse(input, source_id)?,
    DocumentKind::Roster => roster::parse(input, source_id, ctx)?,
  };
  tracing::debug!(
    %kind,
    source_id,
    records = parsed.batch.len(),
    skipped = parsed.skipped,
    "parsed document"
  );
  Ok(parsed)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kind_names() {
    assert_eq!(DocumentKind::from_name("Roster").unwrap(), DocumentKind::Roster);
    assert_eq!(DocumentKind::Assessment.to_string(), "assessment");
    assert!(matches!(
      DocumentKind::from_name("calendar"),
      Err(Error::UnknownKind(ref k)) if k == "calendar"
    ));
  }

  #[test]
  fn malformed_document_does_not_panic() {
    let ctx = ParseContext::today();
    for kind in [DocumentKind::Assessment, DocumentKind::Roster] {
      let err = parse_document(kind, "bad.xlsx", "PK\u{3}\u{4}garbage", &ctx).unwrap_err();
      assert!(matches!(err, Error::MalformedDocument { .. }));
    }
  }
}

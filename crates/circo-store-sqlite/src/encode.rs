//! Column encodings. Timestamps are RFC 3339 strings, school years their
//! starting calendar year, everything structured compact JSON.

use chrono::{DateTime, Utc};
use circo_core::{
  SchoolYear,
  snapshot::{ArchiveSnapshot, ArchiveSummary},
};

use crate::{Error, Result};

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_year(year: SchoolYear) -> i64 { i64::from(year.start()) }

/// Column values of one `archives` row, serialised ahead of the blocking
/// call.
pub struct ArchiveRow {
  pub school_year:    i64,
  pub snapshot_id:    String,
  pub created_at:     String,
  pub schema_version: i64,
  pub digest:         String,
  pub summary_json:   String,
  pub snapshot_json:  String,
}

impl ArchiveRow {
  pub fn encode(snapshot: &ArchiveSnapshot) -> Result<Self> {
    Ok(Self {
      school_year:    encode_year(snapshot.school_year),
      snapshot_id:    snapshot.snapshot_id.hyphenated().to_string(),
      created_at:     encode_dt(snapshot.created_at),
      schema_version: i64::from(snapshot.schema_version),
      digest:         snapshot.computed_digest.clone(),
      summary_json:   serde_json::to_string(&snapshot.summary())?,
      snapshot_json:  serde_json::to_string(snapshot)?,
    })
  }
}

pub fn decode_snapshot(json: &str) -> Result<ArchiveSnapshot> { Ok(serde_json::from_str(json)?) }

/// The stored summary, with the indexed `created_at` column taking
/// precedence.
pub fn decode_summary(json: &str, created_at: &str) -> Result<ArchiveSummary> {
  let mut summary: ArchiveSummary = serde_json::from_str(json)?;
  summary.created_at = decode_dt(created_at)?;
  Ok(summary)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timestamps_round_trip() {
    let now = DateTime::parse_from_rfc3339("2025-07-04T12:00:00Z")
      .unwrap()
      .with_timezone(&Utc);
    assert_eq!(decode_dt(&encode_dt(now)).unwrap(), now);
    assert!(matches!(decode_dt("yesterday"), Err(Error::DateParse(_))));
  }
}

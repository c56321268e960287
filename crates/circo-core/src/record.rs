//! Per-source record collections as a closed, tagged set of shapes.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::{
  Result,
  assessment::AssessmentRecord,
  calendar::CalendarEvent,
  school::{DirectoryEntry, SchoolIdentityRecord, SchoolStructureRecord},
  staff::TeacherRecord,
};

/// The persisted record categories. Each is replaced or upserted as a whole
/// by an import.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Display,
  EnumString,
  EnumIter,
  Serialize,
  Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RecordCategory {
  Identity,
  Structure,
  Roster,
  Assessment,
  Directory,
  Calendar,
}

impl RecordCategory {
  /// Whether records of this category are keyed by school code (one record
  /// per school, re-import overwrites) rather than replaced wholesale.
  pub fn is_keyed_by_school(self) -> bool {
    matches!(self, Self::Identity | Self::Structure)
  }
}

/// A homogeneous batch of records from one source kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", content = "records", rename_all = "lowercase")]
pub enum RecordBatch {
  Identity(Vec<SchoolIdentityRecord>),
  Structure(Vec<SchoolStructureRecord>),
  Roster(Vec<TeacherRecord>),
  Assessment(Vec<AssessmentRecord>),
  Directory(Vec<DirectoryEntry>),
  Calendar(Vec<CalendarEvent>),
}

impl RecordBatch {
  pub fn empty(category: RecordCategory) -> Self {
    match category {
      RecordCategory::Identity => Self::Identity(Vec::new()),
      RecordCategory::Structure => Self::Structure(Vec::new()),
      RecordCategory::Roster => Self::Roster(Vec::new()),
      RecordCategory::Assessment => Self::Assessment(Vec::new()),
      RecordCategory::Directory => Self::Directory(Vec::new()),
      RecordCategory::Calendar => Self::Calendar(Vec::new()),
    }
  }

  pub fn category(&self) -> RecordCategory {
    match self {
      Self::Identity(_) => RecordCategory::Identity,
      Self::Structure(_) => RecordCategory::Structure,
      Self::Roster(_) => RecordCategory::Roster,
      Self::Assessment(_) => RecordCategory::Assessment,
      Self::Directory(_) => RecordCategory::Directory,
      Self::Calendar(_) => RecordCategory::Calendar,
    }
  }

  pub fn len(&self) -> usize {
    match self {
      Self::Identity(v) => v.len(),
      Self::Structure(v) => v.len(),
      Self::Roster(v) => v.len(),
      Self::Assessment(v) => v.len(),
      Self::Directory(v) => v.len(),
      Self::Calendar(v) => v.len(),
    }
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  /// Append `other` to `self`. Batches of different categories are left
  /// untouched and `other` is handed back.
  pub fn extend(&mut self, other: RecordBatch) -> Option<RecordBatch> {
    match (self, other) {
      (Self::Identity(a), Self::Identity(b)) => a.extend(b),
      (Self::Structure(a), Self::Structure(b)) => a.extend(b),
      (Self::Roster(a), Self::Roster(b)) => a.extend(b),
      (Self::Assessment(a), Self::Assessment(b)) => a.extend(b),
      (Self::Directory(a), Self::Directory(b)) => a.extend(b),
      (Self::Calendar(a), Self::Calendar(b)) => a.extend(b),
      (_, other) => return Some(other),
    }
    None
  }

  /// Serialise each record as `(record_key, json)`. School-keyed categories
  /// use the school code; the others use the zero-padded position so that
  /// key order is input order.
  pub fn to_rows(&self) -> Result<Vec<(String, String)>> {
    fn rows<T: Serialize>(
      records: &[T],
      key: impl Fn(usize, &T) -> String,
    ) -> Result<Vec<(String, String)>> {
      records
        .iter()
        .enumerate()
        .map(|(i, r)| Ok((key(i, r), serde_json::to_string(r)?)))
        .collect()
    }
    let position = |i: usize| format!("{i:08}");

    match self {
      Self::Identity(v) => rows(v, |_, r| r.uai.to_string()),
      Self::Structure(v) => rows(v, |_, r| r.uai.to_string()),
      Self::Roster(v) => rows(v, |i, _| position(i)),
      Self::Assessment(v) => rows(v, |i, _| position(i)),
      Self::Directory(v) => rows(v, |i, _| position(i)),
      Self::Calendar(v) => rows(v, |i, _| position(i)),
    }
  }

  /// Rebuild a batch from JSON payloads stored by [`RecordBatch::to_rows`].
  pub fn from_rows(category: RecordCategory, payloads: &[String]) -> Result<Self> {
    fn decode<T: for<'de> Deserialize<'de>>(payloads: &[String]) -> Result<Vec<T>> {
      payloads
        .iter()
        .map(|p| Ok(serde_json::from_str(p)?))
        .collect()
    }

    Ok(match category {
      RecordCategory::Identity => Self::Identity(decode(payloads)?),
      RecordCategory::Structure => Self::Structure(decode(payloads)?),
      RecordCategory::Roster => Self::Roster(decode(payloads)?),
      RecordCategory::Assessment => Self::Assessment(decode(payloads)?),
      RecordCategory::Directory => Self::Directory(decode(payloads)?),
      RecordCategory::Calendar => Self::Calendar(decode(payloads)?),
    })
  }
}

/// Every current collection, as read by the archive builder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
  pub identity:    Vec<SchoolIdentityRecord>,
  pub structure:   Vec<SchoolStructureRecord>,
  pub teachers:    Vec<TeacherRecord>,
  pub assessments: Vec<AssessmentRecord>,
  pub directory:   Vec<DirectoryEntry>,
  pub calendar:    Vec<CalendarEvent>,
}

impl RecordSet {
  /// Replace the collection matching `batch`'s category.
  pub fn insert(&mut self, batch: RecordBatch) {
    match batch {
      RecordBatch::Identity(v) => self.identity = v,
      RecordBatch::Structure(v) => self.structure = v,
      RecordBatch::Roster(v) => self.teachers = v,
      RecordBatch::Assessment(v) => self.assessments = v,
      RecordBatch::Directory(v) => self.directory = v,
      RecordBatch::Calendar(v) => self.calendar = v,
    }
  }
}

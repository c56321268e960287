//! Teaching staff as read from the roster export.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::{Error, Uai};

/// Employment status of a teacher.
///
/// Parsing is ASCII-case-insensitive, and so is deserialization: a stored
/// `"TENURED"` and `"tenured"` are the same status.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Display,
  EnumString,
  IntoStaticStr,
  Serialize,
  Deserialize,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(try_from = "String", into = "&'static str")]
pub enum EmploymentStatus {
  Tenured,
  TraineeTeacher,
  Contractor,
  Other,
}

impl TryFrom<String> for EmploymentStatus {
  type Error = Error;

  fn try_from(s: String) -> Result<Self, Self::Error> {
    s.trim()
      .parse()
      .map_err(|_| Error::UnknownStatus(s.clone()))
  }
}

/// Whether an assignment is open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentMode {
  Permanent,
  Temporary,
}

/// One staffed post on the roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeacherRecord {
  pub surname:            String,
  pub given_name:         String,
  pub school_uai:         Option<Uai>,
  pub school_name:        Option<String>,
  pub employment_status:  EmploymentStatus,
  /// Whole years since the start of the assignment, floored at zero.
  pub tenure_years:       u32,
  pub grade_code:         String,
  pub subject_specialty:  String,
  /// Contractual working time, 1.0 = full time.
  pub full_time_fraction: f64,
  /// Share of the post actually occupied; zero means the post is vacant.
  pub occupied_fraction:  f64,
  pub assignment_mode:    Option<AssignmentMode>,
  /// Relief ("décharge") as a percentage of working time.
  pub relief_arrangement: Option<u32>,

  // Enrichment, filled by the resolver when a class matches.
  #[serde(default)]
  pub class_label:        Option<String>,
  #[serde(default)]
  pub grade_level:        Option<String>,
  #[serde(default)]
  pub student_count:      Option<u32>,
}

impl TeacherRecord {
  pub fn display_name(&self) -> String {
    format!("{} {}", self.surname, self.given_name).trim().to_string()
  }

  pub fn is_enriched(&self) -> bool { self.class_label.is_some() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_parses_case_insensitively() {
    assert_eq!("TENURED".parse::<EmploymentStatus>().unwrap(), EmploymentStatus::Tenured);
    assert_eq!(
      "Trainee_Teacher".parse::<EmploymentStatus>().unwrap(),
      EmploymentStatus::TraineeTeacher
    );
  }

  #[test]
  fn status_serde_is_snake_case_and_lenient() {
    let json = serde_json::to_string(&EmploymentStatus::TraineeTeacher).unwrap();
    assert_eq!(json, "\"trainee_teacher\"");
    let back: EmploymentStatus = serde_json::from_str("\"CONTRACTOR\"").unwrap();
    assert_eq!(back, EmploymentStatus::Contractor);
    assert!(serde_json::from_str::<EmploymentStatus>("\"retired\"").is_err());
  }
}

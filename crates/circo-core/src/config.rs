//! District configuration: the current school year, the enrollment history,
//! and the hand-tuned rules the parser and aggregator consult.
//!
//! Configuration is a plain value. Rolling over to the next school year
//! produces a new value through [`DistrictConfig::advance_year`]; nothing is
//! mutated in place.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
  SchoolYear, Uai,
  error::{Error, Result},
  staff::EmploymentStatus,
};

// ─── History ─────────────────────────────────────────────────────────────────

/// Total district enrollment recorded for a past school year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentPoint {
  pub school_year: SchoolYear,
  pub enrollment:  u32,
}

/// The part of the configuration that changes when the district rolls over
/// to a new year. Persisted by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictState {
  pub school_year:        SchoolYear,
  #[serde(default)]
  pub enrollment_history: Vec<EnrollmentPoint>,
}

// ─── Aggregation settings ────────────────────────────────────────────────────

/// Settings that shape the computed views. Stored inside every snapshot so
/// the computed section can be reproduced from the raw section alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationSettings {
  /// Reserved code of the administrative-office pseudo-school.
  pub district_office_uai: Option<Uai>,
  /// Size of the top/bottom enrollment rankings.
  pub top_n:               usize,
  /// Known grade levels, in display order. Other keys are ignored.
  pub grade_levels:        Vec<String>,
  /// Normalized commune spelling → canonical commune name.
  pub commune_aliases:     BTreeMap<String, String>,
}

impl Default for AggregationSettings {
  fn default() -> Self {
    Self {
      district_office_uai: Uai::parse("9739999Z").ok(),
      top_n:               5,
      grade_levels:        ["TPS", "PS", "MS", "GS", "CP", "CE1", "CE2", "CM1", "CM2"]
        .into_iter()
        .map(str::to_string)
        .collect(),
      commune_aliases:     BTreeMap::new(),
    }
  }
}

// ─── Classification rules ────────────────────────────────────────────────────

/// Maps a range of numeric grade-code prefixes to a status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeRange {
  pub from:   u32,
  pub to:     u32,
  pub status: EmploymentStatus,
}

/// Rules used when reading roster exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationRules {
  /// Every keyword must appear in the (normalized) specialty for the teacher
  /// to be classified as a trainee, regardless of grade code.
  pub trainee_keywords:     Vec<String>,
  /// How many leading digits of the grade code are compared to the ranges.
  pub grade_prefix_digits:  usize,
  pub grade_ranges:         Vec<GradeRange>,
  /// End-date years inside this inclusive range mark an open-ended
  /// (permanent) assignment.
  pub permanent_end_years:  (i32, i32),
  /// Normalized name-cell values that are column headers, not people.
  pub excluded_name_tokens: Vec<String>,
}

impl Default for ClassificationRules {
  fn default() -> Self {
    let range = |from, to, status| GradeRange { from, to, status };
    Self {
      trainee_keywords:     vec!["professeur".into(), "ecoles".into(), "stagiaire".into()],
      grade_prefix_digits:  3,
      grade_ranges:         vec![
        range(100, 499, EmploymentStatus::Tenured),
        range(500, 599, EmploymentStatus::TraineeTeacher),
        range(800, 899, EmploymentStatus::Contractor),
      ],
      permanent_end_years:  (2090, 9999),
      excluded_name_tokens: vec![
        "nom".into(),
        "nom prenom".into(),
        "total".into(),
        "sous total".into(),
      ],
    }
  }
}

impl ClassificationRules {
  /// Status implied by a grade code, if its numeric prefix falls in a
  /// configured range.
  pub fn status_for_grade(&self, grade_code: &str) -> Option<EmploymentStatus> {
    let digits: String = grade_code
      .trim()
      .chars()
      .take_while(char::is_ascii_digit)
      .take(self.grade_prefix_digits)
      .collect();
    if digits.len() < self.grade_prefix_digits {
      return None;
    }
    let prefix: u32 = digits.parse().ok()?;
    self
      .grade_ranges
      .iter()
      .find(|r| (r.from..=r.to).contains(&prefix))
      .map(|r| r.status)
  }
}

// ─── DistrictConfig ──────────────────────────────────────────────────────────

/// Everything the archive builder and aggregator need to know beyond the
/// records themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictConfig {
  pub school_year:        SchoolYear,
  #[serde(default)]
  pub enrollment_history: Vec<EnrollmentPoint>,
  #[serde(default)]
  pub aggregation:        AggregationSettings,
  #[serde(default)]
  pub classification:     ClassificationRules,
}

impl DistrictConfig {
  pub fn new(school_year: SchoolYear) -> Self {
    Self {
      school_year,
      enrollment_history: Vec::new(),
      aggregation: AggregationSettings::default(),
      classification: ClassificationRules::default(),
    }
  }

  pub fn state(&self) -> DistrictState {
    DistrictState {
      school_year:        self.school_year,
      enrollment_history: self.enrollment_history.clone(),
    }
  }

  /// Overlay a persisted roll-over state on top of file configuration.
  pub fn with_state(self, state: DistrictState) -> Self {
    Self {
      school_year: state.school_year,
      enrollment_history: state.enrollment_history,
      ..self
    }
  }

  /// The configuration for the next school year, with the closing year's
  /// enrollment appended to the history (replacing any earlier figure for
  /// the same year). Fails past the last representable school year.
  pub fn advance_year(&self, closing_enrollment: u32) -> Result<Self> {
    let next_year = self
      .school_year
      .next()
      .ok_or(Error::LastSchoolYear(self.school_year))?;
    let mut history: Vec<EnrollmentPoint> = self
      .enrollment_history
      .iter()
      .filter(|p| p.school_year != self.school_year)
      .copied()
      .collect();
    history.push(EnrollmentPoint {
      school_year: self.school_year,
      enrollment:  closing_enrollment,
    });
    history.sort_by_key(|p| p.school_year);

    Ok(Self {
      school_year: next_year,
      enrollment_history: history,
      ..self.clone()
    })
  }
}

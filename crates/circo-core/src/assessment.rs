//! National assessment results, one record per (school, subject, grade,
//! competency).

use serde::{Deserialize, Serialize};

use crate::{SchoolYear, Uai};

/// Social position index at the three published granularities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialPositionIndex {
  pub school:          Option<f64>,
  pub circumscription: Option<f64>,
  pub academy:         Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRecord {
  pub uai:                   Uai,
  pub school_year:           Option<SchoolYear>,
  pub subject:               String,
  pub grade_level:           String,
  pub competency_label:      String,
  /// Share of pupils in each of the three proficiency groups, each in
  /// `[0, 1]`.
  pub mastery_group_rates:   [f64; 3],
  pub social_position_index: SocialPositionIndex,
  pub is_priority_network:   bool,
}

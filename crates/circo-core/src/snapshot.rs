//! The yearly archive snapshot and the computed views it carries.
//!
//! A snapshot is written once per school year and never updated in place.
//! Its `computed` section is a pure function of its `raw` section; the
//! digest lets a reader check that nothing drifted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  SchoolYear, Uai,
  assessment::AssessmentRecord,
  calendar::CalendarEvent,
  config::{AggregationSettings, EnrollmentPoint},
  school::EnrichedSchool,
  staff::TeacherRecord,
};

/// Current layout of [`ArchiveSnapshot`].
pub const SCHEMA_VERSION: u32 = 1;

// ─── Diagnostics ─────────────────────────────────────────────────────────────

/// How many teacher/class matches succeeded at each tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
  pub exact_name:              usize,
  pub surname_initial:         usize,
  pub compact_surname_initial: usize,
}

/// Outcome counters of one entity-resolution pass. Unresolved joins are
/// counted here; they never fail the pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionReport {
  pub schools:                 usize,
  pub teachers_matched:        usize,
  pub teachers_unresolved:     usize,
  pub teachers_without_school: usize,
  pub by_tier:                 TierCounts,
}

/// Per-source presence. `false` means the category had no records at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletenessFlags {
  pub identity:   bool,
  pub structure:  bool,
  pub roster:     bool,
  pub assessment: bool,
  pub directory:  bool,
  pub calendar:   bool,
}

impl CompletenessFlags {
  pub fn is_complete(&self) -> bool {
    self.identity && self.structure && self.roster && self.assessment
  }
}

// ─── Raw section ─────────────────────────────────────────────────────────────

/// The enriched per-source collections, verbatim, plus the settings that
/// shaped the computed views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSection {
  pub schools:            Vec<EnrichedSchool>,
  pub teachers:           Vec<TeacherRecord>,
  pub assessments:        Vec<AssessmentRecord>,
  pub calendar:           Vec<CalendarEvent>,
  pub enrollment_history: Vec<EnrollmentPoint>,
  pub settings:           AggregationSettings,
  pub resolution:         ResolutionReport,
}

// ─── Computed section ────────────────────────────────────────────────────────

/// Class counts and sizes. Split membership comes from the explicit flag
/// only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassSizeBreakdown {
  pub total_classes:               u32,
  pub split_classes:               u32,
  pub standard_classes:            u32,
  pub total_enrollment:            u32,
  pub average_split_class_size:    f64,
  pub average_standard_class_size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overview {
  pub school_year:                 SchoolYear,
  pub total_schools:               u32,
  pub classes:                     ClassSizeBreakdown,
  pub specialized_units:           u32,
  pub specialized_unit_enrollment: u32,
  pub total_teachers:              u32,
  pub district_office_personnel:   u32,
  pub priority_network_schools:    u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolSummary {
  pub uai:                   Uai,
  pub name:                  String,
  pub commune:               String,
  pub classes:               ClassSizeBreakdown,
  pub specialized_units:     u32,
  pub teachers:              u32,
  pub social_position_index: Option<f64>,
}

/// One line of an enrollment ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedSchool {
  pub uai:        Uai,
  pub name:       String,
  pub enrollment: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictView {
  pub schools:        Vec<SchoolSummary>,
  pub top_schools:    Vec<RankedSchool>,
  pub bottom_schools: Vec<RankedSchool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpsEntry {
  pub uai:   Uai,
  pub name:  String,
  pub index: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeLevelTotal {
  pub grade_level: String,
  pub students:    u32,
}

/// Mean proficiency-group rates for one subject at one grade level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterySummary {
  pub subject:     String,
  pub grade_level: String,
  pub records:     u32,
  pub mean_rates:  [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
  pub class_sizes:        ClassSizeBreakdown,
  pub grade_level_totals: Vec<GradeLevelTotal>,
  pub ips_ranking:        Vec<IpsEntry>,
  pub mastery:            Vec<MasterySummary>,
  pub enrollment_history: Vec<EnrollmentPoint>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTallies {
  pub tenured:    u32,
  pub trainee:    u32,
  pub contractor: u32,
  pub other:      u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolStaffing {
  pub uai:      Uai,
  pub teachers: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffView {
  pub status_tallies:      StatusTallies,
  pub permanent:           u32,
  pub temporary:           u32,
  pub with_relief:         u32,
  pub full_time_equivalent: f64,
  pub per_school:          Vec<SchoolStaffing>,
  /// Roster of the administrative-office pseudo-school, reported apart from
  /// ordinary staffing.
  pub district_office:     Vec<TeacherRecord>,
  pub resolution:          ResolutionReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCount {
  pub label: String,
  pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarSummary {
  pub total_events: u32,
  /// Keyed by `YYYY-MM` of the start date, chronological.
  pub by_month:     Vec<LabelCount>,
  pub by_category:  Vec<LabelCount>,
}

/// The named views presentation consumers read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedSection {
  pub overview:         Overview,
  pub district:         DistrictView,
  pub statistics:       Statistics,
  pub staff:            StaffView,
  pub calendar_summary: CalendarSummary,
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveSnapshot {
  pub snapshot_id:     Uuid,
  pub school_year:     SchoolYear,
  /// Excluded from every reproducibility check.
  pub created_at:      DateTime<Utc>,
  pub schema_version:  u32,
  pub completeness:    CompletenessFlags,
  pub raw:             RawSection,
  pub computed:        ComputedSection,
  /// SHA-256 (hex) of the serialised computed section.
  pub computed_digest: String,
}

impl ArchiveSnapshot {
  pub fn summary(&self) -> ArchiveSummary {
    ArchiveSummary {
      school_year:      self.school_year,
      snapshot_id:      self.snapshot_id,
      created_at:       self.created_at,
      schema_version:   self.schema_version,
      completeness:     self.completeness,
      total_schools:    self.computed.overview.total_schools,
      total_enrollment: self.computed.overview.classes.total_enrollment,
      total_teachers:   self.computed.overview.total_teachers,
    }
  }
}

/// Listing entry for a stored snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveSummary {
  pub school_year:      SchoolYear,
  pub snapshot_id:      Uuid,
  pub created_at:       DateTime<Utc>,
  pub schema_version:   u32,
  pub completeness:     CompletenessFlags,
  pub total_schools:    u32,
  pub total_enrollment: u32,
  pub total_teachers:   u32,
}

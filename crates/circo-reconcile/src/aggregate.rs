//! Derived statistics for one school year.
//!
//! [`aggregate`] is a pure function of the raw section: same input, same
//! output, byte for byte once serialised. Every collection it emits is a
//! `Vec` built from ordered input or a `BTreeMap`.

use std::collections::{BTreeMap, BTreeSet};

use circo_core::{
  SchoolYear, Uai,
  config::EnrollmentPoint,
  school::{ClassRecord, EnrichedSchool},
  snapshot::{
    CalendarSummary, ClassSizeBreakdown, ComputedSection, DistrictView, GradeLevelTotal, IpsEntry,
    LabelCount, MasterySummary, Overview, RankedSchool, RawSection, SchoolStaffing, SchoolSummary,
    StaffView, Statistics, StatusTallies,
  },
  staff::{AssignmentMode, EmploymentStatus, TeacherRecord},
};

/// Category label for events without one.
const UNCATEGORIZED: &str = "uncategorized";

fn mean(total: u32, count: u32) -> f64 {
  if count == 0 { 0.0 } else { f64::from(total) / f64::from(count) }
}

/// Class counts and sizes. Split membership is the recorded flag, nothing
/// else.
pub fn class_breakdown<'a>(classes: impl IntoIterator<Item = &'a ClassRecord>) -> ClassSizeBreakdown {
  let (mut split, mut standard, mut split_students, mut standard_students) = (0, 0, 0, 0);
  for class in classes {
    if class.is_split_class {
      split += 1;
      split_students = class.student_count.saturating_add(split_students);
    } else {
      standard += 1;
      standard_students = class.student_count.saturating_add(standard_students);
    }
  }
  ClassSizeBreakdown {
    total_classes:               split + standard,
    split_classes:               split,
    standard_classes:            standard,
    total_enrollment:            split_students.saturating_add(standard_students),
    average_split_class_size:    mean(split_students, split),
    average_standard_class_size: mean(standard_students, standard),
  }
}

/// Everything the computed views need to know about who is who.
struct Partition<'a> {
  schools:         Vec<&'a EnrichedSchool>,
  teachers:        Vec<&'a TeacherRecord>,
  office_teachers: Vec<&'a TeacherRecord>,
}

impl<'a> Partition<'a> {
  fn new(raw: &'a RawSection) -> Self {
    let office = raw.settings.district_office_uai.as_ref();
    let (office_teachers, teachers): (Vec<_>, Vec<_>) = raw
      .teachers
      .iter()
      .partition(|t| office.is_some() && t.school_uai.as_ref() == office);
    Self {
      schools: raw.schools.iter().filter(|s| !s.is_district_office).collect(),
      teachers,
      office_teachers,
    }
  }

  fn teachers_at(&self, uai: &Uai) -> u32 {
    self
      .teachers
      .iter()
      .filter(|t| t.school_uai.as_ref() == Some(uai))
      .count() as u32
  }
}

/// First published school-level social position index per school.
fn school_ips(raw: &RawSection) -> BTreeMap<&Uai, f64> {
  let mut ips = BTreeMap::new();
  for record in &raw.assessments {
    if let Some(index) = record.social_position_index.school {
      ips.entry(&record.uai).or_insert(index);
    }
  }
  ips
}

fn school_summaries(raw: &RawSection, partition: &Partition<'_>) -> Vec<SchoolSummary> {
  let ips = school_ips(raw);
  partition
    .schools
    .iter()
    .map(|school| SchoolSummary {
      uai:                   school.uai.clone(),
      name:                  school.name.clone(),
      commune:               school.commune.clone(),
      classes:               class_breakdown(school.classes()),
      specialized_units:     school.units().len() as u32,
      teachers:              partition.teachers_at(&school.uai),
      social_position_index: ips.get(&school.uai).copied(),
    })
    .collect()
}

fn rankings(summaries: &[SchoolSummary], top_n: usize) -> (Vec<RankedSchool>, Vec<RankedSchool>) {
  let ranked: Vec<RankedSchool> = summaries
    .iter()
    .map(|s| RankedSchool {
      uai:        s.uai.clone(),
      name:       s.name.clone(),
      enrollment: s.classes.total_enrollment,
    })
    .collect();

  let mut top = ranked.clone();
  top.sort_by(|a, b| b.enrollment.cmp(&a.enrollment));
  top.truncate(top_n);

  let mut bottom = ranked;
  bottom.sort_by_key(|s| s.enrollment);
  bottom.truncate(top_n);

  (top, bottom)
}

fn ips_ranking(summaries: &[SchoolSummary]) -> Vec<IpsEntry> {
  let mut entries: Vec<IpsEntry> = summaries
    .iter()
    .filter_map(|s| {
      Some(IpsEntry {
        uai:   s.uai.clone(),
        name:  s.name.clone(),
        index: s.social_position_index?,
      })
    })
    .collect();
  entries.sort_by(|a, b| b.index.total_cmp(&a.index));
  entries
}

/// Pupils per configured grade level. Class grade levels outside the
/// configured list are ignored.
///
/// The repartition map is built from the classes listed on structure
/// pages, keyed by each class's grade level. Assessment workbooks carry no
/// head counts, so they do not feed it.
fn grade_level_totals(raw: &RawSection, partition: &Partition<'_>) -> Vec<GradeLevelTotal> {
  let mut repartition: BTreeMap<String, u32> = BTreeMap::new();
  for class in partition.schools.iter().flat_map(|s| s.classes()) {
    let total = repartition
      .entry(class.grade_level.trim().to_uppercase())
      .or_default();
    *total = total.saturating_add(class.student_count);
  }
  raw
    .settings
    .grade_levels
    .iter()
    .map(|level| GradeLevelTotal {
      grade_level: level.clone(),
      students:    repartition
        .get(&level.trim().to_uppercase())
        .copied()
        .unwrap_or(0),
    })
    .collect()
}

fn mastery(raw: &RawSection) -> Vec<MasterySummary> {
  let mut groups: BTreeMap<(&str, &str), (u32, [f64; 3])> = BTreeMap::new();
  for record in &raw.assessments {
    let (count, sums) = groups
      .entry((record.subject.as_str(), record.grade_level.as_str()))
      .or_insert((0, [0.0; 3]));
    *count += 1;
    for (sum, rate) in sums.iter_mut().zip(record.mastery_group_rates) {
      *sum += rate;
    }
  }
  groups
    .into_iter()
    .map(|((subject, grade_level), (records, sums))| MasterySummary {
      subject: subject.to_string(),
      grade_level: grade_level.to_string(),
      records,
      mean_rates: sums.map(|s| s / f64::from(records)),
    })
    .collect()
}

fn enrollment_history(
  raw: &RawSection,
  school_year: SchoolYear,
  current: u32,
) -> Vec<EnrollmentPoint> {
  let mut history: Vec<EnrollmentPoint> = raw
    .enrollment_history
    .iter()
    .filter(|p| p.school_year != school_year)
    .copied()
    .collect();
  history.push(EnrollmentPoint {
    school_year,
    enrollment: current,
  });
  history.sort_by_key(|p| p.school_year);
  history
}

fn staff(raw: &RawSection, partition: &Partition<'_>) -> StaffView {
  let mut tallies = StatusTallies::default();
  let (mut permanent, mut temporary, mut with_relief) = (0, 0, 0);
  let mut full_time_equivalent = 0.0;

  for teacher in &partition.teachers {
    match teacher.employment_status {
      EmploymentStatus::Tenured => tallies.tenured += 1,
      EmploymentStatus::TraineeTeacher => tallies.trainee += 1,
      EmploymentStatus::Contractor => tallies.contractor += 1,
      EmploymentStatus::Other => tallies.other += 1,
    }
    match teacher.assignment_mode {
      Some(AssignmentMode::Permanent) => permanent += 1,
      Some(AssignmentMode::Temporary) => temporary += 1,
      None => {}
    }
    if teacher.relief_arrangement.is_some_and(|r| r > 0) {
      with_relief += 1;
    }
    full_time_equivalent += teacher.full_time_fraction;
  }

  StaffView {
    status_tallies: tallies,
    permanent,
    temporary,
    with_relief,
    full_time_equivalent,
    per_school: partition
      .schools
      .iter()
      .map(|s| SchoolStaffing {
        uai:      s.uai.clone(),
        teachers: partition.teachers_at(&s.uai),
      })
      .collect(),
    district_office: partition.office_teachers.iter().map(|t| (*t).clone()).collect(),
    resolution: raw.resolution,
  }
}

fn calendar_summary(raw: &RawSection) -> CalendarSummary {
  let mut by_month: BTreeMap<String, u32> = BTreeMap::new();
  let mut by_category: BTreeMap<String, u32> = BTreeMap::new();
  for event in &raw.calendar {
    *by_month
      .entry(event.starts_on.format("%Y-%m").to_string())
      .or_default() += 1;
    let category = match event.category.trim() {
      "" => UNCATEGORIZED,
      c => c,
    };
    *by_category.entry(category.to_string()).or_default() += 1;
  }
  let counts = |map: BTreeMap<String, u32>| -> Vec<LabelCount> {
    map
      .into_iter()
      .map(|(label, count)| LabelCount { label, count })
      .collect()
  };
  CalendarSummary {
    total_events: raw.calendar.len() as u32,
    by_month:     counts(by_month),
    by_category:  counts(by_category),
  }
}

/// Compute every view of the computed section.
pub fn aggregate(raw: &RawSection, school_year: SchoolYear) -> ComputedSection {
  let partition = Partition::new(raw);
  let summaries = school_summaries(raw, &partition);
  let (top_schools, bottom_schools) = rankings(&summaries, raw.settings.top_n);
  let class_sizes = class_breakdown(partition.schools.iter().flat_map(|s| s.classes()));

  let units = partition.schools.iter().flat_map(|s| s.units());
  let (unit_count, unit_enrollment) = units.fold((0, 0u32), |(n, e), u| {
    (n + 1, e.saturating_add(u.student_count))
  });

  let priority_schools: BTreeSet<&Uai> = raw
    .assessments
    .iter()
    .filter(|a| a.is_priority_network)
    .map(|a| &a.uai)
    .filter(|uai| partition.schools.iter().any(|s| &s.uai == *uai))
    .collect();

  let overview = Overview {
    school_year,
    total_schools: partition.schools.len() as u32,
    classes: class_sizes,
    specialized_units: unit_count,
    specialized_unit_enrollment: unit_enrollment,
    total_teachers: partition.teachers.len() as u32,
    district_office_personnel: partition.office_teachers.len() as u32,
    priority_network_schools: priority_schools.len() as u32,
  };

  let statistics = Statistics {
    class_sizes,
    grade_level_totals: grade_level_totals(raw, &partition),
    ips_ranking: ips_ranking(&summaries),
    mastery: mastery(raw),
    enrollment_history: enrollment_history(raw, school_year, class_sizes.total_enrollment),
  };

  ComputedSection {
    overview,
    statistics,
    staff: staff(raw, &partition),
    calendar_summary: calendar_summary(raw),
    district: DistrictView {
      schools: summaries,
      top_schools,
      bottom_schools,
    },
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use circo_core::{
    assessment::{AssessmentRecord, SocialPositionIndex},
    calendar::CalendarEvent,
    config::AggregationSettings,
    school::{NameSource, SchoolStructureRecord, SpecializedUnitRecord, UnitType},
    snapshot::ResolutionReport,
  };

  use super::*;

  fn uai(s: &str) -> Uai { Uai::parse(s).unwrap() }

  fn class(grade: &str, count: u32, split: bool) -> ClassRecord {
    ClassRecord {
      label:          grade.into(),
      teacher_label:  String::new(),
      grade_level:    grade.into(),
      student_count:  count,
      is_split_class: split,
    }
  }

  fn school(code: &str, classes: Vec<ClassRecord>) -> EnrichedSchool {
    EnrichedSchool {
      uai:                uai(code),
      name:               format!("Ecole {code}"),
      commune:            "Cayenne".into(),
      name_source:        NameSource::Identity,
      identity:           None,
      structure:          Some(SchoolStructureRecord {
        uai: uai(code),
        school_name: None,
        commune: None,
        classes,
        units: vec![],
        source_id: "t".into(),
      }),
      is_district_office: false,
    }
  }

  fn teacher(code: &str, status: EmploymentStatus) -> TeacherRecord {
    TeacherRecord {
      surname:            "X".into(),
      given_name:         "Y".into(),
      school_uai:         Some(uai(code)),
      school_name:        None,
      employment_status:  status,
      tenure_years:       1,
      grade_code:         String::new(),
      subject_specialty:  String::new(),
      full_time_fraction: 0.5,
      occupied_fraction:  0.5,
      assignment_mode:    Some(AssignmentMode::Temporary),
      relief_arrangement: Some(25),
      class_label:        None,
      grade_level:        None,
      student_count:      None,
    }
  }

  fn assessment(code: &str, ips: Option<f64>, priority: bool) -> AssessmentRecord {
    AssessmentRecord {
      uai:                   uai(code),
      school_year:           None,
      subject:               "Français".into(),
      grade_level:           "CP".into(),
      competency_label:      "Lire".into(),
      mastery_group_rates:   [0.2, 0.3, 0.5],
      social_position_index: SocialPositionIndex {
        school: ips,
        ..Default::default()
      },
      is_priority_network:   priority,
    }
  }

  fn raw(schools: Vec<EnrichedSchool>) -> RawSection {
    RawSection {
      schools,
      teachers: vec![],
      assessments: vec![],
      calendar: vec![],
      enrollment_history: vec![],
      settings: AggregationSettings::default(),
      resolution: ResolutionReport::default(),
    }
  }

  #[test]
  fn split_classes_from_flag_only() {
    let breakdown = class_breakdown(&[class("CE1-CE2", 11, true), class("CP", 20, false)]);
    assert_eq!(breakdown.total_classes, 2);
    assert_eq!(breakdown.split_classes, 1);
    assert_eq!(breakdown.standard_classes, 1);
    assert_eq!(breakdown.total_enrollment, 31);
    assert_eq!(breakdown.average_split_class_size, 11.0);
    assert_eq!(breakdown.average_standard_class_size, 20.0);

    // A small class is not split unless it says so.
    let small = class_breakdown(&[class("CP", 9, false)]);
    assert_eq!(small.split_classes, 0);
    assert_eq!(small.average_split_class_size, 0.0);
  }

  #[test]
  fn oversized_counts_saturate() {
    let breakdown = class_breakdown(&[class("CP", u32::MAX, false), class("CE1", 1, false)]);
    assert_eq!(breakdown.total_enrollment, u32::MAX);

    let computed = aggregate(
      &raw(vec![school("9730200E", vec![class("CP", u32::MAX, false), class("CP", 1, false)])]),
      SchoolYear::new(2024),
    );
    assert_eq!(computed.overview.classes.total_enrollment, u32::MAX);
    let cp = computed
      .statistics
      .grade_level_totals
      .iter()
      .find(|t| t.grade_level == "CP")
      .unwrap();
    assert_eq!(cp.students, u32::MAX);
  }

  #[test]
  fn units_excluded_from_classes() {
    let mut s = school("9730200E", vec![class("CP", 20, false)]);
    if let Some(structure) = s.structure.as_mut() {
      structure.units.push(SpecializedUnitRecord {
        label:         "ULIS".into(),
        unit_type:     UnitType::Inclusion,
        student_count: 12,
      });
    }
    let computed = aggregate(&raw(vec![s]), SchoolYear::new(2024));
    assert_eq!(computed.overview.classes.total_classes, 1);
    assert_eq!(computed.overview.classes.total_enrollment, 20);
    assert_eq!(computed.overview.specialized_units, 1);
    assert_eq!(computed.overview.specialized_unit_enrollment, 12);
  }

  #[test]
  fn district_office_kept_apart() {
    let mut office = school("9739999Z", vec![class("CP", 99, false)]);
    office.is_district_office = true;
    let mut input = raw(vec![school("9730200E", vec![class("CP", 20, false)]), office]);
    input.teachers = vec![
      teacher("9730200E", EmploymentStatus::Tenured),
      teacher("9739999Z", EmploymentStatus::Tenured),
      teacher("9739999Z", EmploymentStatus::Other),
    ];

    let computed = aggregate(&input, SchoolYear::new(2024));
    assert_eq!(computed.overview.total_schools, 1);
    assert_eq!(computed.overview.total_teachers, 1);
    assert_eq!(computed.overview.district_office_personnel, 2);
    assert_eq!(computed.overview.classes.total_enrollment, 20);
    assert_eq!(computed.staff.status_tallies, StatusTallies {
      tenured: 1,
      ..Default::default()
    });
    assert_eq!(computed.staff.district_office.len(), 2);
    assert_eq!(computed.staff.per_school.len(), 1);
    assert!(computed.district.top_schools.iter().all(|r| r.uai.as_str() != "9739999Z"));
  }

  #[test]
  fn rankings_are_stable() {
    let mut input = raw(vec![
      school("9730001A", vec![class("CP", 20, false)]),
      school("9730002B", vec![class("CP", 30, false)]),
      school("9730003C", vec![class("CP", 20, false)]),
      school("9730004D", vec![class("CP", 10, false)]),
    ]);
    input.settings.top_n = 3;
    let computed = aggregate(&input, SchoolYear::new(2024));
    let codes = |v: &[RankedSchool]| v.iter().map(|r| r.uai.to_string()).collect::<Vec<_>>();
    assert_eq!(codes(&computed.district.top_schools), ["9730002B", "9730001A", "9730003C"]);
    assert_eq!(codes(&computed.district.bottom_schools), ["9730004D", "9730001A", "9730003C"]);
  }

  #[test]
  fn ips_ranking_first_non_null_descending() {
    let mut input = raw(vec![
      school("9730001A", vec![]),
      school("9730002B", vec![]),
      school("9730003C", vec![]),
    ]);
    input.assessments = vec![
      assessment("9730001A", None, false),
      assessment("9730001A", Some(95.0), false),
      assessment("9730001A", Some(80.0), false),
      assessment("9730002B", Some(110.5), true),
      assessment("9730003C", None, true),
    ];
    let computed = aggregate(&input, SchoolYear::new(2024));
    let ranking: Vec<_> = computed
      .statistics
      .ips_ranking
      .iter()
      .map(|e| (e.uai.to_string(), e.index))
      .collect();
    assert_eq!(ranking, vec![("9730002B".to_string(), 110.5), ("9730001A".to_string(), 95.0)]);
    assert_eq!(computed.overview.priority_network_schools, 2);
  }

  #[test]
  fn unknown_grade_levels_ignored() {
    let input = raw(vec![school("9730200E", vec![
      class("CP", 20, false),
      class("cm2", 25, false),
      class("CP-CE1", 12, true),
      class("SEGPA", 8, false),
    ])]);
    let computed = aggregate(&input, SchoolYear::new(2024));
    let totals: Vec<_> = computed
      .statistics
      .grade_level_totals
      .iter()
      .map(|t| (t.grade_level.as_str(), t.students))
      .collect();
    assert_eq!(totals[0], ("TPS", 0));
    assert_eq!(totals[4], ("CP", 20));
    assert_eq!(totals[8], ("CM2", 25));
    assert_eq!(totals.iter().map(|(_, n)| n).sum::<u32>(), 45);
    assert_eq!(totals.len(), 9);
  }

  #[test]
  fn staff_and_calendar_views() {
    let mut input = raw(vec![school("9730200E", vec![])]);
    input.teachers = vec![
      teacher("9730200E", EmploymentStatus::Tenured),
      teacher("9730200E", EmploymentStatus::Contractor),
    ];
    input.calendar = vec![
      CalendarEvent {
        title:     "Conseil d'école".into(),
        category:  "Instance".into(),
        starts_on: NaiveDate::from_ymd_opt(2024, 11, 5).unwrap(),
        ends_on:   None,
      },
      CalendarEvent {
        title:     "Animation pédagogique".into(),
        category:  String::new(),
        starts_on: NaiveDate::from_ymd_opt(2024, 9, 18).unwrap(),
        ends_on:   None,
      },
    ];
    input.enrollment_history = vec![EnrollmentPoint {
      school_year: SchoolYear::new(2023),
      enrollment:  1500,
    }];

    let computed = aggregate(&input, SchoolYear::new(2024));
    assert_eq!(computed.staff.temporary, 2);
    assert_eq!(computed.staff.with_relief, 2);
    assert_eq!(computed.staff.full_time_equivalent, 1.0);
    assert_eq!(computed.staff.per_school[0].teachers, 2);

    let months: Vec<_> = computed.calendar_summary.by_month.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(months, ["2024-09", "2024-11"]);
    assert_eq!(computed.calendar_summary.by_category[1].label, UNCATEGORIZED);

    let history = &computed.statistics.enrollment_history;
    assert_eq!(history.len(), 2);
    assert_eq!(history[1], EnrollmentPoint {
      school_year: SchoolYear::new(2024),
      enrollment:  0,
    });
  }

  #[test]
  fn pure_over_repeated_calls() {
    let mut input = raw(vec![
      school("9730001A", vec![class("CP", 20, false), class("CE1-CE2", 11, true)]),
      school("9730002B", vec![class("MS", 27, false)]),
    ]);
    input.assessments = vec![assessment("9730002B", Some(101.0), false)];
    input.teachers = vec![teacher("9730001A", EmploymentStatus::TraineeTeacher)];

    let first = serde_json::to_string(&aggregate(&input, SchoolYear::new(2024))).unwrap();
    let second = serde_json::to_string(&aggregate(&input, SchoolYear::new(2024))).unwrap();
    assert_eq!(first, second);
  }
}

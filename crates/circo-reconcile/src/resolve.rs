//! Entity resolution: one enriched record per school, and teachers joined to
//! the class they teach.
//!
//! Resolution never fails. Joins that cannot be made are counted in the
//! [`ResolutionReport`] and the records involved are passed through as they
//! came.

use std::collections::{HashMap, HashSet};

use circo_core::{
  Uai,
  config::AggregationSettings,
  school::{DirectoryEntry, EnrichedSchool, NameSource, SchoolIdentityRecord, SchoolStructureRecord},
  snapshot::ResolutionReport,
  staff::TeacherRecord,
  text::normalize,
};

use crate::matching::{MatchTier, match_fragment, teacher_fragments};

fn non_empty(value: Option<&str>) -> Option<&str> {
  value.map(str::trim).filter(|v| !v.is_empty())
}

/// Merge identity, structure and directory records into one enriched record
/// per school code.
///
/// Order: identity records as given, then schools known only to the
/// structure export, then schools known only to the directory.
pub fn resolve_schools(
  identity: &[SchoolIdentityRecord],
  structure: &[SchoolStructureRecord],
  directory: &[DirectoryEntry],
  settings: &AggregationSettings,
) -> Vec<EnrichedSchool> {
  let identity_by_uai: HashMap<&Uai, &SchoolIdentityRecord> =
    identity.iter().map(|r| (&r.uai, r)).collect();
  let structure_by_uai: HashMap<&Uai, &SchoolStructureRecord> =
    structure.iter().map(|r| (&r.uai, r)).collect();
  let directory_by_uai: HashMap<&Uai, &DirectoryEntry> =
    directory.iter().map(|r| (&r.uai, r)).collect();

  let mut seen = HashSet::new();
  let order: Vec<&Uai> = identity
    .iter()
    .map(|r| &r.uai)
    .chain(structure.iter().map(|r| &r.uai))
    .chain(directory.iter().map(|r| &r.uai))
    .filter(|uai| seen.insert(*uai))
    .collect();

  order
    .into_iter()
    .map(|uai| {
      let identity = identity_by_uai.get(uai).copied();
      let structure = structure_by_uai.get(uai).copied();
      let entry = directory_by_uai.get(uai).copied();

      let (name, name_source) = [
        (non_empty(structure.and_then(|s| s.school_name.as_deref())), NameSource::Structure),
        (non_empty(identity.map(|i| i.name.as_str())), NameSource::Identity),
        (non_empty(entry.map(|d| d.name.as_str())), NameSource::Directory),
      ]
      .into_iter()
      .find_map(|(name, source)| name.map(|n| (n.to_string(), source)))
      .unwrap_or_else(|| (uai.to_string(), NameSource::RawCode));

      let commune = non_empty(structure.and_then(|s| s.commune.as_deref()))
        .or_else(|| non_empty(identity.map(|i| i.commune.as_str())))
        .or_else(|| non_empty(entry.map(|d| d.commune.as_str())))
        .unwrap_or_default();
      let commune = settings
        .commune_aliases
        .get(&normalize(commune))
        .cloned()
        .unwrap_or_else(|| commune.to_string());

      EnrichedSchool {
        uai: uai.clone(),
        name,
        commune,
        name_source,
        identity: identity.cloned(),
        structure: structure.cloned(),
        is_district_office: settings.district_office_uai.as_ref() == Some(uai),
      }
    })
    .collect()
}

/// Join each teacher to the first class of their school whose teacher label
/// matches them, filling the enrichment fields.
pub fn resolve_teachers(
  teachers: Vec<TeacherRecord>,
  schools: &[EnrichedSchool],
) -> (Vec<TeacherRecord>, ResolutionReport) {
  let by_uai: HashMap<&Uai, &EnrichedSchool> = schools.iter().map(|s| (&s.uai, s)).collect();
  let mut by_name: HashMap<String, &EnrichedSchool> = HashMap::new();
  for school in schools {
    by_name.entry(normalize(&school.name)).or_insert(school);
  }

  let mut report = ResolutionReport {
    schools: schools.len(),
    ..ResolutionReport::default()
  };

  let resolved = teachers
    .into_iter()
    .map(|mut teacher| {
      let school = teacher
        .school_uai
        .as_ref()
        .and_then(|uai| by_uai.get(uai))
        .or_else(|| {
          teacher
            .school_name
            .as_deref()
            .and_then(|name| by_name.get(&normalize(name)))
        })
        .copied();

      let Some(school) = school else {
        tracing::debug!(teacher = %teacher.display_name(), "no school for teacher");
        report.teachers_without_school += 1;
        return teacher;
      };
      teacher.school_uai.get_or_insert_with(|| school.uai.clone());

      let found = school.classes().iter().find_map(|class| {
        teacher_fragments(&class.teacher_label)
          .into_iter()
          .find_map(|f| match_fragment(f, &teacher.surname, &teacher.given_name))
          .map(|tier| (class, tier))
      });

      match found {
        Some((class, tier)) => {
          teacher.class_label = Some(class.label.clone());
          teacher.grade_level = Some(class.grade_level.clone());
          teacher.student_count = Some(class.student_count);
          report.teachers_matched += 1;
          match tier {
            MatchTier::ExactName => report.by_tier.exact_name += 1,
            MatchTier::SurnameInitial => report.by_tier.surname_initial += 1,
            MatchTier::CompactSurnameInitial => report.by_tier.compact_surname_initial += 1,
          }
        }
        None => {
          tracing::debug!(
            teacher = %teacher.display_name(),
            uai = %school.uai,
            "no class matches teacher"
          );
          report.teachers_unresolved += 1;
        }
      }
      teacher
    })
    .collect();

  tracing::info!(
    schools = report.schools,
    matched = report.teachers_matched,
    unresolved = report.teachers_unresolved,
    without_school = report.teachers_without_school,
    "resolution finished"
  );
  (resolved, report)
}

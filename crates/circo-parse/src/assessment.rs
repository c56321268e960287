//! National assessment workbooks: one row object per (school, subject,
//! grade, competency), headers matched by normalized name.

use std::collections::HashMap;

use circo_core::{
  SchoolYear, Uai,
  assessment::{AssessmentRecord, SocialPositionIndex},
  record::RecordBatch,
  text::normalize,
};
use serde_json::{Map, Value};

use crate::{
  ParsedDocument,
  cell::{number, sheet_rows, text},
  error::Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Column {
  Uai,
  Year,
  Subject,
  Grade,
  Competency,
  Group(usize),
  IpsSchool,
  IpsCircumscription,
  IpsAcademy,
  Priority,
}

/// Normalized header aliases. A header matches an alias exactly or when it
/// continues it after a space (`"groupe 1 (%)"`).
const HEADERS: &[(&str, Column)] = &[
  ("uai", Column::Uai),
  ("code uai", Column::Uai),
  ("annee", Column::Year),
  ("discipline", Column::Subject),
  ("matiere", Column::Subject),
  ("niveau", Column::Grade),
  ("competence", Column::Competency),
  ("groupe 1", Column::Group(0)),
  ("groupe 2", Column::Group(1)),
  ("groupe 3", Column::Group(2)),
  ("ips etablissement", Column::IpsSchool),
  ("ips ecole", Column::IpsSchool),
  ("ips circonscription", Column::IpsCircumscription),
  ("ips academie", Column::IpsAcademy),
  ("education prioritaire", Column::Priority),
];

fn column(header: &str) -> Option<Column> {
  let key = normalize(header);
  HEADERS
    .iter()
    .find(|(alias, _)| {
      key.strip_prefix(*alias)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(' '))
    })
    .map(|(_, c)| *c)
}

/// A share in `[0, 1]`. Values above one are percentages.
fn rate(value: Option<&Value>) -> f64 {
  let Some(v) = value.and_then(number) else {
    return 0.0;
  };
  let v = if v > 1.0 { v / 100.0 } else { v };
  v.clamp(0.0, 1.0)
}

fn record(row: &Map<String, Value>) -> Option<AssessmentRecord> {
  let mut cells: HashMap<Column, &Value> = HashMap::new();
  for (header, value) in row {
    if let Some(col) = column(header) {
      cells.entry(col).or_insert(value);
    }
  }
  let get = |c: Column| cells.get(&c).copied();
  let get_text = |c: Column| get(c).and_then(text).unwrap_or_default();

  let uai = get(Column::Uai)
    .and_then(text)
    .and_then(|t| Uai::parse(&t).ok())?;

  Some(AssessmentRecord {
    uai,
    school_year: get(Column::Year)
      .and_then(text)
      .and_then(|t| t.parse::<SchoolYear>().ok()),
    subject: get_text(Column::Subject),
    grade_level: get_text(Column::Grade),
    competency_label: get_text(Column::Competency),
    mastery_group_rates: [0, 1, 2].map(|i| rate(get(Column::Group(i)))),
    social_position_index: SocialPositionIndex {
      school:          get(Column::IpsSchool).and_then(number),
      circumscription: get(Column::IpsCircumscription).and_then(number),
      academy:         get(Column::IpsAcademy).and_then(number),
    },
    is_priority_network: get_text(Column::Priority) == "Oui",
  })
}

pub(crate) fn parse(input: &str, source_id: &str) -> Result<ParsedDocument> {
  let rows = sheet_rows(input, source_id)?;
  let mut records = Vec::with_capacity(rows.len());
  let mut skipped = 0;

  for row in &rows {
    match row.as_object().and_then(record) {
      Some(r) => records.push(r),
      None => skipped += 1,
    }
  }
  if skipped > 0 {
    tracing::debug!(source_id, skipped, "assessment rows without a school code");
  }

  Ok(ParsedDocument {
    batch: RecordBatch::Assessment(records),
    skipped,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::Error;

  fn records(parsed: &ParsedDocument) -> &[AssessmentRecord] {
    match &parsed.batch {
      RecordBatch::Assessment(v) => v,
      other => panic!("expected assessment batch, got {other:?}"),
    }
  }

  #[test]
  fn headers_matched_by_normalized_name() {
    let input = r#"[{
      "UAI": "9730200e",
      "Année": "2024-2025",
      "Discipline": "Français",
      "Niveau": "CP",
      "Compétence": "Lire des mots",
      "Groupe 1 (%)": 12.5,
      "Groupe 2 (%)": "40,5",
      "Groupe 3 (%)": 47,
      "IPS établissement": 88.4,
      "IPS circonscription": "92,1",
      "Education prioritaire": "Oui"
    }]"#;
    let parsed = parse(input, "evaluations.json").unwrap();
    let r = &records(&parsed)[0];
    assert_eq!(r.uai.as_str(), "9730200E");
    assert_eq!(r.school_year, Some(SchoolYear::new(2024)));
    assert_eq!(r.subject, "Français");
    assert_eq!(r.competency_label, "Lire des mots");
    assert_eq!(r.mastery_group_rates, [0.125, 0.405, 0.47]);
    assert_eq!(r.social_position_index.school, Some(88.4));
    assert_eq!(r.social_position_index.circumscription, Some(92.1));
    assert_eq!(r.social_position_index.academy, None);
    assert!(r.is_priority_network);
    assert_eq!(parsed.skipped, 0);
  }

  #[test]
  fn missing_values_default_and_priority_is_exact() {
    let input = r#"[{"uai": "9730200E", "groupe 1": 0.3, "education prioritaire": "oui"}]"#;
    let parsed = parse(input, "e").unwrap();
    let r = &records(&parsed)[0];
    assert_eq!(r.mastery_group_rates, [0.3, 0.0, 0.0]);
    assert_eq!(r.social_position_index, SocialPositionIndex::default());
    assert!(!r.is_priority_network);
    assert_eq!(r.school_year, None);
  }

  #[test]
  fn rows_without_code_are_skipped() {
    let input = r#"[{"uai": ""}, {"niveau": "CP"}, ["not", "an", "object"], {"UAI": "9730200E"}]"#;
    let parsed = parse(input, "e").unwrap();
    assert_eq!(records(&parsed).len(), 1);
    assert_eq!(parsed.skipped, 3);
  }

  #[test]
  fn group_headers_do_not_bleed() {
    assert_eq!(column("Groupe 1"), Some(Column::Group(0)));
    assert_eq!(column("groupe 10"), None);
    assert_eq!(column("Niveau scolaire"), Some(Column::Grade));
  }

  #[test]
  fn non_array_is_malformed() {
    let err = parse(r#""evaluations""#, "e").unwrap_err();
    assert!(matches!(err, Error::MalformedDocument { .. }));
  }
}

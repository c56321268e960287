//! Structure pages: the class and specialized-unit listing of one school.

use circo_core::{
  Uai,
  record::RecordBatch,
  school::{ClassRecord, SchoolStructureRecord, SpecializedUnitRecord, UnitType},
  text::normalize,
};

use crate::{
  ParsedDocument,
  cell::parse_number,
  error::{Error, Result},
  identity::{Extractor, Page, UAI_CHAIN},
  markup::{Row, first_match, hidden_field},
};

/// Markers of a row that opens a detail view, i.e. a data row.
const DETAIL_MARKERS: &[&str] = &["voirDetail", "detailClasse"];
/// Placeholder rows of an empty listing.
const NO_RESULT_SENTINELS: &[&str] = &["aucun resultat", "aucune donnee"];
/// Heading that separates ordinary classes from specialized units.
const GROUPINGS_HEADING: &str = "regroupements";
/// Largest believable head count for one class or unit.
const MAX_STUDENTS: f64 = 500.0;

/// Column positions of one table layout.
#[derive(Debug, Clone, Copy)]
struct Layout {
  min_cells: usize,
  label:     usize,
  teacher:   usize,
  grade:     usize,
  count:     usize,
  split:     usize,
}

/// The normal listing.
const SHORT: Layout = Layout {
  min_cells: 6,
  label:     1,
  teacher:   2,
  grade:     3,
  count:     4,
  split:     5,
};

/// The first listing of a page with column filters enabled.
const LONG: Layout = Layout {
  min_cells: 9,
  label:     2,
  teacher:   4,
  grade:     5,
  count:     7,
  split:     8,
};

const NAME_CHAIN: &[Extractor] = &[
  |p| hidden_field(p.html, "nomEcole"),
  |p| p.probe_any(&["nom de l'ecole", "denomination"]),
  |p| p.name_from_title(),
];

const COMMUNE_CHAIN: &[Extractor] = &[
  |p| hidden_field(p.html, "commune"),
  |p| p.probe_any(&["commune"]),
];

fn is_detail(row: &Row) -> bool {
  DETAIL_MARKERS.iter().any(|m| row.raw_contains(m))
}

fn is_no_result(row: &Row) -> bool {
  let text = normalize(&row.text());
  NO_RESULT_SENTINELS.iter().any(|s| text.contains(s))
}

fn count(cell: &str) -> Option<u32> {
  parse_number(cell)
    .filter(|n| (0.0..=MAX_STUDENTS).contains(n))
    .map(|n| n.round() as u32)
}

fn is_split(cell: &str) -> bool {
  matches!(normalize(cell).as_str(), "oui" | "x" | "1" | "dedoublee" | "dedouble")
}

fn unit_type(label: &str, kind: &str) -> UnitType {
  let text = normalize(&format!("{kind} {label}"));
  if text.contains("ulis") {
    UnitType::Inclusion
  } else if ["rased", "upe2a", "remediation"].iter().any(|k| text.contains(k)) {
    UnitType::Remediation
  } else {
    UnitType::Other
  }
}

fn class(row: &Row) -> Option<ClassRecord> {
  let layout = [LONG, SHORT]
    .into_iter()
    .find(|l| row.cells.len() >= l.min_cells)?;
  Some(ClassRecord {
    label:          row.cell(layout.label).to_string(),
    teacher_label:  row.cell(layout.teacher).to_string(),
    grade_level:    row.cell(layout.grade).to_string(),
    student_count:  count(row.cell(layout.count))?,
    is_split_class: is_split(row.cell(layout.split)),
  })
}

fn unit(row: &Row) -> Option<SpecializedUnitRecord> {
  if row.cells.len() < 4 {
    return None;
  }
  Some(SpecializedUnitRecord {
    label:         row.cell(1).to_string(),
    unit_type:     unit_type(row.cell(1), row.cell(2)),
    student_count: count(row.cell(3))?,
  })
}

pub(crate) fn parse(input: &str, source_id: &str) -> Result<ParsedDocument> {
  let page = Page::new(input);
  if page.tables.is_empty() {
    return Err(Error::malformed(source_id, "no table blocks found"));
  }

  let Some(uai) = first_match(&page, UAI_CHAIN).and_then(|u| Uai::parse(&u).ok()) else {
    tracing::warn!(source_id, "structure record rejected: no school code");
    return Ok(ParsedDocument {
      batch:   RecordBatch::Structure(Vec::new()),
      skipped: 1,
    });
  };

  let mut classes = Vec::new();
  let mut units = Vec::new();
  let mut skipped = 0;
  let mut in_groupings = false;

  for row in page.tables.iter().flat_map(|t| &t.rows) {
    if is_no_result(row) {
      continue;
    }
    if row.text_contains(GROUPINGS_HEADING) && !is_detail(row) {
      in_groupings = true;
      continue;
    }
    if !is_detail(row) {
      continue;
    }

    let accepted = if in_groupings {
      unit(row).map(|u| units.push(u)).is_some()
    } else {
      class(row).map(|c| classes.push(c)).is_some()
    };
    if !accepted {
      tracing::debug!(source_id, cells = row.cells.len(), "structure row skipped");
      skipped += 1;
    }
  }

  let record = SchoolStructureRecord {
    uai,
    school_name: first_match(&page, NAME_CHAIN),
    commune: first_match(&page, COMMUNE_CHAIN),
    classes,
    units,
    source_id: source_id.to_string(),
  };

  Ok(ParsedDocument {
    batch: RecordBatch::Structure(vec![record]),
    skipped,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn detail(cells: &[&str]) -> String {
    let tds: String = cells.iter().map(|c| format!("<td>{c}</td>")).collect();
    format!(r#"<tr class="ligne" onclick="voirDetail(1)">{tds}</tr>"#)
  }

  fn page(rows: &[String]) -> String {
    format!(
      r#"<title>Structure 9730200E - E.P.PU MORTIN</title>
      <input type="hidden" name="commune" value="Cayenne">
      <table><tr><th></th><th>Classe</th><th>Enseignant</th></tr>{}</table>"#,
      rows.concat()
    )
  }

  fn only(parsed: &ParsedDocument) -> &SchoolStructureRecord {
    match &parsed.batch {
      RecordBatch::Structure(v) if v.len() == 1 => &v[0],
      other => panic!("expected one structure record, got {other:?}"),
    }
  }

  #[test]
  fn short_layout_with_split_flag() {
    let html = page(&[
      detail(&["", "CP A", "DUPONT M.", "CP", "20", "Non"]),
      detail(&["", "CE1-CE2", "DURAND<br>LEROY", "CE1-CE2", "11", "Oui"]),
    ]);
    let parsed = parse(&html, "structure.html").unwrap();
    let s = only(&parsed);
    assert_eq!(s.uai.as_str(), "9730200E");
    assert_eq!(s.school_name.as_deref(), Some("E.P.PU MORTIN"));
    assert_eq!(s.commune.as_deref(), Some("Cayenne"));
    assert_eq!(s.classes.len(), 2);
    assert!(!s.classes[0].is_split_class);
    assert!(s.classes[1].is_split_class);
    assert_eq!(s.classes[1].teacher_label, "DURAND  LEROY");
    assert_eq!(s.enrollment(), 31);
    assert_eq!(parsed.skipped, 0);
  }

  #[test]
  fn long_layout_reads_shifted_columns() {
    let html = page(&[detail(&[
      "", "1", "CM1 B", "", "MARTIN Paul", "CM1", "", "24", "x",
    ])]);
    let parsed = parse(&html, "s").unwrap();
    let c = &only(&parsed).classes[0];
    assert_eq!(c.label, "CM1 B");
    assert_eq!(c.teacher_label, "MARTIN Paul");
    assert_eq!(c.grade_level, "CM1");
    assert_eq!(c.student_count, 24);
    assert!(c.is_split_class);
  }

  #[test]
  fn groupings_become_units_never_classes() {
    let html = page(&[
      detail(&["", "CP A", "DUPONT", "CP", "20", ""]),
      "<tr><td colspan=\"6\">Regroupements</td></tr>".to_string(),
      detail(&["", "ULIS école", "Dispositif", "12"]),
      detail(&["", "Groupe B", "RASED", "6"]),
      detail(&["", "Atelier", "Autre", "4"]),
    ]);
    let parsed = parse(&html, "s").unwrap();
    let s = only(&parsed);
    assert_eq!(s.classes.len(), 1);
    let types: Vec<_> = s.units.iter().map(|u| u.unit_type).collect();
    assert_eq!(types, vec![UnitType::Inclusion, UnitType::Remediation, UnitType::Other]);
    assert_eq!(s.enrollment(), 20);
  }

  #[test]
  fn sentinel_rows_dropped_and_short_rows_counted() {
    let html = page(&[
      r#"<tr onclick="voirDetail(0)"><td colspan="6">Aucun résultat</td></tr>"#.to_string(),
      detail(&["", "CP A", "DUPONT"]),
      detail(&["", "CP B", "LEROY", "CP", "vingt", "non"]),
    ]);
    let parsed = parse(&html, "s").unwrap();
    assert!(only(&parsed).classes.is_empty());
    assert_eq!(parsed.skipped, 2);
  }

  #[test]
  fn implausible_counts_are_skipped() {
    let html = page(&[
      detail(&["", "CP A", "DUPONT", "CP", "4294967295", "Non"]),
      detail(&["", "CP B", "LEROY", "CP", "1", "Non"]),
      "<tr><td>Regroupements</td></tr>".to_string(),
      detail(&["", "ULIS", "Dispositif", "99999999999"]),
    ]);
    let parsed = parse(&html, "s").unwrap();
    let s = only(&parsed);
    assert_eq!(s.classes.len(), 1);
    assert!(s.units.is_empty());
    assert_eq!(s.enrollment(), 1);
    assert_eq!(parsed.skipped, 2);
  }

  #[test]
  fn rows_without_marker_are_ignored() {
    let html = page(&["<tr><td></td><td>CP A</td><td>X</td><td>CP</td><td>20</td><td></td></tr>".into()]);
    let parsed = parse(&html, "s").unwrap();
    assert!(only(&parsed).classes.is_empty());
    assert_eq!(parsed.skipped, 0);
  }

  #[test]
  fn missing_code_rejects_record() {
    let html = format!("<table>{}</table>", detail(&["", "CP", "X", "CP", "20", ""]));
    let parsed = parse(&html, "s").unwrap();
    assert!(parsed.batch.is_empty());
    assert_eq!(parsed.skipped, 1);
  }
}

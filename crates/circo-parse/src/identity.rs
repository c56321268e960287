//! Identity pages: one school's identification, location and contacts.
//!
//! Table 0 is the identification block and table 1 the location block, but
//! the director and the affiliated secondary school move around between
//! export variants, so they are found by content probe. Every field is
//! resolved by an ordered chain of extractors; the first non-empty value
//! wins.

use circo_core::{Uai, record::RecordBatch, school::SchoolIdentityRecord};

use crate::{
  ParsedDocument,
  error::{Error, Result},
  markup::{Table, first_match, hidden_field, tables, titles},
};

/// A parsed page: raw markup plus its tables and titles.
pub(crate) struct Page<'a> {
  pub html:   &'a str,
  pub tables: Vec<Table>,
  pub titles: Vec<String>,
}

impl<'a> Page<'a> {
  pub fn new(html: &'a str) -> Self {
    Self {
      html,
      tables: tables(html),
      titles: titles(html),
    }
  }

  /// Probe one positional table for the first matching keyword.
  pub fn probe_at(&self, index: usize, keywords: &[&str]) -> Option<String> {
    let table = self.tables.get(index)?;
    keywords.iter().find_map(|k| table.probe(k))
  }

  /// Probe every table, in order, for the first matching keyword.
  pub fn probe_any(&self, keywords: &[&str]) -> Option<String> {
    keywords
      .iter()
      .find_map(|k| self.tables.iter().find_map(|t| t.probe(k)))
  }

  /// School code embedded in the title or heading.
  pub fn uai_from_title(&self) -> Option<Uai> {
    self.titles.iter().find_map(|t| Uai::find_in(t))
  }

  /// `"<UAI> - <NAME>"` in the title or heading: the text after the code.
  pub fn name_from_title(&self) -> Option<String> {
    self.titles.iter().find_map(|title| {
      let uai = Uai::find_in(title)?;
      let (_, after) = title.split_once(uai.as_str())?;
      let name = after.trim_start_matches(|c: char| c.is_whitespace() || "-–:".contains(c));
      (!name.is_empty()).then(|| name.trim().to_string())
    })
  }
}

// ─── Extractor chains ────────────────────────────────────────────────────────

const UAI_KEYWORDS: &[&str] = &["uai", "identifiant", "immatriculation"];
const NAME_KEYWORDS: &[&str] = &["denomination", "appellation", "nom de l'ecole"];

pub(crate) type Extractor = fn(&Page<'_>) -> Option<String>;

fn uai_text(value: Option<String>) -> Option<String> {
  value.and_then(|v| Uai::find_in(&v)).map(String::from)
}

pub(crate) const UAI_CHAIN: &[Extractor] = &[
  |p| uai_text(p.probe_at(0, UAI_KEYWORDS)),
  |p| uai_text(p.probe_any(UAI_KEYWORDS)),
  |p| p.uai_from_title().map(String::from),
  |p| uai_text(hidden_field(p.html, "uai")),
  |p| uai_text(hidden_field(p.html, "numeroUai")),
];

const NAME_CHAIN: &[Extractor] = &[
  |p| p.probe_at(0, NAME_KEYWORDS),
  |p| p.probe_any(NAME_KEYWORDS),
  |p| p.name_from_title(),
  |p| hidden_field(p.html, "nomEcole"),
];

const COMMUNE_CHAIN: &[Extractor] = &[
  |p| p.probe_at(1, &["commune", "localite"]),
  |p| p.probe_any(&["commune"]),
  |p| hidden_field(p.html, "commune"),
];

const DIRECTOR_CHAIN: &[Extractor] =
  &[|p| p.probe_any(&["directeur", "directrice", "direction"])];

const ADDRESS_CHAIN: &[Extractor] = &[
  |p| p.probe_at(1, &["adresse"]),
  |p| p.probe_any(&["adresse"]),
];

const PHONE_CHAIN: &[Extractor] = &[
  |p| p.probe_at(1, &["telephone", "tel"]),
  |p| p.probe_any(&["telephone"]),
];

const EMAIL_CHAIN: &[Extractor] = &[
  |p| p.probe_at(1, &["mel", "courriel", "email"]),
  |p| p.probe_any(&["courriel", "email"]),
];

const SECONDARY_CHAIN: &[Extractor] =
  &[|p| p.probe_any(&["college de secteur", "college de rattachement", "college"])];

const STATE_CHAIN: &[Extractor] = &[
  |p| p.probe_at(0, &["etat", "ouverture"]),
  |p| p.probe_any(&["etat de l'ecole"]),
];

// ─── Parser ──────────────────────────────────────────────────────────────────

/// Build the record for one page, or `None` when a required field is
/// missing.
pub(crate) fn extract(page: &Page<'_>, source_id: &str) -> Option<SchoolIdentityRecord> {
  let uai = first_match(page, UAI_CHAIN).and_then(|u| Uai::parse(&u).ok())?;
  let name = first_match(page, NAME_CHAIN)?;
  let optional = |chain: &[Extractor]| first_match(page, chain).unwrap_or_default();

  Some(SchoolIdentityRecord {
    uai,
    name,
    commune: optional(COMMUNE_CHAIN),
    director: optional(DIRECTOR_CHAIN),
    address: optional(ADDRESS_CHAIN),
    phone: optional(PHONE_CHAIN),
    email: optional(EMAIL_CHAIN),
    affiliated_secondary_school: optional(SECONDARY_CHAIN),
    opening_state: optional(STATE_CHAIN),
    source_id: source_id.to_string(),
  })
}

pub(crate) fn parse(input: &str, source_id: &str) -> Result<ParsedDocument> {
  let page = Page::new(input);
  if page.tables.is_empty() {
    return Err(Error::malformed(source_id, "no table blocks found"));
  }

  match extract(&page, source_id) {
    Some(record) => Ok(ParsedDocument {
      batch:   RecordBatch::Identity(vec![record]),
      skipped: 0,
    }),
    None => {
      tracing::warn!(source_id, "identity record rejected: school code or name missing");
      Ok(ParsedDocument {
        batch:   RecordBatch::Identity(Vec::new()),
        skipped: 1,
      })
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const FICHE: &str = r#"<html><head><title>Fiche école</title></head><body>
    <table>
      <tr><td>Identifiant (UAI)</td><td>9730200E</td></tr>
      <tr><td>D&eacute;nomination</td><td>E.P.PU MORTIN</td></tr>
      <tr><td>Etat</td><td>Ouvert</td></tr>
    </table>
    <table>
      <tr><td>Adresse</td><td>12 rue des Palmistes</td></tr>
      <tr><td>Commune</td><td>Cayenne</td></tr>
      <tr><td>T&eacute;l&eacute;phone</td><td>0594 30 00 00</td></tr>
      <tr><td>M&eacute;l</td><td>ce.9730200e@ac-guyane.fr</td></tr>
    </table>
    <table>
      <tr><td>Coll&egrave;ge de secteur</td><td>Collège Eugénie Tell-Eboué</td></tr>
      <tr><td>Directeur</td><td>Mme</td><td>DUPONT Marie</td></tr>
    </table>
    </body></html>"#;

  fn only(parsed: ParsedDocument) -> SchoolIdentityRecord {
    match parsed.batch {
      RecordBatch::Identity(mut v) if v.len() == 1 => v.remove(0),
      other => panic!("expected one identity record, got {other:?}"),
    }
  }

  #[test]
  fn full_page() {
    let r = only(parse(FICHE, "fiche.html").unwrap());
    assert_eq!(r.uai.as_str(), "9730200E");
    assert_eq!(r.name, "E.P.PU MORTIN");
    assert_eq!(r.commune, "Cayenne");
    assert_eq!(r.address, "12 rue des Palmistes");
    assert_eq!(r.phone, "0594 30 00 00");
    assert_eq!(r.email, "ce.9730200e@ac-guyane.fr");
    assert_eq!(r.director, "Mme DUPONT Marie");
    assert_eq!(r.affiliated_secondary_school, "Collège Eugénie Tell-Eboué");
    assert_eq!(r.opening_state, "Ouvert");
    assert_eq!(r.source_id, "fiche.html");
  }

  #[test]
  fn director_found_regardless_of_table_position() {
    let html = r#"<table><tr><td>Directrice</td><td>M. MARTIN Paul</td></tr></table>
      <table><tr><td>UAI</td><td>9730200E</td></tr><tr><td>Dénomination</td><td>X</td></tr></table>"#;
    let r = only(parse(html, "x").unwrap());
    assert_eq!(r.director, "M. MARTIN Paul");
    assert_eq!(r.uai.as_str(), "9730200E");
  }

  #[test]
  fn code_and_name_fall_back_to_title() {
    let html = r#"<title>Fiche 9730200E - E.P.PU MORTIN</title>
      <table><tr><td>Etat</td><td>Ouvert</td></tr></table>"#;
    let r = only(parse(html, "x").unwrap());
    assert_eq!(r.uai.as_str(), "9730200E");
    assert_eq!(r.name, "E.P.PU MORTIN");
  }

  #[test]
  fn code_and_name_fall_back_to_hidden_fields() {
    let html = r#"<input type="hidden" name="uai" value="9730311a">
      <input type="hidden" name="nomEcole" value="E.M.PU BALATA">
      <table><tr><td>Adresse</td><td>-</td></tr></table>"#;
    let r = only(parse(html, "x").unwrap());
    assert_eq!(r.uai.as_str(), "9730311A");
    assert_eq!(r.name, "E.M.PU BALATA");
  }

  #[test]
  fn missing_name_rejects_record_not_document() {
    let html = "<table><tr><td>UAI</td><td>9730200E</td></tr></table>";
    let parsed = parse(html, "x").unwrap();
    assert!(parsed.batch.is_empty());
    assert_eq!(parsed.skipped, 1);
  }

  #[test]
  fn missing_code_rejects_record() {
    let html = "<table><tr><td>Dénomination</td><td>E.P.PU MORTIN</td></tr></table>";
    let parsed = parse(html, "x").unwrap();
    assert!(parsed.batch.is_empty());
    assert_eq!(parsed.skipped, 1);
  }

  #[test]
  fn no_tables_is_malformed() {
    let err = parse("<html>erreur de session</html>", "broken.html").unwrap_err();
    assert!(matches!(err, Error::MalformedDocument { ref source_id, .. } if source_id == "broken.html"));
  }
}

//! School records: identity exports, structure exports, the directory of
//! record, and the enriched view the resolver assembles from all three.

use serde::{Deserialize, Serialize};

use crate::Uai;

// ─── Identity ────────────────────────────────────────────────────────────────

/// One school as described by its identity export. Required fields are `uai`
/// and `name`; every other field defaults to the empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolIdentityRecord {
  pub uai:                         Uai,
  pub name:                        String,
  #[serde(default)]
  pub commune:                     String,
  /// Civility and name, e.g. `"Mme DUPONT Marie"`.
  #[serde(default)]
  pub director:                    String,
  #[serde(default)]
  pub address:                     String,
  #[serde(default)]
  pub phone:                       String,
  #[serde(default)]
  pub email:                       String,
  #[serde(default)]
  pub affiliated_secondary_school: String,
  #[serde(default)]
  pub opening_state:               String,
  /// Identifier of the document this record was parsed from.
  #[serde(default)]
  pub source_id:                   String,
}

impl SchoolIdentityRecord {
  /// Apply `f` to every free-text field (not the code or the source id).
  pub fn map_text(mut self, f: impl Fn(&str) -> String) -> Self {
    for field in [
      &mut self.name,
      &mut self.commune,
      &mut self.director,
      &mut self.address,
      &mut self.phone,
      &mut self.email,
      &mut self.affiliated_secondary_school,
      &mut self.opening_state,
    ] {
      *field = f(field);
    }
    self
  }
}

// ─── Structure ───────────────────────────────────────────────────────────────

/// One ordinary class of a school.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassRecord {
  pub label:          String,
  /// Free text; co-teaching is expressed as names separated by runs of
  /// spaces.
  pub teacher_label:  String,
  pub grade_level:    String,
  pub student_count:  u32,
  /// Read from the source document; never inferred from `student_count`.
  pub is_split_class: bool,
}

/// The kind of a specialized unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitType {
  Inclusion,
  Remediation,
  Other,
}

/// A dedicated sub-structure (inclusion unit, remediation group). Its
/// enrollment is excluded from ordinary class statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecializedUnitRecord {
  pub label:         String,
  pub unit_type:     UnitType,
  pub student_count: u32,
}

/// The class structure of one school.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolStructureRecord {
  pub uai:         Uai,
  /// Name as printed on the structure export, when present.
  #[serde(default)]
  pub school_name: Option<String>,
  #[serde(default)]
  pub commune:     Option<String>,
  #[serde(default)]
  pub classes:     Vec<ClassRecord>,
  #[serde(default)]
  pub units:       Vec<SpecializedUnitRecord>,
  #[serde(default)]
  pub source_id:   String,
}

impl SchoolStructureRecord {
  pub fn enrollment(&self) -> u32 {
    self
      .classes
      .iter()
      .fold(0, |total, c| total.saturating_add(c.student_count))
  }
}

// ─── Directory of record ─────────────────────────────────────────────────────

/// A school as stored in the district's own directory; lowest-precedence
/// source for names and communes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryEntry {
  pub uai:     Uai,
  #[serde(default)]
  pub name:    String,
  #[serde(default)]
  pub commune: String,
}

// ─── Enriched ────────────────────────────────────────────────────────────────

/// Which source supplied an enriched school's display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameSource {
  Structure,
  Identity,
  Directory,
  RawCode,
}

/// Identity ⊕ structure for one school, with conflicts resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedSchool {
  pub uai:                Uai,
  pub name:               String,
  pub commune:            String,
  pub name_source:        NameSource,
  pub identity:           Option<SchoolIdentityRecord>,
  pub structure:          Option<SchoolStructureRecord>,
  /// True for the reserved administrative-office pseudo-school.
  pub is_district_office: bool,
}

impl EnrichedSchool {
  pub fn classes(&self) -> &[ClassRecord] {
    self.structure.as_ref().map(|s| s.classes.as_slice()).unwrap_or_default()
  }

  pub fn units(&self) -> &[SpecializedUnitRecord] {
    self.structure.as_ref().map(|s| s.units.as_slice()).unwrap_or_default()
  }
}

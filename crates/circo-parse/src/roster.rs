//! Roster workbooks: a flat sheet where schools and disciplines are
//! introduced by marker rows and teachers inherit both from the rows above
//! them.
//!
//! The sheet is read by an explicit reducer, [`step`], over [`RosterState`].
//! Each row yields exactly one [`RowOutcome`]; the caller folds the outcomes
//! into a batch and a skip count.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use circo_core::{
  Uai,
  config::ClassificationRules,
  record::RecordBatch,
  staff::{AssignmentMode, EmploymentStatus, TeacherRecord},
  text::normalize,
};
use regex::Regex;
use serde_json::Value;

use crate::{
  ParseContext, ParsedDocument,
  cell::{date, number, sheet_rows, text},
  error::Result,
};

/// `<UAI> <sep> <school name>` in the first column.
static BOUNDARY_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^\s*(\d{7}[A-Za-z])\s*[-–:]\s*(.+?)\s*$").unwrap());

mod col {
  pub const HEAD: usize = 0;
  pub const SURNAME: usize = 1;
  pub const GIVEN_NAME: usize = 2;
  pub const GRADE: usize = 3;
  pub const FULL_TIME: usize = 4;
  pub const OCCUPIED: usize = 5;
  pub const START: usize = 6;
  pub const END: usize = 7;
  pub const RELIEF: usize = 8;
}

// ─── State machine ───────────────────────────────────────────────────────────

/// The school a run of teacher rows belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchoolContext {
  pub uai:  Uai,
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterState {
  /// Before the first school boundary.
  NoSchool,
  InSchool {
    school:     SchoolContext,
    discipline: Option<String>,
  },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
  /// The name cell has no letter in it (totals, stray numbers).
  NoName,
  /// A repeated column header or a subtotal line.
  HeaderToken,
  /// The post is not occupied.
  NotStaffed,
  /// A teacher row before any school boundary.
  NoSchool,
}

impl DropReason {
  /// Header repetitions are layout, not lost data.
  pub fn counts_as_skipped(self) -> bool { !matches!(self, Self::HeaderToken) }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
  Boundary,
  Discipline,
  /// A blank or decorative row.
  Ignored,
  Teacher(Box<TeacherRecord>),
  Dropped(DropReason),
}

fn cell(row: &[Value], index: usize) -> Option<&Value> { row.get(index) }

fn cell_text(row: &[Value], index: usize) -> Option<String> { cell(row, index).and_then(text) }

fn boundary(head: &str) -> Option<SchoolContext> {
  let caps = BOUNDARY_RE.captures(head)?;
  Some(SchoolContext {
    uai:  Uai::parse(&caps[1]).ok()?,
    name: caps[2].to_string(),
  })
}

/// Consume one row.
pub fn step(state: RosterState, row: &[Value], ctx: &ParseContext) -> (RosterState, RowOutcome) {
  let head = cell_text(row, col::HEAD);

  if let Some(school) = head.as_deref().and_then(boundary) {
    return (
      RosterState::InSchool {
        school,
        discipline: None,
      },
      RowOutcome::Boundary,
    );
  }

  // Any other head text is the discipline of this row and the ones below.
  let state = match (state, &head) {
    (RosterState::InSchool { school, .. }, Some(discipline)) => RosterState::InSchool {
      school,
      discipline: Some(discipline.clone()),
    },
    (state, _) => state,
  };

  let Some(surname) = cell_text(row, col::SURNAME) else {
    let outcome = match head {
      Some(_) => RowOutcome::Discipline,
      None => RowOutcome::Ignored,
    };
    return (state, outcome);
  };

  let outcome = match teacher(&state, &surname, row, ctx) {
    Ok(record) => RowOutcome::Teacher(Box::new(record)),
    Err(reason) => RowOutcome::Dropped(reason),
  };
  (state, outcome)
}

fn teacher(
  state: &RosterState,
  surname: &str,
  row: &[Value],
  ctx: &ParseContext,
) -> Result<TeacherRecord, DropReason> {
  let rules = &ctx.rules;
  if !surname.chars().any(char::is_alphabetic) {
    return Err(DropReason::NoName);
  }
  let given_name = cell_text(row, col::GIVEN_NAME).unwrap_or_default();
  let key = normalize(surname);
  let full_key = normalize(&format!("{surname} {given_name}"));
  if rules
    .excluded_name_tokens
    .iter()
    .any(|t| *t == key || *t == full_key)
  {
    return Err(DropReason::HeaderToken);
  }
  let RosterState::InSchool { school, discipline } = state else {
    return Err(DropReason::NoSchool);
  };

  let occupied = fraction(cell(row, col::OCCUPIED)).unwrap_or(0.0);
  if occupied <= 0.0 {
    return Err(DropReason::NotStaffed);
  }

  let specialty = discipline.clone().unwrap_or_default();
  let grade_code = cell_text(row, col::GRADE).unwrap_or_default();
  let end = cell(row, col::END).and_then(date);

  Ok(TeacherRecord {
    surname: surname.to_string(),
    given_name,
    school_uai: Some(school.uai.clone()),
    school_name: Some(school.name.clone()),
    employment_status: classify(rules, &specialty, &grade_code),
    tenure_years: cell(row, col::START)
      .and_then(date)
      .map(|start| whole_years(start, ctx.as_of))
      .unwrap_or(0),
    grade_code,
    subject_specialty: specialty,
    full_time_fraction: fraction(cell(row, col::FULL_TIME)).unwrap_or(1.0),
    occupied_fraction: occupied,
    assignment_mode: Some(assignment_mode(rules, end)),
    relief_arrangement: cell(row, col::RELIEF).and_then(number).and_then(relief_percent),
    class_label: None,
    grade_level: None,
    student_count: None,
  })
}

// ─── Classification ──────────────────────────────────────────────────────────

/// A share of full time. Values above one are percentages.
fn fraction(value: Option<&Value>) -> Option<f64> {
  let v = value.and_then(number)?;
  Some(if v > 1.0 { v / 100.0 } else { v })
}

fn classify(rules: &ClassificationRules, specialty: &str, grade_code: &str) -> EmploymentStatus {
  let specialty = normalize(specialty);
  let is_trainee = !rules.trainee_keywords.is_empty()
    && rules
      .trainee_keywords
      .iter()
      .all(|k| specialty.contains(normalize(k).as_str()));
  if is_trainee {
    return EmploymentStatus::TraineeTeacher;
  }
  rules
    .status_for_grade(grade_code)
    .unwrap_or(EmploymentStatus::Other)
}

fn whole_years(from: NaiveDate, to: NaiveDate) -> u32 {
  let mut years = to.year() - from.year();
  if (to.month(), to.day()) < (from.month(), from.day()) {
    years -= 1;
  }
  years.max(0) as u32
}

fn assignment_mode(rules: &ClassificationRules, end: Option<NaiveDate>) -> AssignmentMode {
  let (from, to) = rules.permanent_end_years;
  match end {
    None => AssignmentMode::Permanent,
    Some(d) if (from..=to).contains(&d.year()) => AssignmentMode::Permanent,
    Some(_) => AssignmentMode::Temporary,
  }
}

fn relief_percent(v: f64) -> Option<u32> {
  if v <= 0.0 {
    return None;
  }
  let percent = if v <= 1.0 { v * 100.0 } else { v };
  Some(percent.round() as u32)
}

// ─── Document ────────────────────────────────────────────────────────────────

pub(crate) fn parse(input: &str, source_id: &str, ctx: &ParseContext) -> Result<ParsedDocument> {
  let rows = sheet_rows(input, source_id)?;
  let mut state = RosterState::NoSchool;
  let mut teachers = Vec::new();
  let mut skipped = 0;

  for (index, row) in rows.iter().enumerate() {
    let Some(cells) = row.as_array() else {
      continue;
    };
    let (next, outcome) = step(state, cells, ctx);
    state = next;
    match outcome {
      RowOutcome::Teacher(record) => teachers.push(*record),
      RowOutcome::Dropped(reason) if reason.counts_as_skipped() => {
        tracing::trace!(source_id, row = index, ?reason, "roster row dropped");
        skipped += 1;
      }
      _ => {}
    }
  }

  Ok(ParsedDocument {
    batch: RecordBatch::Roster(teachers),
    skipped,
  })
}

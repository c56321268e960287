//! Identifier newtypes: school codes and school years.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Uai ─────────────────────────────────────────────────────────────────────

/// Canonical school code: seven digits followed by one upper-case letter
/// (e.g. `9730200E`).
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Uai(String);

impl Uai {
  /// Parse a code, tolerating surrounding whitespace and a lower-case letter.
  pub fn parse(s: &str) -> Result<Self> {
    let s = s.trim();
    let bytes = s.as_bytes();
    let valid = bytes.len() == 8
      && bytes[..7].iter().all(u8::is_ascii_digit)
      && bytes[7].is_ascii_alphabetic();
    if !valid {
      return Err(Error::InvalidUai(s.to_string()));
    }
    Ok(Self(s.to_ascii_uppercase()))
  }

  /// Locate the first standalone school code in free text.
  pub fn find_in(text: &str) -> Option<Self> {
    let bytes = text.as_bytes();
    if bytes.len() < 8 {
      return None;
    }
    for start in 0..=bytes.len() - 8 {
      let window = &bytes[start..start + 8];
      if !window[..7].iter().all(u8::is_ascii_digit) || !window[7].is_ascii_alphabetic() {
        continue;
      }
      let before_ok = start == 0 || !bytes[start - 1].is_ascii_alphanumeric();
      let after_ok = bytes
        .get(start + 8)
        .is_none_or(|b| !b.is_ascii_alphanumeric());
      if before_ok && after_ok {
        // The window is pure ASCII, so this slice is on char boundaries.
        return Self::parse(&text[start..start + 8]).ok();
      }
    }
    None
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Uai {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl FromStr for Uai {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Self::parse(s) }
}

impl TryFrom<String> for Uai {
  type Error = Error;

  fn try_from(s: String) -> Result<Self> { Self::parse(&s) }
}

impl From<Uai> for String {
  fn from(uai: Uai) -> Self { uai.0 }
}

// ─── SchoolYear ──────────────────────────────────────────────────────────────

/// A school year, identified by the calendar year in which it starts.
/// Rendered as `"2024-2025"`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct SchoolYear(i32);

impl SchoolYear {
  /// Earliest start year.
  pub const FIRST: i32 = 1900;
  /// Latest start year whose `"start-end"` form still has a four-digit end.
  pub const LAST: i32 = 9998;

  /// Starts outside [`Self::FIRST`]`..=`[`Self::LAST`] are clamped, so every
  /// value reads back from its own display form.
  pub fn new(start: i32) -> Self { Self(start.clamp(Self::FIRST, Self::LAST)) }

  pub fn start(self) -> i32 { self.0 }

  /// The school year that follows this one, or `None` after
  /// [`Self::LAST`].
  pub fn next(self) -> Option<Self> { (self.0 < Self::LAST).then(|| Self(self.0 + 1)) }
}

impl fmt::Display for SchoolYear {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}", self.0, self.0 + 1)
  }
}

impl FromStr for SchoolYear {
  type Err = Error;

  /// Accepts `2024-2025`, `2024/2025` or a bare `2024`.
  fn from_str(s: &str) -> Result<Self> {
    let invalid = || Error::InvalidSchoolYear(s.to_string());
    let trimmed = s.trim();
    let (first, second) = match trimmed.split_once(['-', '/']) {
      Some((a, b)) => (a.trim(), Some(b.trim())),
      None => (trimmed, None),
    };
    let start: i32 = first.parse().map_err(|_| invalid())?;
    if !(Self::FIRST..=Self::LAST).contains(&start) {
      return Err(invalid());
    }
    if let Some(second) = second {
      let end: i32 = second.parse().map_err(|_| invalid())?;
      if end != start + 1 {
        return Err(invalid());
      }
    }
    Ok(Self(start))
  }
}

impl TryFrom<String> for SchoolYear {
  type Error = Error;

  fn try_from(s: String) -> Result<Self> { s.parse() }
}

impl From<SchoolYear> for String {
  fn from(year: SchoolYear) -> Self { year.to_string() }
}

//! Lenient coercion of workbook cells.
//!
//! Sheets come out of spreadsheet exports where the same column can hold a
//! number, a numeric string with a decimal comma, a percentage or nothing.

use chrono::{Days, NaiveDate};
use serde_json::Value;

use crate::error::{Error, Result};

const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y"];

/// The rows of a sheet export: either a bare JSON array or an object
/// carrying it under `rows`.
pub(crate) fn sheet_rows(input: &str, source_id: &str) -> Result<Vec<Value>> {
  let value: Value = serde_json::from_str(input)
    .map_err(|e| Error::malformed(source_id, format!("invalid sheet export: {e}")))?;
  match value {
    Value::Array(rows) => Ok(rows),
    Value::Object(mut sheet) => match sheet.remove("rows") {
      Some(Value::Array(rows)) => Ok(rows),
      _ => Err(Error::malformed(source_id, "sheet export has no rows array")),
    },
    _ => Err(Error::malformed(source_id, "sheet export is not an array of rows")),
  }
}

/// Trimmed textual form of a cell. `null` and empty strings yield `None`.
pub(crate) fn text(value: &Value) -> Option<String> {
  let text = match value {
    Value::Null => return None,
    Value::String(s) => s.trim().to_string(),
    Value::Number(n) => n.to_string(),
    Value::Bool(b) => b.to_string(),
    Value::Array(_) | Value::Object(_) => return None,
  };
  (!text.is_empty()).then_some(text)
}

/// Numeric value of a cell. Accepts `"12,5"`, `"45 %"` and `"1 200"`.
pub(crate) fn number(value: &Value) -> Option<f64> {
  match value {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => parse_number(s),
    Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
    _ => None,
  }
}

/// Numeric value of free text, with the same leniency as [`number`].
pub(crate) fn parse_number(text: &str) -> Option<f64> {
  let cleaned: String = text
    .chars()
    .filter(|c| !c.is_whitespace() && *c != '%')
    .map(|c| if c == ',' { '.' } else { c })
    .collect();
  cleaned.parse().ok().filter(|v: &f64| v.is_finite())
}

/// Calendar date of a cell: a serial day count or a formatted string.
pub(crate) fn date(value: &Value) -> Option<NaiveDate> {
  match value {
    Value::Number(n) => from_serial(n.as_f64()?),
    Value::String(s) => {
      let s = s.trim();
      // Exports sometimes append a midnight time.
      let s = s.split_whitespace().next().unwrap_or_default();
      DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| s.parse::<f64>().ok().and_then(from_serial))
    }
    _ => None,
  }
}

fn from_serial(days: f64) -> Option<NaiveDate> {
  if !(0.0..=2_958_465.0).contains(&days) {
    return None;
  }
  // Day zero of spreadsheet serial dates.
  NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(days.trunc() as u64))
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn sheet_shapes() {
    assert_eq!(sheet_rows("[[1], [2]]", "s").unwrap().len(), 2);
    assert_eq!(sheet_rows(r#"{"name": "Feuil1", "rows": [{}]}"#, "s").unwrap().len(), 1);
    assert!(sheet_rows(r#"{"name": "Feuil1"}"#, "s").is_err());
    assert!(sheet_rows("42", "s").is_err());
    assert!(sheet_rows("PK\u{3}\u{4}", "s").is_err());
  }

  #[test]
  fn text_is_trimmed_and_blank_is_none() {
    assert_eq!(text(&json!("  Mme  ")).as_deref(), Some("Mme"));
    assert_eq!(text(&json!(12)).as_deref(), Some("12"));
    assert_eq!(text(&json!("   ")), None);
    assert_eq!(text(&Value::Null), None);
  }

  #[test]
  fn numbers_tolerate_locale_noise() {
    assert_eq!(number(&json!("12,5")), Some(12.5));
    assert_eq!(number(&json!("45 %")), Some(45.0));
    assert_eq!(number(&json!("1 200")), Some(1200.0));
    assert_eq!(number(&json!(0.75)), Some(0.75));
    assert_eq!(number(&json!("n/a")), None);
    assert_eq!(number(&Value::Null), None);
  }

  #[test]
  fn dates_from_serials_and_strings() {
    let d = NaiveDate::from_ymd_opt(2019, 9, 1).unwrap();
    assert_eq!(date(&json!(43709)), Some(d));
    assert_eq!(date(&json!("43709")), Some(d));
    assert_eq!(date(&json!("01/09/2019")), Some(d));
    assert_eq!(date(&json!("2019-09-01")), Some(d));
    assert_eq!(date(&json!("01/09/2019 00:00:00")), Some(d));
    assert_eq!(date(&json!("bientôt")), None);
    assert_eq!(date(&json!(-3)), None);
  }
}

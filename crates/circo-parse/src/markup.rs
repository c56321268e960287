//! Table extraction from exported markup pages.
//!
//! Pipeline:
//!   raw &str
//!     └─ tables()            → Vec<Table>
//!          └─ rows / cells   → cleaned cell text
//!               └─ probe()   → labelled values, wherever the table sits
//!
//! The exports are not well-formed XML, so blocks are located with
//! case-insensitive patterns rather than a tree parser.

use std::{borrow::Cow, sync::LazyLock};

use circo_core::text::{collapse_whitespace, normalize};
use regex::Regex;

static TABLE_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?is)<table\b[^>]*>(.*?)</table\s*>").unwrap());
static ROW_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr\s*>").unwrap());
static CELL_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?is)<t[dh]\b[^>]*>(.*?)</t[dh]\s*>").unwrap());
static BREAK_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static TITLE_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?is)<(title|h1)\b[^>]*>(.*?)</(title|h1)\s*>").unwrap());
static INPUT_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?is)<input\b[^>]*>").unwrap());
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r#"(?is)([a-z_:][-a-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).unwrap()
});

// ─── Text cleaning ───────────────────────────────────────────────────────────

/// Named references that show up in the exports beyond the XML five.
fn resolve_entity(name: &str) -> Option<&'static str> {
  Some(match name {
    "amp" => "&",
    "lt" => "<",
    "gt" => ">",
    "quot" => "\"",
    "apos" => "'",
    "nbsp" => "\u{a0}",
    "eacute" => "é",
    "egrave" => "è",
    "ecirc" => "ê",
    "euml" => "ë",
    "agrave" => "à",
    "acirc" => "â",
    "ccedil" => "ç",
    "icirc" => "î",
    "iuml" => "ï",
    "ocirc" => "ô",
    "ugrave" => "ù",
    "ucirc" => "û",
    "uuml" => "ü",
    "oelig" => "œ",
    "Eacute" => "É",
    "Egrave" => "È",
    "Ecirc" => "Ê",
    "Agrave" => "À",
    "Ccedil" => "Ç",
    "laquo" => "«",
    "raquo" => "»",
    "rsquo" => "’",
    "lsquo" => "‘",
    "deg" => "°",
    _ => return None,
  })
}

/// Decode character references. Text with a stray `&` or an unknown
/// reference is kept verbatim.
pub(crate) fn decode_entities(raw: &str) -> Cow<'_, str> {
  if !raw.contains('&') {
    return Cow::Borrowed(raw);
  }
  quick_xml::escape::unescape_with(raw, resolve_entity).unwrap_or(Cow::Borrowed(raw))
}

/// Strip markup, decode references and collapse whitespace. Line breaks
/// become a double space, which is how co-teaching is listed in a cell.
pub(crate) fn clean(fragment: &str) -> String {
  let with_breaks = BREAK_RE.replace_all(fragment, "\u{1f}");
  let without_tags = TAG_RE.replace_all(&with_breaks, " ");
  decode_entities(&without_tags)
    .split('\u{1f}')
    .map(collapse_whitespace)
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join("  ")
}

// ─── Tables ──────────────────────────────────────────────────────────────────

/// One table row: its raw markup (for marker detection) and its cells.
#[derive(Debug, Clone)]
pub(crate) struct Row {
  pub raw:   String,
  pub cells: Vec<String>,
}

impl Row {
  pub fn text(&self) -> String { self.cells.join(" ") }

  /// Case-insensitive search in the raw markup (attributes included).
  pub fn raw_contains(&self, needle: &str) -> bool {
    self.raw.to_lowercase().contains(&needle.to_lowercase())
  }

  /// Normalized search in the cell text.
  pub fn text_contains(&self, needle: &str) -> bool {
    normalize(&self.text()).contains(&normalize(needle))
  }

  pub fn cell(&self, index: usize) -> &str {
    self.cells.get(index).map(String::as_str).unwrap_or_default()
  }
}

#[derive(Debug, Clone)]
pub(crate) struct Table {
  pub rows: Vec<Row>,
}

impl Table {
  /// Value of the first row whose label cell contains `keyword`.
  ///
  /// The label is the first non-empty cell. The value is every following
  /// non-empty cell joined by a space, or, for `Label : value` cells, the
  /// text after the colon.
  pub fn probe(&self, keyword: &str) -> Option<String> {
    let keyword = normalize(keyword);
    for row in &self.rows {
      let mut cells = row.cells.iter().filter(|c| !c.is_empty());
      let Some(label) = cells.next() else { continue };
      if !normalize(label).contains(&keyword) {
        continue;
      }
      let rest: Vec<&str> = cells.map(String::as_str).collect();
      if !rest.is_empty() {
        return Some(rest.join(" "));
      }
      if let Some((_, value)) = label.split_once(':') {
        let value = value.trim();
        if !value.is_empty() {
          return Some(value.to_string());
        }
      }
    }
    None
  }
}

/// Every `<table>` block of the page, in document order.
pub(crate) fn tables(html: &str) -> Vec<Table> {
  TABLE_RE
    .captures_iter(html)
    .map(|table| {
      let rows = ROW_RE
        .captures_iter(&table[1])
        .map(|row| Row {
          raw:   row[0].to_string(),
          cells: CELL_RE
            .captures_iter(&row[1])
            .map(|cell| clean(&cell[1]))
            .collect(),
        })
        .collect();
      Table { rows }
    })
    .collect()
}

// ─── Page-level fallbacks ────────────────────────────────────────────────────

/// Text of the page `<title>`, then of the first `<h1>`.
pub(crate) fn titles(html: &str) -> Vec<String> {
  TITLE_RE
    .captures_iter(html)
    .map(|c| clean(&c[2]))
    .filter(|t| !t.is_empty())
    .collect()
}

/// Value of `<input type="hidden" name="{name}" value="…">`, if present.
pub(crate) fn hidden_field(html: &str, name: &str) -> Option<String> {
  INPUT_RE.find_iter(html).find_map(|input| {
    let mut kind = None;
    let mut field = None;
    let mut value = None;
    for attr in ATTR_RE.captures_iter(input.as_str()) {
      let v = attr
        .get(2)
        .or_else(|| attr.get(3))
        .or_else(|| attr.get(4))
        .map(|m| m.as_str())
        .unwrap_or_default();
      match attr[1].to_ascii_lowercase().as_str() {
        "type" => kind = Some(v.to_ascii_lowercase()),
        "name" | "id" if field.is_none() => field = Some(v.to_string()),
        "value" => value = Some(clean(v)),
        _ => {}
      }
    }
    (kind.as_deref() == Some("hidden") && field.as_deref() == Some(name))
      .then_some(value)
      .flatten()
      .filter(|v| !v.is_empty())
  })
}

/// Evaluate `extractors` in order and keep the first non-empty result.
pub(crate) fn first_match<C: ?Sized>(
  ctx: &C,
  extractors: &[fn(&C) -> Option<String>],
) -> Option<String> {
  extractors
    .iter()
    .filter_map(|extract| extract(ctx))
    .map(|v| v.trim().to_string())
    .find(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cleans_markup_and_entities() {
    assert_eq!(clean("<b>Coll&egrave;ge</b>&nbsp;&nbsp;Eug&#233;ne"), "Collège Eugéne");
    assert_eq!(clean("A & B"), "A & B");
    assert_eq!(clean("&unknown; text"), "&unknown; text");
  }

  #[test]
  fn line_breaks_separate_names() {
    assert_eq!(clean("DURAND Anne<br/>LEROY Paul"), "DURAND Anne  LEROY Paul");
    assert_eq!(clean("<br>\n  DUPONT\n<BR >"), "DUPONT");
  }

  #[test]
  fn tables_rows_and_cells() {
    let html = r##"
      <TABLE class="a"><tr><th>UAI</th><td> 9730200E </td></tr>
      <tr><td>Nom</td><td><a href="#">E.P.PU  MORTIN</a></td></tr></TABLE>
      <table><tr><td>Commune</td><td>Cayenne</td></tr></table>"##;
    let t = tables(html);
    assert_eq!(t.len(), 2);
    assert_eq!(t[0].rows.len(), 2);
    assert_eq!(t[0].rows[1].cells, vec!["Nom", "E.P.PU MORTIN"]);
    assert_eq!(t[1].probe("commune").as_deref(), Some("Cayenne"));
  }

  #[test]
  fn probe_joins_value_cells_and_reads_colon_labels() {
    let html = "<table><tr><td>Directeur</td><td>Mme</td><td></td><td>DUPONT Marie</td></tr>\
                <tr><td>Téléphone : 0594 00 00 00</td></tr></table>";
    let t = &tables(html)[0];
    assert_eq!(t.probe("directeur").as_deref(), Some("Mme DUPONT Marie"));
    assert_eq!(t.probe("telephone").as_deref(), Some("0594 00 00 00"));
    assert_eq!(t.probe("fax"), None);
  }

  #[test]
  fn hidden_field_lookup() {
    let html = r#"<form><input type="text" name="uai" value="nope">
      <input name='uai' type='HIDDEN' value='9730200E'></form>"#;
    assert_eq!(hidden_field(html, "uai").as_deref(), Some("9730200E"));
    assert_eq!(hidden_field(html, "nomEcole"), None);
  }

  #[test]
  fn first_match_short_circuits() {
    fn none(_: &str) -> Option<String> { None }
    fn blank(_: &str) -> Option<String> { Some("  ".into()) }
    fn echo(s: &str) -> Option<String> { Some(s.to_string()) }
    fn boom(_: &str) -> Option<String> { panic!("evaluated past first match") }

    assert_eq!(first_match("x", &[none, blank, echo, boom]).as_deref(), Some("x"));
  }
}

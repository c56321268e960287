//! Text normalization shared by the parser and the entity resolver.
//!
//! [`normalize`] produces the join key used for every name-based match. It
//! is total and idempotent: `normalize(normalize(s)) == normalize(s)`.

use std::borrow::Cow;

/// Windows-1252 for bytes `0x80..=0x9F`. The five unassigned bytes keep the
/// C1 control of the same value.
const CP1252_HIGH: [char; 32] = [
  '\u{20ac}', '\u{81}', '\u{201a}', '\u{192}', '\u{201e}', '\u{2026}', '\u{2020}', '\u{2021}',
  '\u{2c6}', '\u{2030}', '\u{160}', '\u{2039}', '\u{152}', '\u{8d}', '\u{17d}', '\u{8f}',
  '\u{90}', '\u{2018}', '\u{2019}', '\u{201c}', '\u{201d}', '\u{2022}', '\u{2013}', '\u{2014}',
  '\u{2dc}', '\u{2122}', '\u{161}', '\u{203a}', '\u{153}', '\u{9d}', '\u{17e}', '\u{178}',
];

/// Known UTF-8-read-as-Latin-1 sequences and their repaired form. Longer
/// sequences come first so that prefixes never shadow them.
const LEGACY_REPAIRS: &[(&str, &str)] = &[
  ("â€™", "’"),
  ("â€œ", "“"),
  ("â€\u{9d}", "”"),
  ("â€“", "–"),
  ("â€”", "—"),
  ("Ã©", "é"),
  ("Ã¨", "è"),
  ("Ãª", "ê"),
  ("Ã«", "ë"),
  ("Ã\u{a0}", "à"),
  ("Ã¢", "â"),
  ("Ã¤", "ä"),
  ("Ã®", "î"),
  ("Ã¯", "ï"),
  ("Ã´", "ô"),
  ("Ã¶", "ö"),
  ("Ã¹", "ù"),
  ("Ã»", "û"),
  ("Ã¼", "ü"),
  ("Ã§", "ç"),
  ("Ã‰", "É"),
  ("Ãˆ", "È"),
  ("ÃŠ", "Ê"),
  ("Ã€", "À"),
  ("Ã‡", "Ç"),
  ("Ã”", "Ô"),
  ("Å“", "œ"),
  ("Â°", "°"),
  ("Â\u{a0}", " "),
];

/// Lower-case Latin letters with diacritics and their bare form.
fn fold_char(c: char) -> Option<&'static str> {
  Some(match c {
    'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => "a",
    'ç' => "c",
    'è' | 'é' | 'ê' | 'ë' => "e",
    'ì' | 'í' | 'î' | 'ï' => "i",
    'ñ' => "n",
    'ò' | 'ó' | 'ô' | 'õ' | 'ö' => "o",
    'ù' | 'ú' | 'û' | 'ü' => "u",
    'ý' | 'ÿ' => "y",
    'œ' => "oe",
    'æ' => "ae",
    _ => return None,
  })
}

fn is_separator(c: char) -> bool {
  c.is_whitespace() || matches!(c, '-' | '‐' | '–' | '—' | '_')
}

/// Lower-case, strip diacritics, collapse hyphen/whitespace runs into single
/// spaces and trim.
pub fn normalize(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  let mut pending_space = false;

  for c in text.chars().flat_map(char::to_lowercase) {
    if is_separator(c) {
      pending_space = !out.is_empty();
      continue;
    }
    // Combining diacritical marks left over from decomposed input.
    if ('\u{300}'..='\u{36f}').contains(&c) {
      continue;
    }
    if pending_space {
      out.push(' ');
      pending_space = false;
    }
    match fold_char(c) {
      Some(folded) => out.push_str(folded),
      None => out.push(c),
    }
  }
  out
}

/// [`normalize`] with every separator removed, for hyphen/space-insensitive
/// comparisons (`"LE-GALL"` and `"Le Gall"` both give `"legall"`).
pub fn compact(text: &str) -> String {
  normalize(text).replace(' ', "")
}

/// Collapse whitespace runs (including non-breaking spaces) and trim.
pub fn collapse_whitespace(text: &str) -> String {
  text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode an exported document's bytes. Valid UTF-8 is borrowed as is;
/// anything else is read as Windows-1252, which every byte decodes under.
pub fn decode_export(bytes: &[u8]) -> Cow<'_, str> {
  match std::str::from_utf8(bytes) {
    Ok(text) => Cow::Borrowed(text),
    Err(_) => Cow::Owned(
      bytes
        .iter()
        .map(|&b| match b {
          0x80..=0x9f => CP1252_HIGH[usize::from(b - 0x80)],
          _ => char::from(b),
        })
        .collect(),
    ),
  }
}

/// Repair text that was decoded with the wrong legacy encoding.
pub fn repair_legacy_encoding(text: &str) -> String {
  if !text.contains(['Ã', 'Â', 'â', 'Å']) {
    return text.to_string();
  }
  LEGACY_REPAIRS
    .iter()
    .fold(text.to_string(), |acc, (broken, fixed)| acc.replace(broken, fixed))
}

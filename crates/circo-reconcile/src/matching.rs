//! Teacher ↔ class-label matching.
//!
//! A class's teacher label is free text written by school staff: civility,
//! surname and given name or initial in any spacing, several teachers
//! separated by runs of spaces. A label fragment is compared to a roster
//! teacher at three tiers of decreasing strictness; the first tier that
//! matches wins.

use std::sync::LazyLock;

use circo_core::text::{compact, normalize};
use regex::Regex;
use serde::{Deserialize, Serialize};

static FRAGMENT_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());

/// Normalized civility tokens, stripped from the start of a fragment.
const CIVILITIES: &[&str] = &["m", "mme", "mlle", "mr", "monsieur", "madame", "mademoiselle"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
  /// Surname and given name both equal after normalization.
  ExactName,
  /// Surname equal, given name reduced to its initial.
  SurnameInitial,
  /// As [`MatchTier::SurnameInitial`], ignoring spaces and hyphens in the
  /// surname.
  CompactSurnameInitial,
}

impl MatchTier {
  pub const ALL: [MatchTier; 3] = [
    MatchTier::ExactName,
    MatchTier::SurnameInitial,
    MatchTier::CompactSurnameInitial,
  ];
}

/// The teacher fragments of a class label, in label order.
pub fn teacher_fragments(label: &str) -> Vec<&str> {
  FRAGMENT_SEPARATOR
    .split(label)
    .map(str::trim)
    .filter(|f| !f.is_empty())
    .collect()
}

fn is_civility(token: &str) -> bool {
  let token = normalize(token.trim_end_matches('.'));
  CIVILITIES.contains(&token.as_str())
}

fn initial(name: &str) -> Option<char> {
  normalize(name).chars().find(|c| c.is_alphanumeric())
}

fn tier_matches(
  tier: MatchTier,
  frag_surname: &str,
  frag_given: &str,
  surname: &str,
  given: &str,
) -> bool {
  match tier {
    MatchTier::ExactName => {
      normalize(frag_surname) == normalize(surname) && normalize(frag_given) == normalize(given)
    }
    MatchTier::SurnameInitial => {
      normalize(frag_surname) == normalize(surname)
        && initial(frag_given).is_some()
        && initial(frag_given) == initial(given)
    }
    MatchTier::CompactSurnameInitial => {
      compact(frag_surname) == compact(surname)
        && initial(frag_given).is_some()
        && initial(frag_given) == initial(given)
    }
  }
}

/// Compare one label fragment with a teacher's surname and given name.
///
/// The fragment is split at every position into a surname part and a given
/// name part (surname first), and each tier is tried over all splits before
/// the next, looser one.
pub fn match_fragment(fragment: &str, surname: &str, given_name: &str) -> Option<MatchTier> {
  let tokens: Vec<&str> = fragment
    .split_whitespace()
    .skip_while(|t| is_civility(t))
    .collect();
  if tokens.is_empty() || normalize(surname).is_empty() {
    return None;
  }

  MatchTier::ALL.into_iter().find(|&tier| {
    (1..=tokens.len()).any(|split| {
      let frag_surname = tokens[..split].join(" ");
      let frag_given = tokens[split..].join(" ");
      tier_matches(tier, &frag_surname, &frag_given, surname, given_name)
    })
  })
}

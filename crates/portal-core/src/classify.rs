//! Course → school classification.
//!
//! A best-effort heuristic used to scope chat context, not an authoritative
//! mapping. Rules are tested in order against the lower-cased course text
//! and the first family with a matching token wins, so a course that matches
//! several families is attributed to the earliest one.

/// Ordered `(tokens, school code)` rules.
const RULES: &[(&[&str], &str)] = &[
  (
    &["b.tech", "btech", "m.tech", "mtech", "bca", "mca", "b.sc", "bsc"],
    "soet",
  ),
  (&["mba", "bba"], "som"),
  (&["llb", "llm"], "sol"),
  (&["arch"], "soa"),
  (&["b.com", "bcom", "m.com", "mcom"], "soc"),
  (&["pharm"], "soph"),
  (&["b.ed", "bed", "m.ed", "med"], "soe"),
];

/// Map free-text course name to a school code, or `None` if no rule matches.
pub fn classify(course: &str) -> Option<&'static str> {
  let lower = course.to_lowercase();
  RULES
    .iter()
    .find(|(tokens, _)| tokens.iter().any(|t| lower.contains(t)))
    .map(|(_, school)| *school)
}

/// Every school code [`classify`] can return.
pub fn school_codes() -> impl Iterator<Item = &'static str> {
  RULES.iter().map(|(_, school)| *school)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::taxonomy::Taxonomy;

  #[test]
  fn engineering() {
    assert_eq!(classify("B.Tech Computer Science"), Some("soet"));
    assert_eq!(classify("MCA"), Some("soet"));
    assert_eq!(classify("b.sc. (hons.) data science"), Some("soet"));
  }

  #[test]
  fn management_law_architecture() {
    assert_eq!(classify("MBA"), Some("som"));
    assert_eq!(classify("BBA (Digital Marketing)"), Some("som"));
    assert_eq!(classify("LLM (Master of Laws)"), Some("sol"));
    assert_eq!(classify("B.Arch"), Some("soa"));
  }

  #[test]
  fn commerce_pharmacy_education() {
    assert_eq!(classify("B.Com"), Some("soc"));
    assert_eq!(classify("D.Pharm"), Some("soph"));
    assert_eq!(classify("M.Ed (Master of Education)"), Some("soe"));
  }

  #[test]
  fn unmatched_is_none() {
    assert_eq!(classify("random hobby course"), None);
    assert_eq!(classify(""), None);
  }

  #[test]
  fn earlier_family_wins() {
    // Matches both "bca" (engineering) and "bcom" (commerce).
    assert_eq!(classify("BCA + BCom dual"), Some("soet"));
    // "mba" is checked before "pharm".
    assert_eq!(classify("MBA Pharmaceutical Management"), Some("som"));
    // "med" inside a word still counts; engineering is checked first.
    assert_eq!(classify("B.Tech Biomedical"), Some("soet"));
  }

  #[test]
  fn every_target_exists_in_builtin_taxonomy() {
    let t = Taxonomy::builtin().unwrap();
    for code in school_codes() {
      assert!(t.school(code).is_some(), "missing school {code}");
    }
  }
}

//! Short-code allocation for dimension rows.
//!
//! Registries and handlers get synthetic ids derived from their names. When
//! the derived id is already in use, integer suffixes `1..=99` are tried in
//! order; once all of them are taken the allocation fails.

use crate::Error;

/// Highest integer suffix tried after the bare candidate.
pub const MAX_SUFFIX: u32 = 99;

/// Return the first of `base`, `base1` … `base99` for which `taken` is false.
///
/// `kind` names the dimension in the [`Error::ResolutionExhausted`] raised
/// when every candidate is in use.
pub fn allocate_code<E, F>(kind: &'static str, base: &str, mut taken: F) -> Result<String, E>
where
  E: From<Error>,
  F: FnMut(&str) -> Result<bool, E>,
{
  if !taken(base)? {
    return Ok(base.to_owned());
  }
  for suffix in 1..=MAX_SUFFIX {
    let candidate = format!("{base}{suffix}");
    if !taken(&candidate)? {
      return Ok(candidate);
    }
  }
  Err(Error::ResolutionExhausted { kind, base: base.to_owned() }.into())
}

/// Candidate registry id: the first three characters of the name, uppercased.
pub fn registry_candidate(name: &str) -> String {
  name.trim().chars().take(3).collect::<String>().to_uppercase()
}

/// Candidate handler id: `H` followed by the character counts of the last and
/// the first word of the name. `None` for a blank name.
pub fn handler_candidate(name: &str) -> Option<String> {
  let words: Vec<&str> = name.split_whitespace().collect();
  let first = words.first()?;
  let last = words.last()?;
  Some(format!("H{}{}", last.chars().count(), first.chars().count()))
}

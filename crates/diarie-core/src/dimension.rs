//! Dimension rows referenced by cases and notes.
//!
//! Dimensions are created lazily the first time something refers to them and
//! are never renamed, merged or deleted afterwards.

use serde::{Deserialize, Serialize};

/// The registering office or person responsible for a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
  pub id:   String,
  pub name: String,
}

/// A case worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handler {
  pub id:   String,
  pub name: String,
}

/// An organizational unit owning cases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
  pub code: String,
  pub name: String,
}

/// A topical classification bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dossier {
  pub number: i64,
  pub name:   String,
}

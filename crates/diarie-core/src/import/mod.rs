//! Import of external case records.
//!
//! An [`ImportRecord`] is one case header with its notes and change-log
//! entries, already mapped to domain enums and dates but still carrying
//! free-text registrar and handler names. [`reconcile`] turns those names into
//! dimension keys (creating rows where needed) and yields the rows a store
//! should insert.

mod mapping;
mod resolve;

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::case::{Direction, Status};

pub use mapping::{map_direction, map_status, normalize_date, normalize_timestamp};
pub use resolve::{Dimensions, ResolvedLog, ResolvedRecord, Resolver, reconcile};

// ─── Input ───────────────────────────────────────────────────────────────────

/// One external case record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
  pub case:  ImportedCase,
  pub notes: Vec<ImportedNote>,
  pub logs:  Vec<ImportedLog>,
}

/// The case header of an external record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedCase {
  /// Taken verbatim; imported cases keep their external number.
  pub case_number:           i64,
  pub direction:             Direction,
  pub status:                Status,
  pub subject_text:          String,
  pub received_date:         Option<NaiveDate>,
  pub registered_date:       Option<NaiveDate>,
  pub closed_date:           Option<NaiveDate>,
  pub counterpart_reference: String,
  pub correspondent:         String,
  /// Free-text name of the registering office or person.
  pub registrar:             String,
  /// Free-text handler name; blank when the case has no handler.
  pub handler:               String,
  pub dossier_number:        Option<i64>,
  pub dossier_name:          Option<String>,
  pub unit_code:             Option<String>,
  pub unit_name:             Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedNote {
  pub line_number:   i64,
  pub direction:     Direction,
  pub text:          String,
  pub received_date: Option<NaiveDate>,
  pub sent_date:     Option<NaiveDate>,
  pub counterpart:   String,
  pub registrar:     String,
  pub handler:       String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedLog {
  pub logged_at:  Option<NaiveDateTime>,
  /// Name of the field the external system recorded a change to.
  pub field_name: String,
  pub registrar:  String,
}

impl ImportedLog {
  pub fn description(&self) -> String { format!("Ändring av {}", self.field_name) }
}

// ─── Output ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
  Commit,
  /// Reconcile and insert inside a transaction that is always rolled back.
  DryRun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
  Imported,
  /// Dry run: the record would have been imported.
  WouldImport,
  /// A case with the same number already exists; nothing was written.
  Skipped,
}

/// A lookup-or-create decision taken while reconciling a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ImportAction {
  MatchedRegistry { id: String, name: String },
  CreatedRegistry { id: String, name: String },
  MatchedHandler { id: String, name: String },
  CreatedHandler { id: String, name: String },
  CreatedDossier { number: i64, name: String },
  CreatedUnit { code: String, name: String },
  /// A dossier number with no stored row and no name to create one from.
  DroppedDossier { number: i64 },
  /// A unit code with no stored row and no name to create one from.
  DroppedUnit { code: String },
}

impl fmt::Display for ImportAction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::MatchedRegistry { id, name } => write!(f, "registry {name:?} matched {id}"),
      Self::CreatedRegistry { id, name } => write!(f, "registry {name:?} created as {id}"),
      Self::MatchedHandler { id, name } => write!(f, "handler {name:?} matched {id}"),
      Self::CreatedHandler { id, name } => write!(f, "handler {name:?} created as {id}"),
      Self::CreatedDossier { number, name } => write!(f, "dossier {number} created ({name})"),
      Self::CreatedUnit { code, name } => write!(f, "unit {code} created ({name})"),
      Self::DroppedDossier { number } => write!(f, "dossier {number} unknown, left empty"),
      Self::DroppedUnit { code } => write!(f, "unit {code} unknown, left empty"),
    }
  }
}

/// What happened to one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
  pub case_number: i64,
  pub disposition: Disposition,
  pub actions:     Vec<ImportAction>,
}

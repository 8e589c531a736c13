//! Cases, notes and audit-log entries.
//!
//! A case is the tracked administrative matter. Notes are sequenced free-text
//! entries attached to it; log entries record every action that changed it.

use std::{fmt, str::FromStr};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Enumerations ────────────────────────────────────────────────────────────

/// Whether a case or note came in, went out, or stayed inside the office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
  In,
  Out,
  #[default]
  Internal,
}

impl Direction {
  pub const ALL: [Direction; 3] = [Self::In, Self::Out, Self::Internal];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::In => "IN",
      Self::Out => "OUT",
      Self::Internal => "INTERNAL",
    }
  }

  /// Human-readable label used by the HTML views.
  pub fn label(self) -> &'static str {
    match self {
      Self::In => "Inkommande",
      Self::Out => "Utgående",
      Self::Internal => "Intern",
    }
  }
}

impl fmt::Display for Direction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Direction {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "IN" => Ok(Self::In),
      "OUT" => Ok(Self::Out),
      "INTERNAL" => Ok(Self::Internal),
      other => Err(Error::validation(format!("unknown direction {other:?}"))),
    }
  }
}

/// Processing state of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
  #[default]
  New,
  InProgress,
  Closed,
}

impl Status {
  pub const ALL: [Status; 3] = [Self::New, Self::InProgress, Self::Closed];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::New => "new",
      Self::InProgress => "in_progress",
      Self::Closed => "closed",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Self::New => "Ny",
      Self::InProgress => "Pågående",
      Self::Closed => "Avslutad",
    }
  }
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Status {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "new" => Ok(Self::New),
      "in_progress" => Ok(Self::InProgress),
      "closed" => Ok(Self::Closed),
      other => Err(Error::validation(format!("unknown status {other:?}"))),
    }
  }
}

// ─── Stored records ──────────────────────────────────────────────────────────

/// A registered case ("ärende").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
  pub case_number:           i64,
  pub registry_id:           String,
  pub direction:             Direction,
  pub dossier_number:        Option<i64>,
  pub handler_id:            Option<String>,
  pub unit_code:             Option<String>,
  pub received_date:         Option<NaiveDate>,
  pub registered_date:       Option<NaiveDate>,
  pub closed_date:           Option<NaiveDate>,
  pub status:                Status,
  pub subject_text:          String,
  pub counterpart_reference: String,
  pub correspondent:         String,
}

/// A sequenced free-text entry on a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
  pub case_number:   i64,
  /// Unique per case; `max + 1` at insertion time, starting at 1.
  pub line_number:   i64,
  pub direction:     Direction,
  pub text:          String,
  pub registered_by: String,
  pub received_date: Option<NaiveDate>,
  pub sent_date:     Option<NaiveDate>,
  pub handler_id:    Option<String>,
  pub counterpart:   String,
}

/// One audit record of a case-affecting action. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
  pub id:          i64,
  pub case_number: i64,
  pub registry_id: String,
  /// Absent only for imported entries whose source timestamp was unusable.
  pub logged_at:   Option<NaiveDateTime>,
  pub description: String,
}

// ─── Read models ─────────────────────────────────────────────────────────────

/// A case with the display names of everything it references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseSummary {
  #[serde(flatten)]
  pub case:          Case,
  pub registry_name: Option<String>,
  pub handler_name:  Option<String>,
  pub dossier_name:  Option<String>,
  pub unit_name:     Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteRow {
  #[serde(flatten)]
  pub note:         Note,
  pub handler_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRow {
  #[serde(flatten)]
  pub entry:         LogEntry,
  pub registry_name: Option<String>,
}

/// Everything the detail view shows for one case.
///
/// Notes are ordered by received date then line number, logs by timestamp;
/// both newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseDetail {
  pub case:  CaseSummary,
  pub notes: Vec<NoteRow>,
  pub logs:  Vec<LogRow>,
}

// ─── Write models ────────────────────────────────────────────────────────────

/// The user performing a mutation; named in the audit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
  pub username: String,
}

impl Actor {
  pub fn new(username: impl Into<String>) -> Self { Self { username: username.into() } }
}

/// All mutable fields of a case, validated.
///
/// Used for both creation and full-overwrite updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseFields {
  pub registry_id:           String,
  pub direction:             Direction,
  pub status:                Status,
  pub dossier_number:        Option<i64>,
  pub handler_id:            Option<String>,
  pub unit_code:             Option<String>,
  pub received_date:         Option<NaiveDate>,
  /// Defaults to today when a case is created without one.
  pub registered_date:       Option<NaiveDate>,
  pub closed_date:           Option<NaiveDate>,
  pub subject_text:          String,
  pub counterpart_reference: String,
  pub correspondent:         String,
}

impl CaseFields {
  /// Minimal valid field set; everything optional left empty.
  pub fn new(registry_id: impl Into<String>, direction: Direction, status: Status) -> Self {
    Self {
      registry_id: registry_id.into(),
      direction,
      status,
      dossier_number: None,
      handler_id: None,
      unit_code: None,
      received_date: None,
      registered_date: None,
      closed_date: None,
      subject_text: String::new(),
      counterpart_reference: String::new(),
      correspondent: String::new(),
    }
  }
}

/// Raw case form submission. Every field arrives as optional text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CaseForm {
  pub registry_id:           Option<String>,
  pub direction:             Option<String>,
  pub status:                Option<String>,
  pub dossier_number:        Option<String>,
  pub handler_id:            Option<String>,
  pub unit_code:             Option<String>,
  pub received_date:         Option<String>,
  pub registered_date:       Option<String>,
  pub closed_date:           Option<String>,
  pub subject_text:          Option<String>,
  pub counterpart_reference: Option<String>,
  pub correspondent:         Option<String>,
}

impl TryFrom<CaseForm> for CaseFields {
  type Error = Error;

  fn try_from(form: CaseForm) -> Result<Self> {
    let registry_id = non_empty(form.registry_id)
      .ok_or_else(|| Error::validation("registry is required"))?;
    let direction = non_empty(form.direction)
      .ok_or_else(|| Error::validation("direction is required"))?
      .parse()?;
    let status = non_empty(form.status)
      .ok_or_else(|| Error::validation("status is required"))?
      .parse()?;
    let dossier_number = non_empty(form.dossier_number)
      .map(|s| {
        s.parse::<i64>()
          .map_err(|_| Error::validation(format!("dossier number {s:?} is not a number")))
      })
      .transpose()?;

    Ok(Self {
      registry_id,
      direction,
      status,
      dossier_number,
      handler_id: non_empty(form.handler_id),
      unit_code: non_empty(form.unit_code),
      received_date: form_date("received date", form.received_date)?,
      registered_date: form_date("registered date", form.registered_date)?,
      closed_date: form_date("closed date", form.closed_date)?,
      subject_text: form.subject_text.unwrap_or_default(),
      counterpart_reference: form.counterpart_reference.unwrap_or_default(),
      correspondent: form.correspondent.unwrap_or_default(),
    })
  }
}

/// A note to append to an existing case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
  pub direction:     Direction,
  pub text:          String,
  pub handler_id:    Option<String>,
  pub counterpart:   String,
  /// Defaults to today.
  pub received_date: Option<NaiveDate>,
  pub sent_date:     Option<NaiveDate>,
}

/// Raw add-note form submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteForm {
  pub direction:   Option<String>,
  pub text:        Option<String>,
  pub handler_id:  Option<String>,
  pub counterpart: Option<String>,
}

impl TryFrom<NoteForm> for NewNote {
  type Error = Error;

  fn try_from(form: NoteForm) -> Result<Self> {
    let direction = non_empty(form.direction)
      .ok_or_else(|| Error::validation("direction is required"))?
      .parse()?;
    let text = non_empty(form.text).ok_or_else(|| Error::validation("note text is required"))?;

    Ok(Self {
      direction,
      text,
      handler_id: non_empty(form.handler_id),
      counterpart: form.counterpart.unwrap_or_default(),
      received_date: None,
      sent_date: None,
    })
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn non_empty(value: Option<String>) -> Option<String> {
  value
    .map(|s| s.trim().to_owned())
    .filter(|s| !s.is_empty())
}

fn form_date(field: &str, value: Option<String>) -> Result<Option<NaiveDate>> {
  non_empty(value)
    .map(|s| {
      NaiveDate::parse_from_str(&s, "%Y-%m-%d")
        .map_err(|_| Error::validation(format!("{field} {s:?} is not a YYYY-MM-DD date")))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn full_form() -> CaseForm {
    CaseForm {
      registry_id: Some("ANN".into()),
      direction: Some("IN".into()),
      status: Some("in_progress".into()),
      dossier_number: Some("12".into()),
      handler_id: Some("".into()),
      registered_date: Some("2024-03-01".into()),
      subject_text: Some("Bygglov".into()),
      ..CaseForm::default()
    }
  }

  #[test]
  fn form_converts_and_blanks_become_absent() {
    let fields = CaseFields::try_from(full_form()).unwrap();
    assert_eq!(fields.registry_id, "ANN");
    assert_eq!(fields.direction, Direction::In);
    assert_eq!(fields.status, Status::InProgress);
    assert_eq!(fields.dossier_number, Some(12));
    assert_eq!(fields.handler_id, None);
    assert_eq!(fields.registered_date, NaiveDate::from_ymd_opt(2024, 3, 1));
    assert_eq!(fields.subject_text, "Bygglov");
  }

  #[test]
  fn missing_required_fields_are_rejected() {
    for strip in ["registry", "direction", "status"] {
      let mut form = full_form();
      match strip {
        "registry" => form.registry_id = None,
        "direction" => form.direction = Some("  ".into()),
        _ => form.status = None,
      }
      let err = CaseFields::try_from(form).unwrap_err();
      assert!(matches!(err, Error::Validation(ref m) if m.contains(strip)), "{err}");
    }
  }

  #[test]
  fn malformed_date_is_a_validation_error() {
    let mut form = full_form();
    form.closed_date = Some("01/02/2024".into());
    assert!(matches!(CaseFields::try_from(form), Err(Error::Validation(_))));
  }

  #[test]
  fn note_form_requires_text() {
    let form = NoteForm { direction: Some("OUT".into()), ..NoteForm::default() };
    assert!(matches!(NewNote::try_from(form), Err(Error::Validation(_))));

    let form = NoteForm {
      direction: Some("OUT".into()),
      text: Some("Skickat beslut".into()),
      ..NoteForm::default()
    };
    let note = NewNote::try_from(form).unwrap();
    assert_eq!(note.direction, Direction::Out);
    assert_eq!(note.received_date, None);
  }

  #[test]
  fn enums_serialize_to_api_names() {
    assert_eq!(serde_json::to_string(&Direction::Internal).unwrap(), "\"INTERNAL\"");
    assert_eq!(serde_json::to_string(&Status::InProgress).unwrap(), "\"in_progress\"");
    assert_eq!("OUT".parse::<Direction>().unwrap(), Direction::Out);
  }
}

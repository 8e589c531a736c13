//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Dates are stored as `YYYY-MM-DD`, audit timestamps as
//! `YYYY-MM-DD HH:MM:SS` local time, session timestamps as RFC 3339 UTC.
//! Direction and status use the register's historical column codes.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use diarie_core::case::{
  Case, CaseSummary, Direction, LogEntry, LogRow, Note, NoteRow, Status,
};

use crate::{Error, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ─── Direction
// ────────────────────────────────────────────────────────────────

pub fn encode_direction(d: Direction) -> &'static str {
  match d {
    Direction::In => "IN",
    Direction::Out => "UT",
    Direction::Internal => "INTERN",
  }
}

pub fn decode_direction(s: &str) -> Result<Direction> {
  match s {
    "IN" => Ok(Direction::In),
    "UT" => Ok(Direction::Out),
    "INTERN" => Ok(Direction::Internal),
    other => Err(Error::Decode { column: "direction", value: other.to_owned() }),
  }
}

// ─── Status
// ───────────────────────────────────────────────────────────────────

pub fn encode_status(s: Status) -> &'static str {
  match s {
    Status::New => "Ny",
    Status::InProgress => "Pågående",
    Status::Closed => "Avslutad",
  }
}

pub fn decode_status(s: &str) -> Result<Status> {
  match s {
    "Ny" => Ok(Status::New),
    "Pågående" => Ok(Status::InProgress),
    "Avslutad" => Ok(Status::Closed),
    other => Err(Error::Decode { column: "status", value: other.to_owned() }),
  }
}

// ─── Dates
// ────────────────────────────────────────────────────────────────────

pub fn encode_date(d: Option<NaiveDate>) -> Option<String> {
  d.map(|d| d.format(DATE_FORMAT).to_string())
}

pub fn decode_date(column: &'static str, s: Option<String>) -> Result<Option<NaiveDate>> {
  s.map(|s| {
    NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(|_| Error::Decode { column, value: s })
  })
  .transpose()
}

pub fn encode_datetime(dt: Option<NaiveDateTime>) -> Option<String> {
  dt.map(|dt| dt.format(DATETIME_FORMAT).to_string())
}

pub fn decode_datetime(column: &'static str, s: Option<String>) -> Result<Option<NaiveDateTime>> {
  s.map(|s| {
    NaiveDateTime::parse_from_str(&s, DATETIME_FORMAT)
      .map_err(|_| Error::Decode { column, value: s })
  })
  .transpose()
}

/// Fixed-width UTC RFC 3339, so stored values compare correctly as text.
pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(column: &'static str, s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|_| Error::Decode { column, value: s.to_owned() })
}

// ─── Raw rows ────────────────────────────────────────────────────────────────

/// Column list matching [`RawCaseSummary::from_row`].
pub const CASE_SUMMARY_COLUMNS: &str = "
  c.case_number, c.registry_id, c.direction, c.dossier_number, c.handler_id,
  c.unit_code, c.received_date, c.registered_date, c.closed_date, c.status,
  c.subject_text, c.counterpart_reference, c.correspondent,
  r.name, h.name, d.name, u.name";

/// Join clause matching [`CASE_SUMMARY_COLUMNS`].
pub const CASE_SUMMARY_JOINS: &str = "
  FROM cases c
  LEFT JOIN registries r ON r.id     = c.registry_id
  LEFT JOIN handlers   h ON h.id     = c.handler_id
  LEFT JOIN dossiers   d ON d.number = c.dossier_number
  LEFT JOIN units      u ON u.code   = c.unit_code";

/// A case row with its joined names, as read from SQLite.
pub struct RawCaseSummary {
  pub case_number:           i64,
  pub registry_id:           String,
  pub direction:             String,
  pub dossier_number:        Option<i64>,
  pub handler_id:            Option<String>,
  pub unit_code:             Option<String>,
  pub received_date:         Option<String>,
  pub registered_date:       Option<String>,
  pub closed_date:           Option<String>,
  pub status:                String,
  pub subject_text:          String,
  pub counterpart_reference: String,
  pub correspondent:         String,
  pub registry_name:         Option<String>,
  pub handler_name:          Option<String>,
  pub dossier_name:          Option<String>,
  pub unit_name:             Option<String>,
}

impl RawCaseSummary {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      case_number:           row.get(0)?,
      registry_id:           row.get(1)?,
      direction:             row.get(2)?,
      dossier_number:        row.get(3)?,
      handler_id:            row.get(4)?,
      unit_code:             row.get(5)?,
      received_date:         row.get(6)?,
      registered_date:       row.get(7)?,
      closed_date:           row.get(8)?,
      status:                row.get(9)?,
      subject_text:          row.get(10)?,
      counterpart_reference: row.get(11)?,
      correspondent:         row.get(12)?,
      registry_name:         row.get(13)?,
      handler_name:          row.get(14)?,
      dossier_name:          row.get(15)?,
      unit_name:             row.get(16)?,
    })
  }

  pub fn into_summary(self) -> Result<CaseSummary> {
    Ok(CaseSummary {
      case:          Case {
        case_number:           self.case_number,
        registry_id:           self.registry_id,
        direction:             decode_direction(&self.direction)?,
        dossier_number:        self.dossier_number,
        handler_id:            self.handler_id,
        unit_code:             self.unit_code,
        received_date:         decode_date("received_date", self.received_date)?,
        registered_date:       decode_date("registered_date", self.registered_date)?,
        closed_date:           decode_date("closed_date", self.closed_date)?,
        status:                decode_status(&self.status)?,
        subject_text:          self.subject_text,
        counterpart_reference: self.counterpart_reference,
        correspondent:         self.correspondent,
      },
      registry_name: self.registry_name,
      handler_name:  self.handler_name,
      dossier_name:  self.dossier_name,
      unit_name:     self.unit_name,
    })
  }
}

pub struct RawNoteRow {
  pub case_number:   i64,
  pub line_number:   i64,
  pub direction:     String,
  pub text:          String,
  pub registered_by: String,
  pub received_date: Option<String>,
  pub sent_date:     Option<String>,
  pub handler_id:    Option<String>,
  pub counterpart:   String,
  pub handler_name:  Option<String>,
}

impl RawNoteRow {
  pub fn into_row(self) -> Result<NoteRow> {
    Ok(NoteRow {
      note:         Note {
        case_number:   self.case_number,
        line_number:   self.line_number,
        direction:     decode_direction(&self.direction)?,
        text:          self.text,
        registered_by: self.registered_by,
        received_date: decode_date("received_date", self.received_date)?,
        sent_date:     decode_date("sent_date", self.sent_date)?,
        handler_id:    self.handler_id,
        counterpart:   self.counterpart,
      },
      handler_name: self.handler_name,
    })
  }
}

pub struct RawLogRow {
  pub id:            i64,
  pub case_number:   i64,
  pub registry_id:   String,
  pub logged_at:     Option<String>,
  pub description:   String,
  pub registry_name: Option<String>,
}

impl RawLogRow {
  pub fn into_row(self) -> Result<LogRow> {
    Ok(LogRow {
      entry:         LogEntry {
        id:          self.id,
        case_number: self.case_number,
        registry_id: self.registry_id,
        logged_at:   decode_datetime("logged_at", self.logged_at)?,
        description: self.description,
      },
      registry_name: self.registry_name,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn column_codes_roundtrip_every_variant() {
    for d in Direction::ALL {
      assert_eq!(decode_direction(encode_direction(d)).unwrap(), d);
    }
    for s in Status::ALL {
      assert_eq!(decode_status(encode_status(s)).unwrap(), s);
    }
    assert!(matches!(decode_status("Okänd"), Err(Error::Decode { column: "status", .. })));
  }

  #[test]
  fn timestamps_use_second_precision() {
    let dt = NaiveDate::from_ymd_opt(2024, 5, 17)
      .unwrap()
      .and_hms_opt(9, 30, 5)
      .unwrap();
    assert_eq!(encode_datetime(Some(dt)).as_deref(), Some("2024-05-17 09:30:05"));
    assert_eq!(decode_datetime("logged_at", encode_datetime(Some(dt))).unwrap(), Some(dt));
  }
}

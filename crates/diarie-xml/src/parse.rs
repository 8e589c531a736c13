//! Mapping from an `AErende` element to an [`ImportRecord`].

use diarie_core::import::{
  ImportRecord, ImportedCase, ImportedLog, ImportedNote, map_direction, map_status, normalize_date,
  normalize_timestamp,
};

use crate::{
  error::{Error, Result},
  tree::{self, Element},
};

pub(crate) fn parse_record(input: &str) -> Result<ImportRecord> {
  let doc = tree::parse_document(input.trim_start_matches('\u{feff}'))?;
  let case = doc.find("AErende").ok_or(Error::MissingCase)?;

  let case_number = number("Diarienummer", case.child_text("Diarienummer"))?
    .ok_or(Error::MissingCaseNumber)?;

  let (dossier_number, dossier_name) = match case.child("Diarieplan") {
    Some(plan) => (
      number("Dossiernummer", plan.child_text("Dossiernummer"))?,
      non_empty(plan.child_text("Rubrik")),
    ),
    None => (None, None),
  };

  let (unit_code, unit_name) = match case.child("Enhet") {
    Some(unit) => (unit.attribute("ID").and_then(non_empty), non_empty(&unit.text)),
    None => (None, None),
  };

  let notes = case
    .descendants("Haendelse")
    .into_iter()
    .enumerate()
    .map(|(i, h)| note(h, i))
    .collect::<Result<Vec<_>>>()?;

  let logs = case.descendants("Logg").into_iter().map(log).collect();

  Ok(ImportRecord {
    case: ImportedCase {
      case_number,
      direction: map_direction(case.child_text("Riktning")),
      status: map_status(case.child_text("Status")),
      subject_text: case.child_text("AErendemening").to_owned(),
      received_date: normalize_date(case.child_text("Inkomst_uppraettat_datum")),
      registered_date: normalize_date(case.child_text("Registreringsdatum")),
      closed_date: normalize_date(case.child_text("Avslutsdatum")),
      counterpart_reference: case.child_text("Motpartens_beteckning").to_owned(),
      correspondent: case.child_text("Fraan_till").to_owned(),
      registrar: case.child_text("Registrator").to_owned(),
      handler: case.child_text("Handlaeggare").to_owned(),
      dossier_number,
      dossier_name,
      unit_code,
      unit_name,
    },
    notes,
    logs,
  })
}

/// `position` is zero-based; a note without `Loepnummer` gets `position + 1`.
fn note(el: &Element, position: usize) -> Result<ImportedNote> {
  let line_number = match number("Loepnummer", el.child_text("Loepnummer"))? {
    Some(n) => n,
    None => i64::try_from(position + 1).unwrap_or(i64::MAX),
  };

  Ok(ImportedNote {
    line_number,
    direction: map_direction(el.child_text("Riktning")),
    text: el.child_text("Haendelsetext").to_owned(),
    received_date: normalize_date(el.child_text("Inkommandedatum")),
    sent_date: normalize_date(el.child_text("Utgaaendedatum")),
    counterpart: el.child_text("Motpart").to_owned(),
    registrar: el.child_text("Registrator").to_owned(),
    handler: el.child_text("Handlaeggare").to_owned(),
  })
}

fn log(el: &Element) -> ImportedLog {
  ImportedLog {
    logged_at:  normalize_timestamp(el.child_text("AEndringsdatum")),
    field_name: el.child_text("Faeltnamn").to_owned(),
    registrar:  el.child_text("Registrator").to_owned(),
  }
}

/// Blank → `None`; anything else must be an integer.
fn number(element: &'static str, text: &str) -> Result<Option<i64>> {
  let text = text.trim();
  if text.is_empty() {
    return Ok(None);
  }
  text
    .parse()
    .map(Some)
    .map_err(|_| Error::InvalidNumber { element, value: text.to_owned() })
}

fn non_empty(s: &str) -> Option<String> {
  let s = s.trim();
  (!s.is_empty()).then(|| s.to_owned())
}

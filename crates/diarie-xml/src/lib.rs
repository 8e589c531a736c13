//! Codec for externally exported Diarie case records.
//!
//! Converts one XML export document into a [`diarie_core::import::ImportRecord`].
//! Pure synchronous; no database dependencies. Field values are mapped
//! leniently (unknown codes fall back to defaults, malformed dates become
//! absent); only structural problems are errors.
//!
//! # Quick start
//!
//! ```no_run
//! let xml = std::fs::read_to_string("arende.xml").unwrap();
//! let record = diarie_xml::parse(&xml).unwrap();
//! println!("case {} with {} notes", record.case.case_number, record.notes.len());
//! ```

pub mod error;
mod parse;
mod tree;

use diarie_core::import::ImportRecord;
pub use error::{Error, Result};

/// Parse the first `AErende` element found anywhere in `input`.
pub fn parse(input: &str) -> Result<ImportRecord> { parse::parse_record(input) }

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use diarie_core::case::{Direction, Status};

  use super::*;

  const EXPORT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Export xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <AErende>
    <Diarienummer>1001</Diarienummer>
    <Riktning>I</Riktning>
    <AErendemening>Ansökan om bygglov, Storgatan 1</AErendemening>
    <Status>Ö</Status>
    <Inkomst_uppraettat_datum>2023-11-05</Inkomst_uppraettat_datum>
    <Registreringsdatum>2023-11-06</Registreringsdatum>
    <Avslutsdatum/>
    <Motpartens_beteckning>REF-77</Motpartens_beteckning>
    <Fraan_till>Bo Ek</Fraan_till>
    <Registrator>Anna Svensson</Registrator>
    <Handlaeggare>Karl Berg</Handlaeggare>
    <Diarieplan>
      <Dossiernummer>7</Dossiernummer>
      <Rubrik>Bygglov</Rubrik>
    </Diarieplan>
    <Enhet ID="BN">Byggnadsnämnden</Enhet>
    <Haendelser>
      <Haendelse>
        <Loepnummer>1</Loepnummer>
        <Riktning>I</Riktning>
        <Haendelsetext>Ansökan inkom</Haendelsetext>
        <Inkommandedatum>2023-11-05</Inkommandedatum>
        <Motpart>Bo Ek</Motpart>
        <Registrator>Anna Svensson</Registrator>
      </Haendelse>
      <Haendelse>
        <Riktning>U</Riktning>
        <Haendelsetext>Begäran om komplettering</Haendelsetext>
        <Utgaaendedatum>2023-11-20</Utgaaendedatum>
        <Handlaeggare>Eva Lind</Handlaeggare>
      </Haendelse>
    </Haendelser>
    <Loggar>
      <Logg>
        <AEndringsdatum>2023-11-06T14:22:09</AEndringsdatum>
        <Faeltnamn>Status</Faeltnamn>
        <Registrator>Anna Svensson</Registrator>
      </Logg>
    </Loggar>
  </AErende>
</Export>"#;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

  #[test]
  fn parses_full_export() {
    let record = parse(EXPORT).unwrap();
    let case = &record.case;

    assert_eq!(case.case_number, 1001);
    assert_eq!(case.direction, Direction::In);
    assert_eq!(case.status, Status::InProgress);
    assert_eq!(case.subject_text, "Ansökan om bygglov, Storgatan 1");
    assert_eq!(case.received_date, Some(date(2023, 11, 5)));
    assert_eq!(case.registered_date, Some(date(2023, 11, 6)));
    assert_eq!(case.closed_date, None);
    assert_eq!(case.counterpart_reference, "REF-77");
    assert_eq!(case.correspondent, "Bo Ek");
    assert_eq!(case.registrar, "Anna Svensson");
    assert_eq!(case.handler, "Karl Berg");
    assert_eq!(case.dossier_number, Some(7));
    assert_eq!(case.dossier_name.as_deref(), Some("Bygglov"));
    assert_eq!(case.unit_code.as_deref(), Some("BN"));
    assert_eq!(case.unit_name.as_deref(), Some("Byggnadsnämnden"));
  }

  #[test]
  fn notes_default_their_line_number_to_position() {
    let record = parse(EXPORT).unwrap();
    assert_eq!(record.notes.len(), 2);

    let second = &record.notes[1];
    assert_eq!(second.line_number, 2);
    assert_eq!(second.direction, Direction::Out);
    assert_eq!(second.sent_date, Some(date(2023, 11, 20)));
    assert_eq!(second.handler, "Eva Lind");
    assert_eq!(second.registrar, "");
  }

  #[test]
  fn log_entries_keep_only_the_date() {
    let record = parse(EXPORT).unwrap();
    assert_eq!(record.logs.len(), 1);
    assert_eq!(record.logs[0].logged_at, date(2023, 11, 6).and_hms_opt(0, 0, 0));
    assert_eq!(record.logs[0].description(), "Ändring av Status");
  }

  #[test]
  fn bare_case_maps_to_defaults() {
    let record = parse(
      "<AErende><Diarienummer>5</Diarienummer><Riktning/><Status>X</Status></AErende>",
    )
    .unwrap();
    assert_eq!(record.case.direction, Direction::Internal);
    assert_eq!(record.case.status, Status::New);
    assert_eq!(record.case.dossier_number, None);
    assert_eq!(record.case.unit_code, None);
    assert!(record.notes.is_empty());
    assert!(record.logs.is_empty());
  }

  #[test]
  fn only_the_first_case_is_read() {
    let record = parse(
      "<Export>
         <AErende><Diarienummer>1</Diarienummer></AErende>
         <AErende><Diarienummer>2</Diarienummer></AErende>
       </Export>",
    )
    .unwrap();
    assert_eq!(record.case.case_number, 1);
  }

  #[test]
  fn structural_problems_are_errors() {
    assert!(matches!(parse("<Export/>"), Err(Error::MissingCase)));
    assert!(matches!(parse("<AErende/>"), Err(Error::MissingCaseNumber)));
    assert!(matches!(
      parse("<AErende><Diarienummer>12a</Diarienummer></AErende>"),
      Err(Error::InvalidNumber { element: "Diarienummer", .. })
    ));
    assert!(matches!(
      parse(
        "<AErende><Diarienummer>1</Diarienummer>\
         <Diarieplan><Dossiernummer>sju</Dossiernummer></Diarieplan></AErende>"
      ),
      Err(Error::InvalidNumber { element: "Dossiernummer", .. })
    ));
    assert!(matches!(
      parse(
        "<AErende><Diarienummer>1</Diarienummer>\
         <Haendelse><Loepnummer>x</Loepnummer></Haendelse></AErende>"
      ),
      Err(Error::InvalidNumber { element: "Loepnummer", .. })
    ));
    assert!(matches!(parse("<AErende><Diarienummer>1</AErende>"), Err(Error::Xml(_))));
  }
}

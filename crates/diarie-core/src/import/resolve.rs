//! Lookup-or-create resolution of free-text names to dimension keys.
//!
//! Matching is fuzzy by nature: registry names match on a case-insensitive
//! substring, handler names on an exact name first and a substring second.
//! When several stored rows match, the first-inserted row wins.

use chrono::NaiveDateTime;
use tracing::debug;

use super::{ImportAction, ImportRecord};
use crate::{
  Error,
  case::{Case, Note},
  code::{allocate_code, handler_candidate, registry_candidate},
  dimension::{Dossier, Handler, Registry, Unit},
};

// ─── Backend seam ────────────────────────────────────────────────────────────

/// Synchronous access to the dimension tables.
///
/// Implemented by storage backends on top of an open transaction so that
/// every row created during resolution commits or rolls back together with
/// the imported case.
pub trait Dimensions {
  type Error: From<Error>;

  /// All registries, first-inserted first.
  fn registries(&self) -> Result<Vec<Registry>, Self::Error>;
  fn registry_exists(&self, id: &str) -> Result<bool, Self::Error>;
  fn insert_registry(&self, registry: &Registry) -> Result<(), Self::Error>;

  /// All handlers, first-inserted first.
  fn handlers(&self) -> Result<Vec<Handler>, Self::Error>;
  fn handler_exists(&self, id: &str) -> Result<bool, Self::Error>;
  fn insert_handler(&self, handler: &Handler) -> Result<(), Self::Error>;

  fn dossier_exists(&self, number: i64) -> Result<bool, Self::Error>;
  fn insert_dossier(&self, dossier: &Dossier) -> Result<(), Self::Error>;

  fn unit_exists(&self, code: &str) -> Result<bool, Self::Error>;
  fn insert_unit(&self, unit: &Unit) -> Result<(), Self::Error>;
}

// ─── Resolver ────────────────────────────────────────────────────────────────

/// Resolves names against a [`Dimensions`] backend, recording every decision.
pub struct Resolver<'a, D: Dimensions> {
  dims:    &'a D,
  actions: Vec<ImportAction>,
}

impl<'a, D: Dimensions> Resolver<'a, D> {
  pub fn new(dims: &'a D) -> Self { Self { dims, actions: Vec::new() } }

  pub fn actions(&self) -> &[ImportAction] { &self.actions }

  pub fn into_actions(self) -> Vec<ImportAction> { self.actions }

  /// Registry id for `name`; creates the registry when nothing matches.
  pub fn registry(&mut self, name: &str) -> Result<String, D::Error> {
    let name = name.trim();
    if name.is_empty() {
      return Err(Error::validation("registrar is required").into());
    }

    let needle = name.to_lowercase();
    if let Some(found) = self
      .dims
      .registries()?
      .into_iter()
      .find(|r| r.name.to_lowercase().contains(&needle))
    {
      debug!(id = %found.id, name, "registry matched");
      self.actions.push(ImportAction::MatchedRegistry { id: found.id.clone(), name: name.to_owned() });
      return Ok(found.id);
    }

    let dims = self.dims;
    let id = allocate_code("registry", &registry_candidate(name), |c| dims.registry_exists(c))?;
    self.dims.insert_registry(&Registry { id: id.clone(), name: name.to_owned() })?;
    debug!(%id, name, "registry created");
    self.actions.push(ImportAction::CreatedRegistry { id: id.clone(), name: name.to_owned() });
    Ok(id)
  }

  /// Handler id for `name`, or `None` for a blank name.
  pub fn handler(&mut self, name: &str) -> Result<Option<String>, D::Error> {
    let name = name.trim();
    let Some(base) = handler_candidate(name) else {
      return Ok(None);
    };

    let handlers = self.dims.handlers()?;
    let needle = name.to_lowercase();
    let found = handlers
      .iter()
      .find(|h| h.name == name)
      .or_else(|| handlers.iter().find(|h| h.name.to_lowercase().contains(&needle)));
    if let Some(found) = found {
      debug!(id = %found.id, name, "handler matched");
      self.actions.push(ImportAction::MatchedHandler { id: found.id.clone(), name: name.to_owned() });
      return Ok(Some(found.id.clone()));
    }

    let dims = self.dims;
    let id = allocate_code("handler", &base, |c| dims.handler_exists(c))?;
    self.dims.insert_handler(&Handler { id: id.clone(), name: name.to_owned() })?;
    debug!(%id, name, "handler created");
    self.actions.push(ImportAction::CreatedHandler { id: id.clone(), name: name.to_owned() });
    Ok(Some(id))
  }

  /// The dossier number if a row for it exists (or could be created).
  ///
  /// Zero counts as absent. An existing dossier keeps its stored name.
  pub fn dossier(&mut self, number: Option<i64>, name: Option<&str>) -> Result<Option<i64>, D::Error> {
    let Some(number) = number.filter(|n| *n != 0) else {
      return Ok(None);
    };
    if self.dims.dossier_exists(number)? {
      return Ok(Some(number));
    }
    match name.map(str::trim).filter(|n| !n.is_empty()) {
      Some(name) => {
        self.dims.insert_dossier(&Dossier { number, name: name.to_owned() })?;
        self.actions.push(ImportAction::CreatedDossier { number, name: name.to_owned() });
        Ok(Some(number))
      }
      None => {
        self.actions.push(ImportAction::DroppedDossier { number });
        Ok(None)
      }
    }
  }

  /// The unit code if a row for it exists (or could be created).
  ///
  /// An existing unit keeps its stored name.
  pub fn unit(&mut self, code: Option<&str>, name: Option<&str>) -> Result<Option<String>, D::Error> {
    let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) else {
      return Ok(None);
    };
    if self.dims.unit_exists(code)? {
      return Ok(Some(code.to_owned()));
    }
    match name.map(str::trim).filter(|n| !n.is_empty()) {
      Some(name) => {
        self.dims.insert_unit(&Unit { code: code.to_owned(), name: name.to_owned() })?;
        self.actions.push(ImportAction::CreatedUnit { code: code.to_owned(), name: name.to_owned() });
        Ok(Some(code.to_owned()))
      }
      None => {
        self.actions.push(ImportAction::DroppedUnit { code: code.to_owned() });
        Ok(None)
      }
    }
  }
}

// ─── Whole-record reconciliation ─────────────────────────────────────────────

/// A log entry ready to insert; the store assigns its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLog {
  pub case_number: i64,
  pub registry_id: String,
  pub logged_at:   Option<NaiveDateTime>,
  pub description: String,
}

/// Rows to insert for one record, with every dimension key resolved.
#[derive(Debug, Clone)]
pub struct ResolvedRecord {
  pub case:    Case,
  pub notes:   Vec<Note>,
  pub logs:    Vec<ResolvedLog>,
  pub actions: Vec<ImportAction>,
}

/// Resolve every name in `record`, creating dimension rows through `dims`.
///
/// Notes resolve their own handler and fall back to the case handler. Notes
/// and log entries are attributed to the case's registry.
pub fn reconcile<D: Dimensions>(dims: &D, record: &ImportRecord) -> Result<ResolvedRecord, D::Error> {
  let mut resolver = Resolver::new(dims);
  let header = &record.case;

  let registry_id = resolver.registry(&header.registrar)?;
  let dossier_number = resolver.dossier(header.dossier_number, header.dossier_name.as_deref())?;
  let handler_id = resolver.handler(&header.handler)?;
  let unit_code = resolver.unit(header.unit_code.as_deref(), header.unit_name.as_deref())?;

  let case = Case {
    case_number: header.case_number,
    registry_id: registry_id.clone(),
    direction: header.direction,
    dossier_number,
    handler_id: handler_id.clone(),
    unit_code,
    received_date: header.received_date,
    registered_date: header.registered_date,
    closed_date: header.closed_date,
    status: header.status,
    subject_text: header.subject_text.clone(),
    counterpart_reference: header.counterpart_reference.clone(),
    correspondent: header.correspondent.clone(),
  };

  let mut notes = Vec::with_capacity(record.notes.len());
  for note in &record.notes {
    let note_handler = resolver.handler(&note.handler)?.or_else(|| handler_id.clone());
    notes.push(Note {
      case_number: header.case_number,
      line_number: note.line_number,
      direction: note.direction,
      text: note.text.clone(),
      registered_by: registry_id.clone(),
      received_date: note.received_date,
      sent_date: note.sent_date,
      handler_id: note_handler,
      counterpart: note.counterpart.clone(),
    });
  }

  let logs = record
    .logs
    .iter()
    .map(|log| ResolvedLog {
      case_number: header.case_number,
      registry_id: registry_id.clone(),
      logged_at:   log.logged_at,
      description: log.description(),
    })
    .collect();

  Ok(ResolvedRecord { case, notes, logs, actions: resolver.into_actions() })
}

#[cfg(test)]
mod tests {
  use std::cell::RefCell;

  use super::*;
  use crate::{
    case::{Direction, Status},
    import::{ImportedCase, ImportedLog, ImportedNote},
  };

  /// Dimension tables held in insertion-ordered vectors.
  #[derive(Default)]
  struct MemoryDims {
    registries: RefCell<Vec<Registry>>,
    handlers:   RefCell<Vec<Handler>>,
    dossiers:   RefCell<Vec<Dossier>>,
    units:      RefCell<Vec<Unit>>,
  }

  impl Dimensions for MemoryDims {
    type Error = Error;

    fn registries(&self) -> Result<Vec<Registry>, Error> { Ok(self.registries.borrow().clone()) }

    fn registry_exists(&self, id: &str) -> Result<bool, Error> {
      Ok(self.registries.borrow().iter().any(|r| r.id == id))
    }

    fn insert_registry(&self, registry: &Registry) -> Result<(), Error> {
      self.registries.borrow_mut().push(registry.clone());
      Ok(())
    }

    fn handlers(&self) -> Result<Vec<Handler>, Error> { Ok(self.handlers.borrow().clone()) }

    fn handler_exists(&self, id: &str) -> Result<bool, Error> {
      Ok(self.handlers.borrow().iter().any(|h| h.id == id))
    }

    fn insert_handler(&self, handler: &Handler) -> Result<(), Error> {
      self.handlers.borrow_mut().push(handler.clone());
      Ok(())
    }

    fn dossier_exists(&self, number: i64) -> Result<bool, Error> {
      Ok(self.dossiers.borrow().iter().any(|d| d.number == number))
    }

    fn insert_dossier(&self, dossier: &Dossier) -> Result<(), Error> {
      self.dossiers.borrow_mut().push(dossier.clone());
      Ok(())
    }

    fn unit_exists(&self, code: &str) -> Result<bool, Error> {
      Ok(self.units.borrow().iter().any(|u| u.code == code))
    }

    fn insert_unit(&self, unit: &Unit) -> Result<(), Error> {
      self.units.borrow_mut().push(unit.clone());
      Ok(())
    }
  }

  fn registry(id: &str, name: &str) -> Registry { Registry { id: id.into(), name: name.into() } }

  fn handler(id: &str, name: &str) -> Handler { Handler { id: id.into(), name: name.into() } }

  fn record() -> ImportRecord {
    ImportRecord {
      case:  ImportedCase {
        case_number:           1001,
        direction:             Direction::In,
        status:                Status::InProgress,
        subject_text:          "Ansökan om bygglov".into(),
        received_date:         None,
        registered_date:       None,
        closed_date:           None,
        counterpart_reference: String::new(),
        correspondent:         "Anna Svensson".into(),
        registrar:             "Anna Svensson".into(),
        handler:               "Karl Berg".into(),
        dossier_number:        Some(7),
        dossier_name:          Some("Bygglov".into()),
        unit_code:             Some("BN".into()),
        unit_name:             Some("Byggnadsnämnden".into()),
      },
      notes: vec![
        ImportedNote {
          line_number:   1,
          direction:     Direction::In,
          text:          "Ansökan inkom".into(),
          received_date: None,
          sent_date:     None,
          counterpart:   String::new(),
          registrar:     "Anna Svensson".into(),
          handler:       String::new(),
        },
        ImportedNote {
          line_number:   2,
          direction:     Direction::Out,
          text:          "Beslut skickat".into(),
          received_date: None,
          sent_date:     None,
          counterpart:   String::new(),
          registrar:     "Anna Svensson".into(),
          handler:       "Eva Lind".into(),
        },
      ],
      logs:  vec![ImportedLog {
        logged_at:  None,
        field_name: "Status".into(),
        registrar:  "Anna Svensson".into(),
      }],
    }
  }

  #[test]
  fn registry_matches_case_insensitive_substring_first_inserted_wins() {
    let dims = MemoryDims::default();
    dims.insert_registry(&registry("K1", "Kansliet Norr")).unwrap();
    dims.insert_registry(&registry("K2", "Kansliet Söder")).unwrap();

    let mut r = Resolver::new(&dims);
    assert_eq!(r.registry("kansliet").unwrap(), "K1");
    assert_eq!(r.registry("SÖDER").unwrap(), "K2");
    assert_eq!(dims.registries.borrow().len(), 2);
  }

  #[test]
  fn registry_miss_creates_uppercased_prefix_id() {
    let dims = MemoryDims::default();
    let mut r = Resolver::new(&dims);
    assert_eq!(r.registry("Anna Svensson").unwrap(), "ANN");
    assert_eq!(
      r.actions(),
      &[ImportAction::CreatedRegistry { id: "ANN".into(), name: "Anna Svensson".into() }]
    );

    // Second reference reuses the first-created row.
    assert_eq!(r.registry("Anna Svensson").unwrap(), "ANN");
    assert_eq!(dims.registries.borrow().len(), 1);
  }

  #[test]
  fn registry_prefix_collision_is_suffixed() {
    let dims = MemoryDims::default();
    dims.insert_registry(&registry("ANN", "Annexet")).unwrap();
    let mut r = Resolver::new(&dims);
    assert_eq!(r.registry("Anna Svensson").unwrap(), "ANN1");
  }

  #[test]
  fn registry_exhaustion_surfaces_resolution_error() {
    let dims = MemoryDims::default();
    dims.insert_registry(&registry("ANN", "Registrator 0")).unwrap();
    for i in 1..=99 {
      dims.insert_registry(&registry(&format!("ANN{i}"), &format!("Registrator {i}"))).unwrap();
    }
    let mut r = Resolver::new(&dims);
    let err = r.registry("Annika Holm").unwrap_err();
    assert!(matches!(err, Error::ResolutionExhausted { kind: "registry", .. }));
    assert_eq!(dims.registries.borrow().len(), 100);
  }

  #[test]
  fn blank_registrar_is_rejected() {
    let dims = MemoryDims::default();
    let mut r = Resolver::new(&dims);
    assert!(matches!(r.registry("  "), Err(Error::Validation(_))));
  }

  #[test]
  fn handler_prefers_exact_match_over_substring() {
    let dims = MemoryDims::default();
    dims.insert_handler(&handler("H1", "Karl Bergström")).unwrap();
    dims.insert_handler(&handler("H2", "Karl Berg")).unwrap();

    let mut r = Resolver::new(&dims);
    assert_eq!(r.handler("Karl Berg").unwrap().as_deref(), Some("H2"));
    assert_eq!(r.handler("bergström").unwrap().as_deref(), Some("H1"));
  }

  #[test]
  fn handler_miss_creates_length_based_id() {
    let dims = MemoryDims::default();
    dims.insert_handler(&handler("H44", "Olle Lund")).unwrap();
    let mut r = Resolver::new(&dims);
    // "Karl Berg" matches nothing by name but its derived id collides.
    assert_eq!(r.handler("Karl Berg").unwrap().as_deref(), Some("H441"));
    assert_eq!(dims.handlers.borrow()[1], handler("H441", "Karl Berg"));
    assert_eq!(r.handler("").unwrap(), None);
  }

  #[test]
  fn dossier_and_unit_never_overwrite_names() {
    let dims = MemoryDims::default();
    dims.insert_dossier(&Dossier { number: 7, name: "Original".into() }).unwrap();
    dims.insert_unit(&Unit { code: "BN".into(), name: "Original".into() }).unwrap();

    let mut r = Resolver::new(&dims);
    assert_eq!(r.dossier(Some(7), Some("Nytt namn")).unwrap(), Some(7));
    assert_eq!(r.unit(Some("BN"), Some("Nytt namn")).unwrap().as_deref(), Some("BN"));
    assert_eq!(dims.dossiers.borrow()[0].name, "Original");
    assert_eq!(dims.units.borrow()[0].name, "Original");
    assert!(r.actions().is_empty());
  }

  #[test]
  fn dossier_and_unit_absent_or_nameless_resolve_to_none() {
    let dims = MemoryDims::default();
    let mut r = Resolver::new(&dims);
    assert_eq!(r.dossier(None, Some("X")).unwrap(), None);
    assert_eq!(r.dossier(Some(0), Some("X")).unwrap(), None);
    assert_eq!(r.dossier(Some(9), None).unwrap(), None);
    assert_eq!(r.unit(None, Some("X")).unwrap(), None);
    assert_eq!(r.unit(Some("XY"), Some(" ")).unwrap(), None);
    assert!(dims.dossiers.borrow().is_empty());
    assert!(dims.units.borrow().is_empty());
    assert_eq!(
      r.actions(),
      &[ImportAction::DroppedDossier { number: 9 }, ImportAction::DroppedUnit { code: "XY".into() }]
    );
  }

  #[test]
  fn reconcile_builds_the_case_graph() {
    let dims = MemoryDims::default();
    let resolved = reconcile(&dims, &record()).unwrap();

    assert_eq!(resolved.case.case_number, 1001);
    assert_eq!(resolved.case.registry_id, "ANN");
    assert_eq!(resolved.case.direction, Direction::In);
    assert_eq!(resolved.case.status, Status::InProgress);
    assert_eq!(resolved.case.dossier_number, Some(7));
    assert_eq!(resolved.case.unit_code.as_deref(), Some("BN"));
    assert_eq!(resolved.case.handler_id.as_deref(), Some("H44"));

    // First note falls back to the case handler, second resolves its own.
    assert_eq!(resolved.notes[0].handler_id.as_deref(), Some("H44"));
    assert_eq!(resolved.notes[1].handler_id.as_deref(), Some("H43"));
    assert_eq!(dims.handlers.borrow().len(), 2);
    assert_eq!(dims.handlers.borrow()[1], handler("H43", "Eva Lind"));
    assert!(resolved.notes.iter().all(|n| n.registered_by == "ANN"));

    assert_eq!(resolved.logs.len(), 1);
    assert_eq!(resolved.logs[0].description, "Ändring av Status");
    assert_eq!(resolved.logs[0].registry_id, "ANN");
  }
}

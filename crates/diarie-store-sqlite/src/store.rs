//! [`SqliteStore`]: the SQLite implementation of [`CaseStore`].

use std::path::Path;

use chrono::{Local, NaiveDateTime};
use rusqlite::{Connection, OpenFlags, OptionalExtension as _, params};
use tracing::{debug, info};

use diarie_core::{
  case::{Actor, CaseDetail, CaseFields, CaseSummary, NewNote},
  dimension::{Dossier, Handler, Registry, Unit},
  import::{Disposition, ImportMode, ImportOutcome, ImportRecord, reconcile},
  store::CaseStore,
};

use crate::{
  Error, Result,
  dimensions::TxDimensions,
  encode::{
    CASE_SUMMARY_COLUMNS, CASE_SUMMARY_JOINS, RawCaseSummary, RawLogRow, RawNoteRow, encode_date,
    encode_datetime, encode_direction, encode_status,
  },
  schema,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Diarie case register backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and apply pending migrations.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an existing store without creating, migrating or re-configuring it.
  ///
  /// Fails if `path` does not exist or its schema is not the current one.
  /// Used by dry runs, which must leave the database untouched.
  pub async fn open_existing(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    if !path.exists() {
      return Err(Error::MissingDatabase(path.to_path_buf()));
    }
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
      | OpenFlags::SQLITE_OPEN_URI
      | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = tokio_rusqlite::Connection::open_with_flags(path, flags).await?;
    let store = Self { conn };
    store.run(schema::check_current).await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> { self.run(schema::apply).await }

  /// Stored schema version.
  pub async fn schema_version(&self) -> Result<u32> {
    self
      .run(|conn| Ok(conn.query_row("PRAGMA user_version", [], |r| r.get(0))?))
      .await
  }

  /// Run `f` on the connection thread, passing its own error type through.
  pub(crate) async fn run<R, F>(&self, f: F) -> Result<R>
  where
    F: FnOnce(&mut Connection) -> Result<R> + Send + 'static,
    R: Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

fn now() -> NaiveDateTime { Local::now().naive_local() }

fn case_registry(conn: &Connection, case_number: i64) -> Result<Option<String>> {
  Ok(
    conn
      .query_row(
        "SELECT registry_id FROM cases WHERE case_number = ?1",
        [case_number],
        |r| r.get(0),
      )
      .optional()?,
  )
}

fn insert_log(
  conn: &Connection,
  case_number: i64,
  registry_id: &str,
  logged_at: Option<NaiveDateTime>,
  description: &str,
) -> Result<()> {
  conn.execute(
    "INSERT INTO log_entries (case_number, registry_id, logged_at, description)
     VALUES (?1, ?2, ?3, ?4)",
    params![case_number, registry_id, encode_datetime(logged_at), description],
  )?;
  Ok(())
}

/// Reject dimension keys that have no row, naming the offending field.
fn check_references(conn: &Connection, fields: &CaseFields) -> Result<()> {
  let exists = |sql: &str, key: &dyn rusqlite::ToSql| -> Result<bool> {
    Ok(conn.query_row(sql, [key], |_| Ok(())).optional()?.is_some())
  };

  if !exists("SELECT 1 FROM registries WHERE id = ?1", &fields.registry_id)? {
    return Err(unknown(format!("registry {:?}", fields.registry_id)));
  }
  if let Some(id) = &fields.handler_id {
    if !exists("SELECT 1 FROM handlers WHERE id = ?1", id)? {
      return Err(unknown(format!("handler {id:?}")));
    }
  }
  if let Some(code) = &fields.unit_code {
    if !exists("SELECT 1 FROM units WHERE code = ?1", code)? {
      return Err(unknown(format!("unit {code:?}")));
    }
  }
  if let Some(number) = fields.dossier_number {
    if !exists("SELECT 1 FROM dossiers WHERE number = ?1", &number)? {
      return Err(unknown(format!("dossier {number}")));
    }
  }
  Ok(())
}

fn unknown(what: String) -> Error { diarie_core::Error::validation(format!("unknown {what}")).into() }

fn query_summaries(conn: &Connection, filter: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<CaseSummary>> {
  let sql = format!(
    "SELECT {CASE_SUMMARY_COLUMNS} {CASE_SUMMARY_JOINS} {filter}
     ORDER BY c.registered_date DESC, c.case_number DESC"
  );
  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(args, RawCaseSummary::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawCaseSummary::into_summary).collect()
}

fn query_detail(conn: &Connection, case_number: i64) -> Result<Option<CaseDetail>> {
  let Some(case) = query_summaries(conn, "WHERE c.case_number = ?1", &[&case_number])?
    .into_iter()
    .next()
  else {
    return Ok(None);
  };

  let mut stmt = conn.prepare(
    "SELECT n.case_number, n.line_number, n.direction, n.text, n.registered_by,
            n.received_date, n.sent_date, n.handler_id, n.counterpart, h.name
     FROM notes n
     LEFT JOIN handlers h ON h.id = n.handler_id
     WHERE n.case_number = ?1
     ORDER BY n.received_date DESC, n.line_number DESC",
  )?;
  let notes = stmt
    .query_map([case_number], |r| {
      Ok(RawNoteRow {
        case_number:   r.get(0)?,
        line_number:   r.get(1)?,
        direction:     r.get(2)?,
        text:          r.get(3)?,
        registered_by: r.get(4)?,
        received_date: r.get(5)?,
        sent_date:     r.get(6)?,
        handler_id:    r.get(7)?,
        counterpart:   r.get(8)?,
        handler_name:  r.get(9)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?
    .into_iter()
    .map(RawNoteRow::into_row)
    .collect::<Result<Vec<_>>>()?;

  let mut stmt = conn.prepare(
    "SELECT l.id, l.case_number, l.registry_id, l.logged_at, l.description, r.name
     FROM log_entries l
     LEFT JOIN registries r ON r.id = l.registry_id
     WHERE l.case_number = ?1
     ORDER BY l.logged_at DESC, l.id DESC",
  )?;
  let logs = stmt
    .query_map([case_number], |r| {
      Ok(RawLogRow {
        id:            r.get(0)?,
        case_number:   r.get(1)?,
        registry_id:   r.get(2)?,
        logged_at:     r.get(3)?,
        description:   r.get(4)?,
        registry_name: r.get(5)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?
    .into_iter()
    .map(RawLogRow::into_row)
    .collect::<Result<Vec<_>>>()?;

  Ok(Some(CaseDetail { case, notes, logs }))
}

fn list_named<T>(
  conn: &Connection,
  sql: &str,
  map: impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>> {
  let mut stmt = conn.prepare(sql)?;
  let rows = stmt.query_map([], map)?.collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

/// Insert the resolved rows of one record; the caller owns the transaction.
/// One record in its own transaction; a dry run always rolls back.
fn import_one(conn: &mut Connection, record: &ImportRecord, mode: ImportMode) -> Result<ImportOutcome> {
  let tx = conn.transaction()?;
  let mut outcome = import_in(&tx, record)?;
  match (mode, outcome.disposition) {
    (ImportMode::Commit, Disposition::Imported) => tx.commit()?,
    (ImportMode::DryRun, Disposition::Imported) => {
      outcome.disposition = Disposition::WouldImport;
      tx.rollback()?;
    }
    _ => tx.rollback()?,
  }
  Ok(outcome)
}

/// Every record under one transaction that is never committed, so later
/// records see the rows earlier ones would have written. A failing record
/// only rolls back its own savepoint.
fn dry_run_batch(conn: &mut Connection, records: &[ImportRecord]) -> Result<Vec<Result<ImportOutcome>>> {
  let mut tx = conn.transaction()?;
  let mut outcomes = Vec::with_capacity(records.len());

  for record in records {
    let sp = tx.savepoint()?;
    let outcome = import_in(&sp, record);
    match outcome {
      Ok(mut o) => {
        sp.commit()?;
        if o.disposition == Disposition::Imported {
          o.disposition = Disposition::WouldImport;
        }
        outcomes.push(Ok(o));
      }
      Err(e) => {
        debug!(case_number = record.case.case_number, error = %e, "dry-run record failed");
        outcomes.push(Err(e));
      }
    }
  }

  tx.rollback()?;
  Ok(outcomes)
}

fn import_in(conn: &Connection, record: &ImportRecord) -> Result<ImportOutcome> {
  let case_number = record.case.case_number;
  if case_registry(conn, case_number)?.is_some() {
    return Ok(ImportOutcome { case_number, disposition: Disposition::Skipped, actions: Vec::new() });
  }

  let resolved = reconcile(&TxDimensions(conn), record)?;
  let case = &resolved.case;

  conn.execute(
    "INSERT INTO cases (
       case_number, registry_id, direction, dossier_number, handler_id, unit_code,
       received_date, registered_date, closed_date, status,
       subject_text, counterpart_reference, correspondent
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
    params![
      case.case_number,
      case.registry_id,
      encode_direction(case.direction),
      case.dossier_number,
      case.handler_id,
      case.unit_code,
      encode_date(case.received_date),
      encode_date(case.registered_date),
      encode_date(case.closed_date),
      encode_status(case.status),
      case.subject_text,
      case.counterpart_reference,
      case.correspondent,
    ],
  )?;

  for note in &resolved.notes {
    conn.execute(
      "INSERT INTO notes (
         case_number, line_number, direction, text, registered_by,
         received_date, sent_date, handler_id, counterpart
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
      params![
        note.case_number,
        note.line_number,
        encode_direction(note.direction),
        note.text,
        note.registered_by,
        encode_date(note.received_date),
        encode_date(note.sent_date),
        note.handler_id,
        note.counterpart,
      ],
    )?;
  }

  for log in &resolved.logs {
    insert_log(conn, log.case_number, &log.registry_id, log.logged_at, &log.description)?;
  }

  debug!(
    case_number,
    notes = resolved.notes.len(),
    logs = resolved.logs.len(),
    "case graph inserted"
  );
  Ok(ImportOutcome { case_number, disposition: Disposition::Imported, actions: resolved.actions })
}

// ─── CaseStore impl ──────────────────────────────────────────────────────────

impl CaseStore for SqliteStore {
  type Error = Error;

  async fn list_cases(&self) -> Result<Vec<CaseSummary>> {
    self.run(|conn| query_summaries(conn, "", &[])).await
  }

  async fn get_case(&self, case_number: i64) -> Result<Option<CaseDetail>> {
    self.run(move |conn| query_detail(conn, case_number)).await
  }

  async fn create_case(&self, fields: CaseFields, actor: Actor) -> Result<i64> {
    let case_number = self
      .run(move |conn| {
        let tx = conn.transaction()?;
        check_references(&tx, &fields)?;

        let registered = fields.registered_date.or_else(|| Some(Local::now().date_naive()));
        tx.execute(
          "INSERT INTO cases (
             registry_id, direction, dossier_number, handler_id, unit_code,
             received_date, registered_date, closed_date, status,
             subject_text, counterpart_reference, correspondent
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
          params![
            fields.registry_id,
            encode_direction(fields.direction),
            fields.dossier_number,
            fields.handler_id,
            fields.unit_code,
            encode_date(fields.received_date),
            encode_date(registered),
            encode_date(fields.closed_date),
            encode_status(fields.status),
            fields.subject_text,
            fields.counterpart_reference,
            fields.correspondent,
          ],
        )?;
        let case_number = tx.last_insert_rowid();

        insert_log(
          &tx,
          case_number,
          &fields.registry_id,
          Some(now()),
          &format!("Nytt ärende skapat av {}", actor.username),
        )?;
        tx.commit()?;
        Ok(case_number)
      })
      .await?;

    info!(case_number, "case created");
    Ok(case_number)
  }

  async fn update_case(&self, case_number: i64, fields: CaseFields, actor: Actor) -> Result<()> {
    self
      .run(move |conn| {
        let tx = conn.transaction()?;
        check_references(&tx, &fields)?;

        let changed = tx.execute(
          "UPDATE cases SET
             registry_id = ?2, direction = ?3, dossier_number = ?4, handler_id = ?5,
             unit_code = ?6, received_date = ?7, registered_date = ?8, closed_date = ?9,
             status = ?10, subject_text = ?11, counterpart_reference = ?12,
             correspondent = ?13
           WHERE case_number = ?1",
          params![
            case_number,
            fields.registry_id,
            encode_direction(fields.direction),
            fields.dossier_number,
            fields.handler_id,
            fields.unit_code,
            encode_date(fields.received_date),
            encode_date(fields.registered_date),
            encode_date(fields.closed_date),
            encode_status(fields.status),
            fields.subject_text,
            fields.counterpart_reference,
            fields.correspondent,
          ],
        )?;
        if changed == 0 {
          return Err(diarie_core::Error::CaseNotFound(case_number).into());
        }

        insert_log(
          &tx,
          case_number,
          &fields.registry_id,
          Some(now()),
          &format!("Ärende uppdaterat av {}", actor.username),
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    info!(case_number, "case updated");
    Ok(())
  }

  async fn add_note(&self, case_number: i64, note: NewNote, actor: Actor) -> Result<i64> {
    let line_number = self
      .run(move |conn| {
        let tx = conn.transaction()?;
        let registry_id =
          case_registry(&tx, case_number)?.ok_or(diarie_core::Error::CaseNotFound(case_number))?;

        if let Some(id) = &note.handler_id {
          let known =
            tx.query_row("SELECT 1 FROM handlers WHERE id = ?1", [id], |_| Ok(())).optional()?;
          if known.is_none() {
            return Err(unknown(format!("handler {id:?}")));
          }
        }

        let line_number: i64 = tx.query_row(
          "SELECT COALESCE(MAX(line_number), 0) + 1 FROM notes WHERE case_number = ?1",
          [case_number],
          |r| r.get(0),
        )?;
        let received = note.received_date.or_else(|| Some(Local::now().date_naive()));

        tx.execute(
          "INSERT INTO notes (
             case_number, line_number, direction, text, registered_by,
             received_date, sent_date, handler_id, counterpart
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          params![
            case_number,
            line_number,
            encode_direction(note.direction),
            note.text,
            registry_id,
            encode_date(received),
            encode_date(note.sent_date),
            note.handler_id,
            note.counterpart,
          ],
        )?;

        insert_log(
          &tx,
          case_number,
          &registry_id,
          Some(now()),
          &format!("Ny anteckning tillagd av {}", actor.username),
        )?;
        tx.commit()?;
        Ok(line_number)
      })
      .await?;

    info!(case_number, line_number, "note added");
    Ok(line_number)
  }

  // ── Dimensions ────────────────────────────────────────────────────────────

  async fn list_registries(&self) -> Result<Vec<Registry>> {
    self
      .run(|conn| {
        list_named(conn, "SELECT id, name FROM registries ORDER BY name, id", |r| {
          Ok(Registry { id: r.get(0)?, name: r.get(1)? })
        })
      })
      .await
  }

  async fn list_handlers(&self) -> Result<Vec<Handler>> {
    self
      .run(|conn| {
        list_named(conn, "SELECT id, name FROM handlers ORDER BY name, id", |r| {
          Ok(Handler { id: r.get(0)?, name: r.get(1)? })
        })
      })
      .await
  }

  async fn list_units(&self) -> Result<Vec<Unit>> {
    self
      .run(|conn| {
        list_named(conn, "SELECT code, name FROM units ORDER BY name, code", |r| {
          Ok(Unit { code: r.get(0)?, name: r.get(1)? })
        })
      })
      .await
  }

  async fn list_dossiers(&self) -> Result<Vec<Dossier>> {
    self
      .run(|conn| {
        list_named(conn, "SELECT number, name FROM dossiers ORDER BY name, number", |r| {
          Ok(Dossier { number: r.get(0)?, name: r.get(1)? })
        })
      })
      .await
  }

  // ── Import ────────────────────────────────────────────────────────────────

  async fn import_record(&self, record: ImportRecord, mode: ImportMode) -> Result<ImportOutcome> {
    self.run(move |conn| import_one(conn, &record, mode)).await
  }

  async fn import_batch(
    &self,
    records: Vec<ImportRecord>,
    mode: ImportMode,
  ) -> Result<Vec<Result<ImportOutcome>>> {
    self
      .run(move |conn| match mode {
        ImportMode::Commit => Ok(records.iter().map(|r| import_one(conn, r, mode)).collect()),
        ImportMode::DryRun => dry_run_batch(conn, &records),
      })
      .await
  }
}

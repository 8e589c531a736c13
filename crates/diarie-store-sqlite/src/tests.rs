//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, NaiveDate, Utc};
use diarie_core::{
  case::{Actor, CaseFields, Direction, NewNote, Status},
  import::{
    Disposition, ImportAction, ImportMode, ImportRecord, ImportedCase, ImportedLog, ImportedNote,
  },
  store::{AccountStore, CaseStore},
};

use crate::{Error, SqliteStore, schema};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

/// A store with one registry and one handler to reference from forms.
async fn seeded() -> SqliteStore {
  let s = store().await;
  s.run(|conn| {
    conn.execute_batch(
      "INSERT INTO registries (id, name) VALUES ('KAN', 'Kansliet');
       INSERT INTO handlers (id, name) VALUES ('H44', 'Karl Berg');",
    )?;
    Ok(())
  })
  .await
  .unwrap();
  s
}

async fn count(s: &SqliteStore, table: &'static str) -> i64 {
  s.run(move |conn| Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?))
    .await
    .unwrap()
}

fn actor() -> Actor { Actor::new("admin") }

fn note(text: &str) -> NewNote {
  NewNote {
    direction:     Direction::In,
    text:          text.into(),
    handler_id:    None,
    counterpart:   String::new(),
    received_date: None,
    sent_date:     None,
  }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

// ─── Schema ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn fresh_store_is_at_latest_schema_version() {
  let s = store().await;
  assert_eq!(s.schema_version().await.unwrap(), schema::latest_version());
}

#[tokio::test]
async fn newer_schema_is_refused() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("diarie.db");

  let s = SqliteStore::open(&path).await.unwrap();
  s.run(|conn| {
    conn.execute_batch("PRAGMA user_version = 99;")?;
    Ok(())
  })
  .await
  .unwrap();
  drop(s);

  let err = SqliteStore::open(&path).await.err().expect("open should fail");
  assert!(matches!(err, Error::UnsupportedSchemaVersion { found: 99, .. }));
}

#[tokio::test]
async fn reopening_keeps_data() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("diarie.db");

  let s = SqliteStore::open(&path).await.unwrap();
  s.import_record(record(1001), ImportMode::Commit).await.unwrap();
  drop(s);

  let s = SqliteStore::open(&path).await.unwrap();
  assert_eq!(s.list_cases().await.unwrap().len(), 1);
}

#[tokio::test]
async fn open_existing_creates_and_migrates_nothing() {
  let dir = tempfile::tempdir().unwrap();

  let missing = dir.path().join("missing.db");
  let err = SqliteStore::open_existing(&missing).await.err().expect("missing file");
  assert!(matches!(err, Error::MissingDatabase(_)));
  assert!(!missing.exists());

  let blank = dir.path().join("blank.db");
  rusqlite::Connection::open(&blank).unwrap();
  let err = SqliteStore::open_existing(&blank).await.err().expect("unmigrated file");
  assert!(matches!(err, Error::OutdatedSchemaVersion { found: 0, .. }));
  let version: u32 = rusqlite::Connection::open(&blank)
    .unwrap()
    .query_row("PRAGMA user_version", [], |r| r.get(0))
    .unwrap();
  assert_eq!(version, 0);

  let current = dir.path().join("diarie.db");
  drop(SqliteStore::open(&current).await.unwrap());
  let s = SqliteStore::open_existing(&current).await.unwrap();
  assert_eq!(s.schema_version().await.unwrap(), schema::latest_version());
}

// ─── Cases ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_case_logs_exactly_once() {
  let s = seeded().await;
  let mut fields = CaseFields::new("KAN", Direction::In, Status::New);
  fields.subject_text = "Ansökan om bidrag".into();
  fields.handler_id = Some("H44".into());

  let n = s.create_case(fields, actor()).await.unwrap();
  let detail = s.get_case(n).await.unwrap().unwrap();

  assert_eq!(detail.case.case.subject_text, "Ansökan om bidrag");
  assert_eq!(detail.case.registry_name.as_deref(), Some("Kansliet"));
  assert_eq!(detail.case.handler_name.as_deref(), Some("Karl Berg"));
  assert!(detail.case.case.registered_date.is_some());
  assert_eq!(detail.logs.len(), 1);
  assert_eq!(detail.logs[0].entry.description, "Nytt ärende skapat av admin");
  assert_eq!(detail.logs[0].entry.registry_id, "KAN");
}

#[tokio::test]
async fn update_and_note_each_append_one_log_entry() {
  let s = seeded().await;
  let n = s
    .create_case(CaseFields::new("KAN", Direction::In, Status::New), actor())
    .await
    .unwrap();

  let mut fields = CaseFields::new("KAN", Direction::Out, Status::Closed);
  fields.closed_date = Some(date(2024, 3, 1));
  s.update_case(n, fields, actor()).await.unwrap();
  s.add_note(n, note("Komplettering"), actor()).await.unwrap();

  let detail = s.get_case(n).await.unwrap().unwrap();
  assert_eq!(detail.case.case.direction, Direction::Out);
  assert_eq!(detail.case.case.status, Status::Closed);
  assert_eq!(detail.logs.len(), 3);

  let mut descriptions: Vec<_> = detail.logs.iter().map(|l| l.entry.description.as_str()).collect();
  descriptions.sort_unstable();
  assert_eq!(
    descriptions,
    ["Ny anteckning tillagd av admin", "Nytt ärende skapat av admin", "Ärende uppdaterat av admin"]
  );
}

#[tokio::test]
async fn update_missing_case_is_not_found() {
  let s = seeded().await;
  let err = s
    .update_case(42, CaseFields::new("KAN", Direction::In, Status::New), actor())
    .await
    .unwrap_err();
  assert!(err.is_not_found());
  assert_eq!(count(&s, "log_entries").await, 0);
}

#[tokio::test]
async fn unknown_registry_is_a_validation_error() {
  let s = seeded().await;
  let err = s
    .create_case(CaseFields::new("NOPE", Direction::In, Status::New), actor())
    .await
    .unwrap_err();
  assert!(err.is_user_error());
  assert_eq!(count(&s, "cases").await, 0);
}

#[tokio::test]
async fn note_line_numbers_continue_from_max() {
  let s = seeded().await;
  let n = s
    .create_case(CaseFields::new("KAN", Direction::In, Status::New), actor())
    .await
    .unwrap();

  assert_eq!(s.add_note(n, note("Första"), actor()).await.unwrap(), 1);
  assert_eq!(s.add_note(n, note("Andra"), actor()).await.unwrap(), 2);

  // Imported notes may leave gaps; the next number is still max + 1.
  s.run(move |conn| {
    conn.execute(
      "INSERT INTO notes (case_number, line_number, direction, registered_by)
       VALUES (?1, 7, 'IN', 'KAN')",
      [n],
    )?;
    Ok(())
  })
  .await
  .unwrap();
  assert_eq!(s.add_note(n, note("Åttonde"), actor()).await.unwrap(), 8);

  let detail = s.get_case(n).await.unwrap().unwrap();
  assert!(detail.notes.iter().all(|r| r.note.registered_by == "KAN"));
}

#[tokio::test]
async fn note_on_missing_case_is_not_found() {
  let s = seeded().await;
  assert!(s.add_note(5, note("x"), actor()).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn note_received_date_defaults_to_today() {
  let s = seeded().await;
  let n = s
    .create_case(CaseFields::new("KAN", Direction::In, Status::New), actor())
    .await
    .unwrap();
  s.add_note(n, note("Idag"), actor()).await.unwrap();

  let detail = s.get_case(n).await.unwrap().unwrap();
  assert!(detail.notes[0].note.received_date.is_some());
}

#[tokio::test]
async fn list_orders_by_registered_date_descending() {
  let s = seeded().await;
  for (day, subject) in [(1, "äldst"), (20, "nyast"), (10, "mitten")] {
    let mut f = CaseFields::new("KAN", Direction::In, Status::New);
    f.registered_date = Some(date(2024, 1, day));
    f.subject_text = subject.into();
    s.create_case(f, actor()).await.unwrap();
  }

  let subjects: Vec<_> = s
    .list_cases()
    .await
    .unwrap()
    .into_iter()
    .map(|c| c.case.subject_text)
    .collect();
  assert_eq!(subjects, ["nyast", "mitten", "äldst"]);
}

#[tokio::test]
async fn get_missing_case_returns_none() {
  let s = store().await;
  assert!(s.get_case(9999).await.unwrap().is_none());
}

// ─── Import ──────────────────────────────────────────────────────────────────

fn record(case_number: i64) -> ImportRecord {
  ImportRecord {
    case:  ImportedCase {
      case_number,
      direction: Direction::In,
      status: Status::InProgress,
      subject_text: "Bygglov Storgatan 1".into(),
      received_date: Some(date(2023, 11, 5)),
      registered_date: Some(date(2023, 11, 6)),
      closed_date: None,
      counterpart_reference: "REF-1".into(),
      correspondent: "Bo Ek".into(),
      registrar: "Anna Svensson".into(),
      handler: "Karl Berg".into(),
      dossier_number: Some(7),
      dossier_name: Some("Bygglov".into()),
      unit_code: Some("BN".into()),
      unit_name: Some("Byggnadsnämnden".into()),
    },
    notes: vec![ImportedNote {
      line_number:   1,
      direction:     Direction::In,
      text:          "Ansökan inkom".into(),
      received_date: Some(date(2023, 11, 5)),
      sent_date:     None,
      counterpart:   "Bo Ek".into(),
      registrar:     "Anna Svensson".into(),
      handler:       String::new(),
    }],
    logs:  vec![ImportedLog {
      logged_at:  NaiveDate::from_ymd_opt(2023, 11, 6).and_then(|d| d.and_hms_opt(0, 0, 0)),
      field_name: "Status".into(),
      registrar:  "Anna Svensson".into(),
    }],
  }
}

#[tokio::test]
async fn import_persists_the_case_graph() {
  let s = store().await;
  let outcome = s.import_record(record(1001), ImportMode::Commit).await.unwrap();
  assert_eq!(outcome.disposition, Disposition::Imported);
  assert!(outcome.actions.contains(&ImportAction::CreatedRegistry {
    id:   "ANN".into(),
    name: "Anna Svensson".into(),
  }));

  let detail = s.get_case(1001).await.unwrap().unwrap();
  let case = &detail.case.case;
  assert_eq!(case.direction, Direction::In);
  assert_eq!(case.status, Status::InProgress);
  assert_eq!(case.registry_id, "ANN");
  assert_eq!(case.handler_id.as_deref(), Some("H44"));
  assert_eq!(detail.case.dossier_name.as_deref(), Some("Bygglov"));
  assert_eq!(detail.case.unit_name.as_deref(), Some("Byggnadsnämnden"));
  assert_eq!(detail.notes.len(), 1);
  assert_eq!(detail.notes[0].handler_name.as_deref(), Some("Karl Berg"));
  assert_eq!(detail.logs.len(), 1);
  assert_eq!(detail.logs[0].entry.description, "Ändring av Status");
}

#[tokio::test]
async fn import_suffixes_a_taken_registry_id() {
  let s = store().await;
  s.run(|conn| {
    conn.execute("INSERT INTO registries (id, name) VALUES ('ANN', 'Annexet')", [])?;
    Ok(())
  })
  .await
  .unwrap();

  s.import_record(record(1001), ImportMode::Commit).await.unwrap();
  let detail = s.get_case(1001).await.unwrap().unwrap();
  assert_eq!(detail.case.case.registry_id, "ANN1");
}

#[tokio::test]
async fn duplicate_import_is_skipped() {
  let s = store().await;
  s.import_record(record(1001), ImportMode::Commit).await.unwrap();

  let mut again = record(1001);
  again.case.subject_text = "Annan rubrik".into();
  let outcome = s.import_record(again, ImportMode::Commit).await.unwrap();

  assert_eq!(outcome.disposition, Disposition::Skipped);
  assert_eq!(count(&s, "cases").await, 1);
  assert_eq!(count(&s, "notes").await, 1);
  let detail = s.get_case(1001).await.unwrap().unwrap();
  assert_eq!(detail.case.case.subject_text, "Bygglov Storgatan 1");
}

#[tokio::test]
async fn second_record_reuses_dimension_rows() {
  let s = store().await;
  s.import_record(record(1001), ImportMode::Commit).await.unwrap();
  let outcome = s.import_record(record(1002), ImportMode::Commit).await.unwrap();

  assert!(outcome.actions.contains(&ImportAction::MatchedRegistry {
    id:   "ANN".into(),
    name: "Anna Svensson".into(),
  }));
  assert_eq!(count(&s, "registries").await, 1);
  assert_eq!(count(&s, "handlers").await, 1);
  assert_eq!(count(&s, "dossiers").await, 1);
  assert_eq!(count(&s, "units").await, 1);
}

#[tokio::test]
async fn failed_import_rolls_back_everything() {
  let s = store().await;
  let mut bad = record(1001);
  // Two notes with the same line number violate the primary key after the
  // dimensions and the case row have already been inserted.
  bad.notes.push(bad.notes[0].clone());

  assert!(s.import_record(bad, ImportMode::Commit).await.is_err());
  for table in ["cases", "notes", "log_entries", "registries", "handlers", "dossiers", "units"] {
    assert_eq!(count(&s, table).await, 0, "{table} should be empty");
  }
}

#[tokio::test]
async fn blank_registrar_fails_the_record() {
  let s = store().await;
  let mut bad = record(1001);
  bad.case.registrar = "  ".into();
  let err = s.import_record(bad, ImportMode::Commit).await.unwrap_err();
  assert!(err.is_user_error());
}

#[tokio::test]
async fn dry_run_writes_nothing() {
  let s = store().await;
  let outcome = s.import_record(record(1001), ImportMode::DryRun).await.unwrap();

  assert_eq!(outcome.disposition, Disposition::WouldImport);
  assert!(!outcome.actions.is_empty());
  assert_eq!(count(&s, "cases").await, 0);
  assert_eq!(count(&s, "registries").await, 0);
}

#[tokio::test]
async fn dry_run_batch_predicts_the_commit() {
  let batch = || {
    let mut blank = record(1002);
    blank.case.registrar = String::new();
    vec![record(1001), record(1001), blank, record(1003)]
  };

  let s = store().await;
  let dry = s.import_batch(batch(), ImportMode::DryRun).await.unwrap();
  let dispositions: Vec<_> = dry.iter().map(|r| r.as_ref().ok().map(|o| o.disposition)).collect();
  assert_eq!(
    dispositions,
    [Some(Disposition::WouldImport), Some(Disposition::Skipped), None, Some(Disposition::WouldImport)]
  );
  let last = dry[3].as_ref().unwrap();
  assert!(last.actions.contains(&ImportAction::MatchedRegistry {
    id:   "ANN".into(),
    name: "Anna Svensson".into(),
  }));
  assert_eq!(count(&s, "cases").await, 0);
  assert_eq!(count(&s, "registries").await, 0);

  let committed = s.import_batch(batch(), ImportMode::Commit).await.unwrap();
  let dispositions: Vec<_> =
    committed.iter().map(|r| r.as_ref().ok().map(|o| o.disposition)).collect();
  assert_eq!(
    dispositions,
    [Some(Disposition::Imported), Some(Disposition::Skipped), None, Some(Disposition::Imported)]
  );
  assert_eq!(count(&s, "cases").await, 2);
  assert_eq!(count(&s, "registries").await, 1);
}

#[tokio::test]
async fn dimension_lists_are_sorted_by_name() {
  let s = store().await;
  s.run(|conn| {
    conn.execute_batch(
      "INSERT INTO handlers (id, name) VALUES ('H2', 'Örjan'), ('H1', 'Berit'), ('H3', 'Adam');",
    )?;
    Ok(())
  })
  .await
  .unwrap();

  let names: Vec<_> = s.list_handlers().await.unwrap().into_iter().map(|h| h.name).collect();
  assert_eq!(names, ["Adam", "Berit", "Örjan"]);
}

// ─── Accounts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn first_user_can_only_be_created_once() {
  let s = store().await;
  assert_eq!(s.user_count().await.unwrap(), 0);

  let first = s.create_first_user("admin".into(), "hash".into()).await.unwrap();
  assert_eq!(first.map(|u| u.username).as_deref(), Some("admin"));

  let second = s.create_first_user("mallory".into(), "hash".into()).await.unwrap();
  assert!(second.is_none());
  assert_eq!(s.user_count().await.unwrap(), 1);
  assert!(s.find_user("mallory".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn sessions_expire() {
  let s = store().await;
  let user = s.create_first_user("admin".into(), "hash".into()).await.unwrap().unwrap();
  let now = Utc::now();

  s.create_session("live".into(), user.id, now + Duration::hours(1)).await.unwrap();
  s.create_session("stale".into(), user.id, now - Duration::minutes(1)).await.unwrap();

  let found = s.session_user("live".into(), now).await.unwrap();
  assert_eq!(found.map(|u| u.id), Some(user.id));
  assert!(s.session_user("stale".into(), now).await.unwrap().is_none());
  assert!(s.session_user("unknown".into(), now).await.unwrap().is_none());

  s.delete_session("live".into()).await.unwrap();
  assert!(s.session_user("live".into(), now).await.unwrap().is_none());
}

#[tokio::test]
async fn new_sessions_prune_expired_ones() {
  let s = store().await;
  let user = s.create_first_user("admin".into(), "hash".into()).await.unwrap().unwrap();
  let now = Utc::now();

  s.create_session("stale".into(), user.id, now - Duration::minutes(1)).await.unwrap();
  s.create_session("old".into(), user.id, now - Duration::days(3)).await.unwrap();
  assert_eq!(count(&s, "sessions").await, 1);

  s.create_session("fresh".into(), user.id, now + Duration::hours(1)).await.unwrap();
  assert_eq!(count(&s, "sessions").await, 1);
  assert!(s.session_user("fresh".into(), now).await.unwrap().is_some());
}

//! SQL schema for the Diarie SQLite store.
//!
//! The applied schema version is kept in `PRAGMA user_version`. At open, every
//! migration newer than the stored version runs inside one transaction; a
//! database written by a newer binary is refused.

use rusqlite::Connection;
use tracing::info;

use crate::{Error, Result};

/// Connection settings; must run outside any transaction.
pub const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
";

struct Migration {
  version: u32,
  sql:     &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration { version: 1, sql: INITIAL }];

const INITIAL: &str = "
CREATE TABLE registries (
    id    TEXT PRIMARY KEY,
    name  TEXT NOT NULL
);

CREATE TABLE handlers (
    id    TEXT PRIMARY KEY,
    name  TEXT NOT NULL
);

CREATE TABLE units (
    code  TEXT PRIMARY KEY,
    name  TEXT NOT NULL
);

CREATE TABLE dossiers (
    number  INTEGER PRIMARY KEY,
    name    TEXT NOT NULL
);

-- case_number is assigned by SQLite unless supplied by an import.
CREATE TABLE cases (
    case_number           INTEGER PRIMARY KEY,
    registry_id           TEXT NOT NULL REFERENCES registries(id),
    direction             TEXT NOT NULL CHECK (direction IN ('IN', 'UT', 'INTERN')),
    dossier_number        INTEGER REFERENCES dossiers(number),
    handler_id            TEXT REFERENCES handlers(id),
    unit_code             TEXT REFERENCES units(code),
    received_date         TEXT,
    registered_date       TEXT,
    closed_date           TEXT,
    status                TEXT NOT NULL CHECK (status IN ('Ny', 'Pågående', 'Avslutad')),
    subject_text          TEXT NOT NULL DEFAULT '',
    counterpart_reference TEXT NOT NULL DEFAULT '',
    correspondent         TEXT NOT NULL DEFAULT ''
);

CREATE TABLE notes (
    case_number    INTEGER NOT NULL REFERENCES cases(case_number),
    line_number    INTEGER NOT NULL CHECK (line_number >= 1),
    direction      TEXT NOT NULL CHECK (direction IN ('IN', 'UT', 'INTERN')),
    text           TEXT NOT NULL DEFAULT '',
    registered_by  TEXT NOT NULL REFERENCES registries(id),
    received_date  TEXT,
    sent_date      TEXT,
    handler_id     TEXT REFERENCES handlers(id),
    counterpart    TEXT NOT NULL DEFAULT '',
    PRIMARY KEY (case_number, line_number)
);

-- Append-only audit trail. No UPDATE or DELETE is ever issued against it.
CREATE TABLE log_entries (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    case_number  INTEGER NOT NULL REFERENCES cases(case_number),
    registry_id  TEXT NOT NULL REFERENCES registries(id),
    logged_at    TEXT,
    description  TEXT NOT NULL
);

CREATE TABLE users (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    username       TEXT NOT NULL UNIQUE,
    password_hash  TEXT NOT NULL,
    created_at     TEXT NOT NULL
);

-- Only the SHA-256 of a session token is stored.
CREATE TABLE sessions (
    token_hash  TEXT PRIMARY KEY,
    user_id     INTEGER NOT NULL REFERENCES users(id),
    created_at  TEXT NOT NULL,
    expires_at  TEXT NOT NULL
);

CREATE INDEX cases_registered_idx ON cases(registered_date);
CREATE INDEX log_entries_case_idx ON log_entries(case_number);
CREATE INDEX sessions_user_idx    ON sessions(user_id);
";

/// Schema version this binary writes.
pub fn latest_version() -> u32 { MIGRATIONS.last().map_or(0, |m| m.version) }

/// Accept a database only if it is already at [`latest_version`].
///
/// Writes nothing: only the per-connection `foreign_keys` setting is changed.
pub fn check_current(conn: &mut Connection) -> Result<()> {
  conn.execute_batch("PRAGMA foreign_keys = ON;")?;

  let current: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
  let latest = latest_version();
  if current > latest {
    return Err(Error::UnsupportedSchemaVersion { found: current, supported: latest });
  }
  if current < latest {
    return Err(Error::OutdatedSchemaVersion { found: current, expected: latest });
  }
  Ok(())
}

/// Bring the schema up to [`latest_version`].
pub fn apply(conn: &mut Connection) -> Result<()> {
  conn.execute_batch(PRAGMAS)?;

  let current: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
  let latest = latest_version();

  if current > latest {
    return Err(Error::UnsupportedSchemaVersion { found: current, supported: latest });
  }
  if current == latest {
    return Ok(());
  }

  let tx = conn.transaction()?;
  for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
    tx.execute_batch(migration.sql)?;
    tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
  }
  tx.commit()?;

  info!(from = current, to = latest, "database schema migrated");
  Ok(())
}

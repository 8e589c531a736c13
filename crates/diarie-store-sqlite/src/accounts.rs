//! [`AccountStore`] for [`SqliteStore`].

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, params};
use tracing::{debug, info};

use diarie_core::{account::User, store::AccountStore};

use crate::{
  Error, Result, SqliteStore,
  encode::{decode_dt, encode_dt},
};

fn user_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
  Ok(User { id: r.get(0)?, username: r.get(1)?, password_hash: r.get(2)? })
}

impl AccountStore for SqliteStore {
  type Error = Error;

  async fn user_count(&self) -> Result<u64> {
    self
      .run(|conn| {
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
        Ok(n.unsigned_abs())
      })
      .await
  }

  async fn create_first_user(&self, username: String, password_hash: String) -> Result<Option<User>> {
    let created = self
      .run(move |conn| {
        // Conditional on the table being empty so two racing setups cannot
        // both succeed.
        let inserted = conn.execute(
          "INSERT INTO users (username, password_hash, created_at)
           SELECT ?1, ?2, ?3
           WHERE NOT EXISTS (SELECT 1 FROM users)",
          params![username, password_hash, encode_dt(Utc::now())],
        )?;
        if inserted == 0 {
          return Ok(None);
        }
        Ok(Some(User { id: conn.last_insert_rowid(), username, password_hash }))
      })
      .await?;

    if let Some(user) = &created {
      info!(username = %user.username, "first account created");
    }
    Ok(created)
  }

  async fn find_user(&self, username: String) -> Result<Option<User>> {
    self
      .run(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id, username, password_hash FROM users WHERE username = ?1",
              [username],
              user_from_row,
            )
            .optional()?,
        )
      })
      .await
  }

  async fn create_session(&self, token_hash: String, user_id: i64, expires_at: DateTime<Utc>) -> Result<()> {
    self
      .run(move |conn| {
        let now = encode_dt(Utc::now());
        let pruned = conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", [&now])?;
        if pruned > 0 {
          debug!(pruned, "expired sessions removed");
        }
        conn.execute(
          "INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
           VALUES (?1, ?2, ?3, ?4)",
          params![token_hash, user_id, now, encode_dt(expires_at)],
        )?;
        Ok(())
      })
      .await
  }

  async fn session_user(&self, token_hash: String, now: DateTime<Utc>) -> Result<Option<User>> {
    self
      .run(move |conn| {
        let row: Option<(User, String)> = conn
          .query_row(
            "SELECT u.id, u.username, u.password_hash, s.expires_at
             FROM sessions s
             JOIN users u ON u.id = s.user_id
             WHERE s.token_hash = ?1",
            [&token_hash],
            |r| Ok((user_from_row(r)?, r.get(3)?)),
          )
          .optional()?;

        let Some((user, expires_at)) = row else {
          return Ok(None);
        };
        if decode_dt("expires_at", &expires_at)? <= now {
          conn.execute("DELETE FROM sessions WHERE token_hash = ?1", [&token_hash])?;
          return Ok(None);
        }
        Ok(Some(user))
      })
      .await
  }

  async fn delete_session(&self, token_hash: String) -> Result<()> {
    self
      .run(move |conn| {
        conn.execute("DELETE FROM sessions WHERE token_hash = ?1", [token_hash])?;
        Ok(())
      })
      .await
  }
}

//! Dimension-table access on top of an open transaction.

use diarie_core::{
  dimension::{Dossier, Handler, Registry, Unit},
  import::Dimensions,
};
use rusqlite::{Connection, OptionalExtension as _, params};

use crate::{Error, Result};

/// Borrowed connection used by [`diarie_core::import::reconcile`].
///
/// Callers hand in the `Transaction` (which derefs to `Connection`) so that
/// every row created during resolution shares the import's fate.
pub struct TxDimensions<'c>(pub &'c Connection);

impl TxDimensions<'_> {
  fn exists(&self, sql: &str, key: impl rusqlite::ToSql) -> Result<bool> {
    Ok(self.0.query_row(sql, [key], |_| Ok(())).optional()?.is_some())
  }
}

impl Dimensions for TxDimensions<'_> {
  type Error = Error;

  fn registries(&self) -> Result<Vec<Registry>> {
    let mut stmt = self.0.prepare("SELECT id, name FROM registries ORDER BY rowid")?;
    let rows = stmt
      .query_map([], |r| Ok(Registry { id: r.get(0)?, name: r.get(1)? }))?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
  }

  fn registry_exists(&self, id: &str) -> Result<bool> {
    self.exists("SELECT 1 FROM registries WHERE id = ?1", id)
  }

  fn insert_registry(&self, registry: &Registry) -> Result<()> {
    self.0.execute(
      "INSERT INTO registries (id, name) VALUES (?1, ?2)",
      params![registry.id, registry.name],
    )?;
    Ok(())
  }

  fn handlers(&self) -> Result<Vec<Handler>> {
    let mut stmt = self.0.prepare("SELECT id, name FROM handlers ORDER BY rowid")?;
    let rows = stmt
      .query_map([], |r| Ok(Handler { id: r.get(0)?, name: r.get(1)? }))?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
  }

  fn handler_exists(&self, id: &str) -> Result<bool> {
    self.exists("SELECT 1 FROM handlers WHERE id = ?1", id)
  }

  fn insert_handler(&self, handler: &Handler) -> Result<()> {
    self.0.execute(
      "INSERT INTO handlers (id, name) VALUES (?1, ?2)",
      params![handler.id, handler.name],
    )?;
    Ok(())
  }

  fn dossier_exists(&self, number: i64) -> Result<bool> {
    self.exists("SELECT 1 FROM dossiers WHERE number = ?1", number)
  }

  fn insert_dossier(&self, dossier: &Dossier) -> Result<()> {
    self.0.execute(
      "INSERT INTO dossiers (number, name) VALUES (?1, ?2)",
      params![dossier.number, dossier.name],
    )?;
    Ok(())
  }

  fn unit_exists(&self, code: &str) -> Result<bool> {
    self.exists("SELECT 1 FROM units WHERE code = ?1", code)
  }

  fn insert_unit(&self, unit: &Unit) -> Result<()> {
    self.0.execute(
      "INSERT INTO units (code, name) VALUES (?1, ?2)",
      params![unit.code, unit.name],
    )?;
    Ok(())
  }
}

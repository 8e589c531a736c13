//! Batch import of exported case records.
//!
//! Each file is read and parsed on its own, then the records are handed to the
//! store as one batch. A file that fails is reported and the batch carries
//! on; the store rolls that record back so nothing partial is left behind.

use std::path::{Path, PathBuf};

use diarie_core::{
  import::{Disposition, ImportMode, ImportOutcome, ImportRecord},
  store::CaseStore,
};
use diarie_store_sqlite::SqliteStore;
use thiserror::Error;
use tracing::{info, warn};

/// Why a single file could not be imported.
#[derive(Debug, Error)]
pub enum FileError {
  #[error("cannot read file: {0}")]
  Read(#[from] std::io::Error),

  #[error(transparent)]
  Parse(#[from] diarie_xml::Error),

  #[error("import failed: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Result of importing one file.
#[derive(Debug)]
pub struct FileReport {
  pub path:   PathBuf,
  pub result: Result<ImportOutcome, FileError>,
}

impl FileReport {
  /// One human-readable line for the terminal.
  pub fn line(&self) -> String {
    let path = self.path.display();
    match &self.result {
      Ok(o) => match o.disposition {
        Disposition::Imported => format!("imported  {path}: case {}", o.case_number),
        Disposition::WouldImport => format!("would import  {path}: case {}", o.case_number),
        Disposition::Skipped => format!("skipped  {path}: case {} already exists", o.case_number),
      },
      Err(e) => format!("FAILED  {path}: {e}"),
    }
  }
}

/// Tally over a batch.
#[derive(Debug, Default)]
pub struct ImportSummary {
  /// Imported, or would have been in a dry run.
  pub imported: u64,
  pub skipped:  u64,
  pub failed:   u64,
  pub files:    Vec<FileReport>,
}

impl ImportSummary {
  pub fn has_failures(&self) -> bool { self.failed > 0 }

  fn record(&mut self, report: FileReport) {
    match &report.result {
      Ok(o) if o.disposition == Disposition::Skipped => self.skipped += 1,
      Ok(_) => self.imported += 1,
      Err(_) => self.failed += 1,
    }
    self.files.push(report);
  }
}

/// Open the database for `mode`.
///
/// A commit opens (or creates) the store and migrates it. A dry run only
/// accepts an existing database already at the current schema, so it never
/// creates a file or changes one.
pub async fn open_store(
  path: &Path,
  mode: ImportMode,
) -> Result<SqliteStore, diarie_store_sqlite::Error> {
  match mode {
    ImportMode::Commit => SqliteStore::open(path).await,
    ImportMode::DryRun => SqliteStore::open_existing(path).await,
  }
}

async fn read_record(path: &Path) -> Result<ImportRecord, FileError> {
  let xml = tokio::fs::read_to_string(path).await?;
  Ok(diarie_xml::parse(&xml)?)
}

/// Import a single export file.
pub async fn import_file<S: CaseStore>(
  store: &S,
  path: &Path,
  mode: ImportMode,
) -> Result<ImportOutcome, FileError> {
  let record = read_record(path).await?;
  store
    .import_record(record, mode)
    .await
    .map_err(|e| FileError::Store(Box::new(e)))
}

/// Import every file in `paths`, in order, never stopping at a failed file.
///
/// A dry run reconciles the whole batch together, so its tally matches what
/// committing the same files would report. Only a failure of the store
/// itself aborts the batch.
pub async fn import_files<S: CaseStore>(
  store: &S,
  paths: &[PathBuf],
  mode: ImportMode,
) -> Result<ImportSummary, S::Error> {
  let mut results: Vec<Option<Result<ImportOutcome, FileError>>> = Vec::with_capacity(paths.len());
  let mut records = Vec::new();
  let mut slots = Vec::new();

  for (i, path) in paths.iter().enumerate() {
    match read_record(path).await {
      Ok(record) => {
        records.push(record);
        slots.push(i);
        results.push(None);
      }
      Err(e) => results.push(Some(Err(e))),
    }
  }

  let outcomes = store.import_batch(records, mode).await?;
  for (i, outcome) in slots.into_iter().zip(outcomes) {
    results[i] = Some(outcome.map_err(|e| FileError::Store(Box::new(e))));
  }

  let mut summary = ImportSummary::default();
  for (path, result) in paths.iter().zip(results) {
    let Some(result) = result else { continue };
    log_result(path, &result, mode);
    summary.record(FileReport { path: path.clone(), result });
  }
  Ok(summary)
}

fn log_result(path: &Path, result: &Result<ImportOutcome, FileError>, mode: ImportMode) {
  match result {
    Ok(outcome) if outcome.disposition == Disposition::Skipped => {
      warn!(path = %path.display(), case_number = outcome.case_number, "case already exists, skipped");
    }
    Ok(outcome) => {
      for action in &outcome.actions {
        info!(case_number = outcome.case_number, "{action}");
      }
      let message = match mode {
        ImportMode::Commit => "record imported",
        ImportMode::DryRun => "record would be imported",
      };
      info!(path = %path.display(), case_number = outcome.case_number, "{message}");
    }
    Err(e) => warn!(path = %path.display(), error = %e, "import failed"),
  }
}

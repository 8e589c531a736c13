//! Error type for `diarie-store-sqlite`.

use std::path::PathBuf;

use diarie_core::store::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] diarie_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  /// A stored value could not be decoded into its domain type.
  #[error("cannot decode {column}: {value:?}")]
  Decode { column: &'static str, value: String },

  #[error("database schema version {found} is newer than supported version {supported}")]
  UnsupportedSchemaVersion { found: u32, supported: u32 },

  #[error("database schema version {found} is older than {expected}; open it read-write once to migrate")]
  OutdatedSchemaVersion { found: u32, expected: u32 },

  #[error("database {0:?} does not exist")]
  MissingDatabase(PathBuf),
}

impl DomainError for Error {
  fn as_domain(&self) -> Option<&diarie_core::Error> {
    match self {
      Self::Core(e) => Some(e),
      _ => None,
    }
  }
}

impl Error {
  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::Core(diarie_core::Error::CaseNotFound(_)))
  }

  /// Errors caused by the caller's input rather than by the database.
  pub fn is_user_error(&self) -> bool {
    matches!(
      self,
      Self::Core(diarie_core::Error::Validation(_) | diarie_core::Error::CaseNotFound(_))
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

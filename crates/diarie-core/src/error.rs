//! Error types for `diarie-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A required field was missing or a supplied value could not be used.
  #[error("validation error: {0}")]
  Validation(String),

  #[error("case not found: {0}")]
  CaseNotFound(i64),

  /// Every candidate short code for a new dimension row is already taken.
  #[error("no free {kind} code left for base {base:?}")]
  ResolutionExhausted { kind: &'static str, base: String },

  /// An external record could not be read.
  #[error("parse error: {0}")]
  Parse(String),
}

impl Error {
  pub fn validation(msg: impl Into<String>) -> Self {
    Self::Validation(msg.into())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

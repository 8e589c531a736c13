//! Error types for the diarie-xml record codec.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("malformed XML: {0}")]
  Xml(String),

  #[error("document contains no AErende element")]
  MissingCase,

  #[error("AErende has no Diarienummer")]
  MissingCaseNumber,

  #[error("{element} is not a number: {value:?}")]
  InvalidNumber { element: &'static str, value: String },
}

impl From<Error> for diarie_core::Error {
  fn from(e: Error) -> Self { diarie_core::Error::Parse(e.to_string()) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

//! Error types and axum `IntoResponse` implementation.

use axum::{
  http::StatusCode,
  response::{Html, IntoResponse, Redirect, Response},
};
use diarie_core::store::DomainError;
use thiserror::Error;
use tracing::error;

use crate::html;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,
  #[error("not found")]
  NotFound,
  #[error("{0}")]
  Validation(String),
  #[error("internal error: {0}")]
  Internal(String),
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Classify a case-store failure: input problems stay visible to the user.
  pub fn from_store<E>(e: E) -> Self
  where
    E: std::error::Error + DomainError + Send + Sync + 'static,
  {
    match e.as_domain() {
      Some(diarie_core::Error::CaseNotFound(_)) => Error::NotFound,
      Some(diarie_core::Error::Validation(msg)) => Error::Validation(msg.clone()),
      _ => Error::Store(Box::new(e)),
    }
  }

  /// Wrap an account-store failure; these never carry user input problems.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Error::Store(Box::new(e))
  }
}

impl From<diarie_core::Error> for Error {
  fn from(e: diarie_core::Error) -> Self {
    match e {
      diarie_core::Error::Validation(msg) => Error::Validation(msg),
      diarie_core::Error::CaseNotFound(_) => Error::NotFound,
      other => Error::Internal(other.to_string()),
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Unauthorized => Redirect::to("/auth/login").into_response(),
      Error::NotFound => (
        StatusCode::NOT_FOUND,
        Html(html::message_page("Hittades inte", "Sidan eller ärendet finns inte.")),
      )
        .into_response(),
      Error::Validation(msg) => (
        StatusCode::BAD_REQUEST,
        Html(html::message_page("Ogiltig begäran", &msg)),
      )
        .into_response(),
      Error::Internal(msg) => {
        error!(error = %msg, "request failed");
        internal()
      }
      Error::Store(e) => {
        error!(error = %e, "store operation failed");
        internal()
      }
    }
  }
}

fn internal() -> Response {
  (
    StatusCode::INTERNAL_SERVER_ERROR,
    Html(html::message_page("Internt fel", "Ett oväntat fel inträffade.")),
  )
    .into_response()
}

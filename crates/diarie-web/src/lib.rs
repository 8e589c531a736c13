//! HTML front end and session layer for the Diarie case register.
//!
//! Serves the case pages, the login/setup flow and mounts the JSON API from
//! `diarie-api` behind the same session check. Everything is backed by any
//! store implementing both [`CaseStore`] and [`AccountStore`].

pub mod auth;
pub mod cookie;
pub mod error;
pub mod handlers;
pub mod html;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router, middleware,
  routing::{get, post},
};
use diarie_core::store::{AccountStore, CaseStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use handlers::{account, cases};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `DIARIE_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:           String,
  pub port:           u16,
  pub database_path:  PathBuf,
  /// Lifetime of an ordinary login.
  pub session_hours:  i64,
  /// Lifetime of a "remember me" login.
  pub remember_days:  i64,
  /// Mark cookies `Secure`; enable when served over HTTPS.
  pub secure_cookies: bool,
}

// ─── Application state ───────────────────────────────────────────────────────

/// Everything a web handler needs from its store.
pub trait Backend: CaseStore + AccountStore + 'static {}

impl<T: CaseStore + AccountStore + 'static> Backend for T {}

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), config: self.config.clone() }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the complete application router.
pub fn router<S: Backend>(state: AppState<S>) -> Router {
  let protected = Router::new()
    .route("/", get(cases::index::<S>))
    .route("/case/new", get(cases::new_form::<S>).post(cases::create::<S>))
    .route("/case/{n}", get(cases::show::<S>))
    .route("/case/{n}/edit", get(cases::edit_form::<S>).post(cases::update::<S>))
    .route("/case/{n}/note", post(cases::add_note::<S>))
    .nest_service("/api", diarie_api::api_router(state.store.clone()))
    .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_session::<S>));

  let public = Router::new()
    .route("/auth/login", get(account::login_form::<S>).post(account::login::<S>))
    .route("/auth/logout", post(account::logout::<S>))
    .route("/auth/setup", get(account::setup_form::<S>).post(account::setup::<S>));

  protected
    .merge(public)
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

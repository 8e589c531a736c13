//! Read-only JSON API for the Diarie case register.
//!
//! Exposes an axum [`Router`] backed by any [`diarie_core::store::CaseStore`].
//! Authentication is the caller's responsibility; the web server nests this
//! router behind its session check.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", diarie_api::api_router(store.clone()))
//! ```

pub mod cases;
pub mod error;

use std::sync::Arc;

use axum::{Router, routing::get};
use diarie_core::store::CaseStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: CaseStore + 'static,
{
  Router::new()
    .route("/cases", get(cases::list::<S>))
    .route("/case/{id}", get(cases::get_one::<S>))
    .with_state(store)
}

//! Session authentication: password hashing, session tokens, the
//! [`CurrentUser`] extractor and the middleware guarding every case page.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::{
  extract::{FromRequestParts, OriginalUri, Request, State},
  http::{HeaderMap, Uri, request::Parts},
  middleware::Next,
  response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use diarie_core::{account::User, store::AccountStore};
use rand_core::{OsRng, RngCore as _};
use sha2::{Digest, Sha256};

use crate::{AppState, Backend, cookie, error::Error};

// ─── Passwords ───────────────────────────────────────────────────────────────

/// Argon2 PHC string for `password` with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, Error> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| Error::Internal(format!("argon2 error: {e}")))
}

pub fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc)
    .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
    .unwrap_or(false)
}

// ─── Session tokens ──────────────────────────────────────────────────────────

/// 32 random bytes, hex-encoded. Goes into the cookie only.
pub fn new_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

/// What the store keeps in place of the token.
pub fn hash_token(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

/// The user behind the request's session cookie, if it is valid.
pub async fn session_user<S: Backend>(
  headers: &HeaderMap,
  state: &AppState<S>,
) -> Result<Option<User>, Error> {
  let Some(token) = cookie::get(headers, cookie::SESSION_COOKIE) else {
    return Ok(None);
  };
  state
    .store
    .session_user(hash_token(token), Utc::now())
    .await
    .map_err(Error::store)
}

// ─── Redirect targets ────────────────────────────────────────────────────────

/// `next` if it is a local absolute path, otherwise `/`.
pub fn safe_next(next: Option<&str>) -> &str {
  match next {
    Some(n) if n.starts_with('/') && !n.starts_with("//") && !n.contains('\\') => n,
    _ => "/",
  }
}

/// Login page URL that returns to `uri` afterwards.
pub fn login_url(uri: &Uri) -> String {
  let target = uri.path_and_query().map_or("/", |pq| pq.as_str());
  if target == "/" {
    return "/auth/login".to_owned();
  }
  format!("/auth/login?next={}", urlencoding::encode(target))
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// The logged-in user. Present in a handler means the request was
/// authenticated.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S: Backend> FromRequestParts<AppState<S>> for CurrentUser {
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    if let Some(user) = parts.extensions.get::<CurrentUser>() {
      return Ok(user.clone());
    }
    session_user(&parts.headers, state)
      .await?
      .map(CurrentUser)
      .ok_or(Error::Unauthorized)
  }
}

// ─── Middleware ──────────────────────────────────────────────────────────────

/// Reject requests without a valid session.
///
/// HTML pages redirect to the login form with a `next` parameter; JSON API
/// paths get a `401` with an error body.
pub async fn require_session<S: Backend>(
  State(state): State<AppState<S>>,
  mut req: Request,
  next: Next,
) -> Response {
  let user = session_user(req.headers(), &state).await;
  match user {
    Ok(Some(user)) => {
      req.extensions_mut().insert(CurrentUser(user));
      next.run(req).await
    }
    Ok(None) => {
      let uri = req
        .extensions()
        .get::<OriginalUri>()
        .map_or_else(|| req.uri().clone(), |o| o.0.clone());
      if uri.path() == "/api" || uri.path().starts_with("/api/") {
        diarie_api::ApiError::Unauthorized.into_response()
      } else {
        Redirect::to(&login_url(&uri)).into_response()
      }
    }
    Err(e) => e.into_response(),
  }
}

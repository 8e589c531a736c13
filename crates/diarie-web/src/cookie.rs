//! Session and flash cookies.
//!
//! Cookies are read straight from the `Cookie` header and written as
//! `Set-Cookie` strings. Both cookies are `HttpOnly; SameSite=Lax` with
//! `Path=/`; `Secure` is added when the server is configured for HTTPS.

use std::{convert::Infallible, fmt::Write as _};

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, StatusCode, header, request::Parts},
  response::{AppendHeaders, Html, IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD as B64};

use crate::{AppState, Backend};

pub const SESSION_COOKIE: &str = "diarie_session";
pub const FLASH_COOKIE: &str = "diarie_flash";

/// Flash messages only need to survive one redirect.
const FLASH_MAX_AGE: i64 = 60;

/// Value of cookie `name`, if the request carries it.
pub fn get<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
  headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(k, _)| *k == name)
    .map(|(_, v)| v)
}

/// Build a `Set-Cookie` value. `max_age` of `None` makes a browser-session
/// cookie.
pub fn set(name: &str, value: &str, max_age: Option<i64>, secure: bool) -> String {
  let mut out = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax");
  if let Some(age) = max_age {
    let _ = write!(out, "; Max-Age={age}");
  }
  if secure {
    out.push_str("; Secure");
  }
  out
}

pub fn clear(name: &str, secure: bool) -> String { set(name, "", Some(0), secure) }

pub fn flash(message: &str, secure: bool) -> String {
  set(FLASH_COOKIE, &B64.encode(message), Some(FLASH_MAX_AGE), secure)
}

// ─── Flash extractor ─────────────────────────────────────────────────────────

/// The pending flash message, if any. Rendering a page through
/// [`Flash::page`] consumes it.
pub struct Flash {
  pub message: Option<String>,
  secure:      bool,
}

impl Flash {
  pub fn from_headers(headers: &HeaderMap, secure: bool) -> Self {
    let message = get(headers, FLASH_COOKIE)
      .and_then(|v| B64.decode(v).ok())
      .and_then(|bytes| String::from_utf8(bytes).ok())
      .filter(|m| !m.is_empty());
    Self { message, secure }
  }

  /// Respond with `html`, clearing the flash cookie if one was shown.
  pub fn page(&self, status: StatusCode, html: String) -> Response {
    let clear = self
      .message
      .as_ref()
      .map(|_| (header::SET_COOKIE, clear(FLASH_COOKIE, self.secure)));
    (status, AppendHeaders(clear), Html(html)).into_response()
  }
}

impl<S: Backend> FromRequestParts<AppState<S>> for Flash {
  type Rejection = Infallible;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    Ok(Flash::from_headers(&parts.headers, state.config.secure_cookies))
  }
}

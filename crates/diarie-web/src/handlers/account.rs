//! Login, logout and first-account setup.

use axum::{
  Form,
  extract::{Query, State},
  http::{HeaderMap, StatusCode, header},
  response::{AppendHeaders, Html, IntoResponse, Redirect, Response},
};
use chrono::{Duration, Utc};
use diarie_core::store::AccountStore;
use serde::Deserialize;
use tracing::{info, warn};

use super::redirect_with_flash;
use crate::{
  AppState, Backend,
  auth::{hash_password, hash_token, new_token, safe_next, verify_password},
  cookie::{self, Flash},
  error::Error,
  html::{self, Chrome},
};

const MIN_PASSWORD_LEN: usize = 8;

// ─── Login ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
  pub next: Option<String>,
}

/// `GET /auth/login[?next=<path>]`
pub async fn login_form<S: Backend>(
  State(state): State<AppState<S>>,
  flash: Flash,
  Query(query): Query<LoginQuery>,
) -> Result<Response, Error> {
  if state.store.user_count().await.map_err(Error::store)? == 0 {
    return Ok(Redirect::to("/auth/setup").into_response());
  }

  let next = safe_next(query.next.as_deref());
  let chrome = Chrome { title: "Logga in", flash: flash.message.as_deref(), ..Chrome::default() };
  Ok(flash.page(StatusCode::OK, html::layout(&chrome, &html::login_form(next, ""))))
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
  pub username: String,
  pub password: String,
  /// Present when the "remember me" box is ticked.
  pub remember: Option<String>,
  pub next:     Option<String>,
}

/// `POST /auth/login`
pub async fn login<S: Backend>(
  State(state): State<AppState<S>>,
  Form(form): Form<LoginForm>,
) -> Result<Response, Error> {
  let user = state
    .store
    .find_user(form.username.trim().to_owned())
    .await
    .map_err(Error::store)?
    .filter(|u| verify_password(&form.password, &u.password_hash));

  let next = safe_next(form.next.as_deref());

  let Some(user) = user else {
    warn!(username = %form.username, "rejected login");
    let chrome = Chrome {
      title: "Logga in",
      error: Some("Fel användarnamn eller lösenord."),
      ..Chrome::default()
    };
    let page = html::layout(&chrome, &html::login_form(next, &form.username));
    return Ok((StatusCode::UNAUTHORIZED, Html(page)).into_response());
  };

  let remember = form.remember.is_some();
  let lifetime = if remember {
    Duration::days(state.config.remember_days)
  } else {
    Duration::hours(state.config.session_hours)
  };

  let token = new_token();
  state
    .store
    .create_session(hash_token(&token), user.id, Utc::now() + lifetime)
    .await
    .map_err(Error::store)?;
  info!(username = %user.username, remember, "user logged in");

  let secure = state.config.secure_cookies;
  let session = cookie::set(
    cookie::SESSION_COOKIE,
    &token,
    remember.then(|| lifetime.num_seconds()),
    secure,
  );
  let flash = cookie::flash(&format!("Inloggad som {}", user.username), secure);

  Ok(
    (
      AppendHeaders([(header::SET_COOKIE, session), (header::SET_COOKIE, flash)]),
      Redirect::to(next),
    )
      .into_response(),
  )
}

// ─── Logout ──────────────────────────────────────────────────────────────────

/// `POST /auth/logout`
pub async fn logout<S: Backend>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
) -> Result<Response, Error> {
  if let Some(token) = cookie::get(&headers, cookie::SESSION_COOKIE) {
    state
      .store
      .delete_session(hash_token(token))
      .await
      .map_err(Error::store)?;
  }

  let secure = state.config.secure_cookies;
  Ok(
    (
      AppendHeaders([
        (header::SET_COOKIE, cookie::clear(cookie::SESSION_COOKIE, secure)),
        (header::SET_COOKIE, cookie::flash("Du är utloggad.", secure)),
      ]),
      Redirect::to("/auth/login"),
    )
      .into_response(),
  )
}

// ─── First account ───────────────────────────────────────────────────────────

/// `GET /auth/setup`. Only reachable while no account exists.
pub async fn setup_form<S: Backend>(State(state): State<AppState<S>>) -> Result<Response, Error> {
  if state.store.user_count().await.map_err(Error::store)? > 0 {
    return Ok(Redirect::to("/auth/login").into_response());
  }
  let chrome = Chrome { title: "Skapa konto", ..Chrome::default() };
  Ok(Html(html::layout(&chrome, &html::setup_form(""))).into_response())
}

#[derive(Debug, Deserialize)]
pub struct SetupForm {
  pub username: String,
  pub password: String,
  pub confirm:  String,
}

impl SetupForm {
  fn validate(&self) -> Result<(), &'static str> {
    if self.username.trim().is_empty() {
      return Err("Användarnamn krävs.");
    }
    if self.password.chars().count() < MIN_PASSWORD_LEN {
      return Err("Lösenordet måste vara minst 8 tecken.");
    }
    if self.password != self.confirm {
      return Err("Lösenorden stämmer inte överens.");
    }
    Ok(())
  }
}

/// `POST /auth/setup`
pub async fn setup<S: Backend>(
  State(state): State<AppState<S>>,
  Form(form): Form<SetupForm>,
) -> Result<Response, Error> {
  if state.store.user_count().await.map_err(Error::store)? > 0 {
    return Ok(Redirect::to("/auth/login").into_response());
  }
  if let Err(msg) = form.validate() {
    let chrome = Chrome { title: "Skapa konto", error: Some(msg), ..Chrome::default() };
    let page = html::layout(&chrome, &html::setup_form(&form.username));
    return Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(page)).into_response());
  }

  let username = form.username.trim().to_owned();
  let created = state
    .store
    .create_first_user(username, hash_password(&form.password)?)
    .await
    .map_err(Error::store)?;

  let secure = state.config.secure_cookies;
  match created {
    Some(user) => {
      info!(username = %user.username, "first account created");
      Ok(redirect_with_flash("/auth/login", "Kontot är skapat. Logga in.", secure))
    }
    None => {
      warn!("setup attempted after an account already exists");
      Ok(Redirect::to("/auth/login").into_response())
    }
  }
}

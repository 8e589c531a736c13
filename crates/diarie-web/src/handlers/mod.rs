//! HTML request handlers.
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | `GET`  | `/` | [`cases::index`] |
//! | `GET`/`POST` | `/case/new` | [`cases::new_form`], [`cases::create`] |
//! | `GET`  | `/case/{n}` | [`cases::show`] |
//! | `GET`/`POST` | `/case/{n}/edit` | [`cases::edit_form`], [`cases::update`] |
//! | `POST` | `/case/{n}/note` | [`cases::add_note`] |
//! | `GET`/`POST` | `/auth/login` | [`account::login_form`], [`account::login`] |
//! | `POST` | `/auth/logout` | [`account::logout`] |
//! | `GET`/`POST` | `/auth/setup` | [`account::setup_form`], [`account::setup`] |

pub mod account;
pub mod cases;

use axum::{
  http::header,
  response::{AppendHeaders, IntoResponse, Redirect, Response},
};

use crate::cookie;

/// `303 See Other` to `to`, carrying `message` to the next page.
fn redirect_with_flash(to: &str, message: &str, secure: bool) -> Response {
  (
    AppendHeaders([(header::SET_COOKIE, cookie::flash(message, secure))]),
    Redirect::to(to),
  )
    .into_response()
}

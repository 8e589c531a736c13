//! Case list, detail, create/edit forms and the add-note action.

use axum::{
  Form,
  extract::{Path, State},
  http::StatusCode,
  response::{Html, IntoResponse, Response},
};
use diarie_core::{
  case::{Actor, Case, CaseFields, CaseForm, Direction, NewNote, NoteForm, Status},
  store::CaseStore,
};
use tracing::info;

use super::redirect_with_flash;
use crate::{
  AppState, Backend,
  auth::CurrentUser,
  cookie::Flash,
  error::Error,
  html::{self, Chrome, Choices},
};

fn case_number(raw: &str) -> Result<i64, Error> { raw.parse().map_err(|_| Error::NotFound) }

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /`
pub async fn index<S: Backend>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  flash: Flash,
) -> Result<Response, Error> {
  let cases = state.store.list_cases().await.map_err(Error::from_store)?;
  let chrome = Chrome {
    title: "Ärenden",
    user: Some(&user.username),
    flash: flash.message.as_deref(),
    error: None,
  };
  Ok(flash.page(StatusCode::OK, html::layout(&chrome, &html::case_list(&cases))))
}

// ─── Detail and notes ────────────────────────────────────────────────────────

/// `GET /case/{n}`
pub async fn show<S: Backend>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  flash: Flash,
  Path(raw): Path<String>,
) -> Result<Response, Error> {
  let number = case_number(&raw)?;
  let note = NoteForm::default();
  let page =
    detail_page(&state, &user.username, number, &note, flash.message.as_deref(), None).await?;
  Ok(flash.page(StatusCode::OK, page))
}

/// `POST /case/{n}/note`
pub async fn add_note<S: Backend>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  Path(raw): Path<String>,
  Form(form): Form<NoteForm>,
) -> Result<Response, Error> {
  let number = case_number(&raw)?;

  let result = match NewNote::try_from(form.clone()) {
    Ok(note) => state
      .store
      .add_note(number, note, Actor::new(user.username.clone()))
      .await
      .map_err(Error::from_store),
    Err(e) => Err(e.into()),
  };

  match result {
    Ok(line) => {
      info!(case_number = number, line, user = %user.username, "note added");
      Ok(redirect_with_flash(
        &format!("/case/{number}"),
        &format!("Anteckning {line} tillagd"),
        state.config.secure_cookies,
      ))
    }
    Err(Error::Validation(msg)) => {
      let page = detail_page(&state, &user.username, number, &form, None, Some(&msg)).await?;
      Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(page)).into_response())
    }
    Err(e) => Err(e),
  }
}

async fn detail_page<S: Backend>(
  state: &AppState<S>,
  username: &str,
  number: i64,
  note: &NoteForm,
  flash: Option<&str>,
  error: Option<&str>,
) -> Result<String, Error> {
  let detail = state
    .store
    .get_case(number)
    .await
    .map_err(Error::from_store)?
    .ok_or(Error::NotFound)?;
  let handlers = state.store.list_handlers().await.map_err(Error::from_store)?;

  let title = format!("Ärende {number}");
  let chrome = Chrome { title: &title, user: Some(username), flash, error };
  Ok(html::layout(&chrome, &html::case_detail(&detail, &handlers, note)))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `GET /case/new`
pub async fn new_form<S: Backend>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
) -> Result<Response, Error> {
  let form = CaseForm {
    direction: Some(Direction::default().as_str().to_owned()),
    status: Some(Status::default().as_str().to_owned()),
    ..CaseForm::default()
  };
  form_page(&state, &user.username, FormTarget::Create, &form, None, StatusCode::OK).await
}

/// `POST /case/new`
pub async fn create<S: Backend>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  Form(form): Form<CaseForm>,
) -> Result<Response, Error> {
  let result = match CaseFields::try_from(form.clone()) {
    Ok(fields) => state
      .store
      .create_case(fields, Actor::new(user.username.clone()))
      .await
      .map_err(Error::from_store),
    Err(e) => Err(e.into()),
  };

  match result {
    Ok(number) => {
      info!(case_number = number, user = %user.username, "case created");
      Ok(redirect_with_flash(
        &format!("/case/{number}"),
        &format!("Ärende {number} skapat"),
        state.config.secure_cookies,
      ))
    }
    Err(Error::Validation(msg)) => {
      form_page(
        &state,
        &user.username,
        FormTarget::Create,
        &form,
        Some(&msg),
        StatusCode::UNPROCESSABLE_ENTITY,
      )
      .await
    }
    Err(e) => Err(e),
  }
}

// ─── Edit ────────────────────────────────────────────────────────────────────

/// `GET /case/{n}/edit`
pub async fn edit_form<S: Backend>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  Path(raw): Path<String>,
) -> Result<Response, Error> {
  let number = case_number(&raw)?;
  let detail = state
    .store
    .get_case(number)
    .await
    .map_err(Error::from_store)?
    .ok_or(Error::NotFound)?;

  let form = form_values(&detail.case.case);
  form_page(&state, &user.username, FormTarget::Edit(number), &form, None, StatusCode::OK).await
}

/// `POST /case/{n}/edit`
pub async fn update<S: Backend>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  Path(raw): Path<String>,
  Form(form): Form<CaseForm>,
) -> Result<Response, Error> {
  let number = case_number(&raw)?;

  let result = match CaseFields::try_from(form.clone()) {
    Ok(fields) => state
      .store
      .update_case(number, fields, Actor::new(user.username.clone()))
      .await
      .map_err(Error::from_store),
    Err(e) => Err(e.into()),
  };

  match result {
    Ok(()) => {
      info!(case_number = number, user = %user.username, "case updated");
      Ok(redirect_with_flash(
        &format!("/case/{number}"),
        &format!("Ärende {number} uppdaterat"),
        state.config.secure_cookies,
      ))
    }
    Err(Error::Validation(msg)) => {
      form_page(
        &state,
        &user.username,
        FormTarget::Edit(number),
        &form,
        Some(&msg),
        StatusCode::UNPROCESSABLE_ENTITY,
      )
      .await
    }
    Err(e) => Err(e),
  }
}

// ─── Form rendering ──────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum FormTarget {
  Create,
  Edit(i64),
}

async fn form_page<S: Backend>(
  state: &AppState<S>,
  username: &str,
  target: FormTarget,
  form: &CaseForm,
  error: Option<&str>,
  status: StatusCode,
) -> Result<Response, Error> {
  let choices = choices(state.store.as_ref()).await?;
  let (title, action, submit) = match target {
    FormTarget::Create => ("Nytt ärende".to_owned(), "/case/new".to_owned(), "Skapa"),
    FormTarget::Edit(n) => (format!("Redigera ärende {n}"), format!("/case/{n}/edit"), "Spara"),
  };

  let chrome = Chrome { title: &title, user: Some(username), flash: None, error };
  let page = html::layout(&chrome, &html::case_form(&action, submit, form, &choices));
  Ok((status, Html(page)).into_response())
}

async fn choices<S: CaseStore>(store: &S) -> Result<Choices, Error> {
  Ok(Choices {
    registries: store.list_registries().await.map_err(Error::from_store)?,
    handlers:   store.list_handlers().await.map_err(Error::from_store)?,
    units:      store.list_units().await.map_err(Error::from_store)?,
    dossiers:   store.list_dossiers().await.map_err(Error::from_store)?,
  })
}

/// A stored case as the text values its edit form starts from.
fn form_values(case: &Case) -> CaseForm {
  let date = |d: Option<chrono::NaiveDate>| d.map(|d| d.format("%Y-%m-%d").to_string());
  CaseForm {
    registry_id:           Some(case.registry_id.clone()),
    direction:             Some(case.direction.as_str().to_owned()),
    status:                Some(case.status.as_str().to_owned()),
    dossier_number:        case.dossier_number.map(|n| n.to_string()),
    handler_id:            case.handler_id.clone(),
    unit_code:             case.unit_code.clone(),
    received_date:         date(case.received_date),
    registered_date:       date(case.registered_date),
    closed_date:           date(case.closed_date),
    subject_text:          Some(case.subject_text.clone()),
    counterpart_reference: Some(case.counterpart_reference.clone()),
    correspondent:         Some(case.correspondent.clone()),
  }
}

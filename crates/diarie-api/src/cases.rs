//! Handlers for the read-only case endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/cases` | Every case, newest registration first |
//! | `GET`  | `/case/{id}` | Case with notes and log; 404 if not found |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use diarie_core::{
  case::{CaseSummary, LogRow, NoteRow},
  store::CaseStore,
};
use serde::Serialize;

use crate::error::ApiError;

/// Constant `"success"` marker carried by every successful response.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Success {
  Success,
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CaseList {
  pub status: Success,
  pub count:  usize,
  pub cases:  Vec<CaseSummary>,
}

/// `GET /cases`
pub async fn list<S>(State(store): State<Arc<S>>) -> Result<Json<CaseList>, ApiError>
where
  S: CaseStore,
{
  let cases = store
    .list_cases()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(CaseList { status: Success::Success, count: cases.len(), cases }))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CaseResponse {
  pub status: Success,
  pub case:   CaseSummary,
  pub notes:  Vec<NoteRow>,
  pub logs:   Vec<LogRow>,
}

/// `GET /case/{id}`
///
/// A non-numeric id cannot name a case and is reported as not found.
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
) -> Result<Json<CaseResponse>, ApiError>
where
  S: CaseStore,
{
  let not_found = || ApiError::NotFound(format!("Case with number {id} not found"));
  let case_number: i64 = id.trim().parse().map_err(|_| not_found())?;

  let detail = store
    .get_case(case_number)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(not_found)?;

  Ok(Json(CaseResponse {
    status: Success::Success,
    case:   detail.case,
    notes:  detail.notes,
    logs:   detail.logs,
  }))
}

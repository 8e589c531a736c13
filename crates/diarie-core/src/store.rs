//! The `CaseStore` and `AccountStore` traits.
//!
//! The traits are implemented by storage backends (e.g. `diarie-store-sqlite`).
//! Higher layers (`diarie-api`, `diarie-web`, `diarie-import`) depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  Error,
  account::User,
  case::{Actor, CaseDetail, CaseFields, CaseSummary, NewNote},
  dimension::{Dossier, Handler, Registry, Unit},
  import::{ImportMode, ImportOutcome, ImportRecord},
};

// ─── Errors ──────────────────────────────────────────────────────────────────

/// A backend error that may carry a domain [`Error`].
///
/// Lets callers generic over a store tell input problems (validation, missing
/// case) apart from storage faults without knowing the backend.
pub trait DomainError {
  fn as_domain(&self) -> Option<&Error>;
}

// ─── Cases ───────────────────────────────────────────────────────────────────

/// Abstraction over a case register backend.
///
/// Every mutating method writes its audit-log entry in the same transaction
/// as the change itself: either both persist or neither does.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait CaseStore: Send + Sync {
  type Error: std::error::Error + DomainError + Send + Sync + 'static;

  /// All cases with denormalised dimension names, newest registration first.
  fn list_cases(
    &self,
  ) -> impl Future<Output = Result<Vec<CaseSummary>, Self::Error>> + Send + '_;

  /// A case with its notes and log entries. Returns `None` if not found.
  fn get_case(
    &self,
    case_number: i64,
  ) -> impl Future<Output = Result<Option<CaseDetail>, Self::Error>> + Send + '_;

  /// Insert a new case with a store-assigned number and log its creation.
  fn create_case(
    &self,
    fields: CaseFields,
    actor: Actor,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  /// Overwrite every mutable field of an existing case and log the update.
  ///
  /// Fails with a not-found error if the case does not exist. Concurrent
  /// updates are last-write-wins.
  fn update_case(
    &self,
    case_number: i64,
    fields: CaseFields,
    actor: Actor,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Append a note with the next free line number and log it.
  ///
  /// Returns the assigned line number.
  fn add_note(
    &self,
    case_number: i64,
    note: NewNote,
    actor: Actor,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  // ── Dimensions ────────────────────────────────────────────────────────

  fn list_registries(
    &self,
  ) -> impl Future<Output = Result<Vec<Registry>, Self::Error>> + Send + '_;

  fn list_handlers(
    &self,
  ) -> impl Future<Output = Result<Vec<Handler>, Self::Error>> + Send + '_;

  fn list_units(&self) -> impl Future<Output = Result<Vec<Unit>, Self::Error>> + Send + '_;

  fn list_dossiers(
    &self,
  ) -> impl Future<Output = Result<Vec<Dossier>, Self::Error>> + Send + '_;

  // ── Import ────────────────────────────────────────────────────────────

  /// Reconcile and persist one external record as a single transaction.
  ///
  /// A record whose case number already exists is skipped untouched. In
  /// [`ImportMode::DryRun`] the transaction is always rolled back.
  fn import_record(
    &self,
    record: ImportRecord,
    mode: ImportMode,
  ) -> impl Future<Output = Result<ImportOutcome, Self::Error>> + Send + '_;

  /// Import several records in order, with one result per record.
  ///
  /// In [`ImportMode::Commit`] each record is its own transaction, exactly as
  /// [`import_record`](Self::import_record). In [`ImportMode::DryRun`] the
  /// whole batch shares one transaction that is rolled back at the end, so a
  /// later record sees what earlier ones would have created and the reported
  /// outcomes match what a commit of the same batch would do.
  ///
  /// The outer error is a failure of the batch itself (e.g. the connection).
  fn import_batch(
    &self,
    records: Vec<ImportRecord>,
    mode: ImportMode,
  ) -> impl Future<Output = Result<Vec<Result<ImportOutcome, Self::Error>>, Self::Error>> + Send + '_;
}

// ─── Accounts ────────────────────────────────────────────────────────────────

/// Login accounts and the sessions issued to them.
pub trait AccountStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn user_count(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Create the very first account.
  ///
  /// Returns `None` without writing anything if any account already exists.
  fn create_first_user(
    &self,
    username: String,
    password_hash: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn find_user(
    &self,
    username: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Persist a session keyed by the hash of its cookie token.
  fn create_session(
    &self,
    token_hash: String,
    user_id: i64,
    expires_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// The user owning an unexpired session, if any.
  fn session_user(
    &self,
    token_hash: String,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn delete_session(
    &self,
    token_hash: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

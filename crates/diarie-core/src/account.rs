//! Login accounts.

/// A user allowed to log in to the case register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
  pub id:            i64,
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

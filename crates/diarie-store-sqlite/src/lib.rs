//! SQLite backend for the Diarie case register.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every store operation is a single call
//! on that thread and owns its transaction for the duration of the call.

mod accounts;
mod dimensions;
mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;

//! SQLite backend for the fraudesk ticket desk.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every rule-checked write runs inside a
//! single `BEGIN IMMEDIATE` transaction.

mod encode;
mod schema;
mod sql;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;

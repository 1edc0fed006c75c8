//! Error type for `fraudesk-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("decode error: {0}")]
  Decode(#[from] fraudesk_core::UnknownVariant),

  #[error("date parse error: {0}")]
  DateParse(String),

  #[error("manager {0} does not exist")]
  ManagerMissing(i64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

//! Error type for `timemark-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("slot key must not be empty")]
  EmptyKey,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

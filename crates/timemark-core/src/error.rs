//! Error types for `timemark-core`.

use thiserror::Error;

use crate::codec::DecodeError;

#[derive(Debug, Error)]
pub enum Error {
  /// The persisted slot has never been written.
  #[error("no persisted data under key {key:?}")]
  Absent { key: String },

  #[error("persisted data is corrupt: {0}")]
  Corrupt(#[from] DecodeError),

  #[error("timeline invariant violated: {0}")]
  InvariantViolation(String),

  #[error("clock unavailable: {0}")]
  ClockUnavailable(String),

  #[error("span {0} not found in the current timeline")]
  SpanNotFound(usize),

  #[error("point {0} not found in the current timeline")]
  PointNotFound(usize),

  #[error("timeline {0} not found in history")]
  TimelineNotFound(usize),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("slot error: {0}")]
  Slot(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Whether this error came from unreadable persisted data. Callers use it
  /// to decide whether to offer a reset.
  pub fn is_corrupt(&self) -> bool { matches!(self, Self::Corrupt(_)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

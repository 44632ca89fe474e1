//! Time points: the instants recorded by each mark.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::{Result, clock::Clock};

// ─── Granularity ─────────────────────────────────────────────────────────────

/// The unit used to compare points and measure spans.
///
/// A deployment picks one and applies it to every span it displays; minutes
/// is the canonical unit.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
  #[default]
  Minutes,
  Seconds,
}

impl Granularity {
  /// Short unit label used when rendering deltas.
  pub fn unit(self) -> &'static str {
    match self {
      Self::Minutes => "mins",
      Self::Seconds => "secs",
    }
  }
}

impl FromStr for Granularity {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "minutes" | "mins" | "m" => Ok(Self::Minutes),
      "seconds" | "secs" | "s" => Ok(Self::Seconds),
      other => Err(format!("unknown granularity {other:?} (expected minutes or seconds)")),
    }
  }
}

// ─── Boundary flags ──────────────────────────────────────────────────────────

/// Semantic markers for the edges of a tracked day. Not mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoundaryFlags {
  pub wakeup: bool,
  pub sleep:  bool,
}

impl BoundaryFlags {
  pub const NONE: Self = Self { wakeup: false, sleep: false };
  pub const WAKEUP: Self = Self { wakeup: true, sleep: false };
  pub const SLEEP: Self = Self { wakeup: false, sleep: true };

  pub fn is_empty(self) -> bool { !self.wakeup && !self.sleep }
}

// ─── TimePoint ───────────────────────────────────────────────────────────────

/// An instant recorded by a mark. The timestamp never changes once created;
/// only the boundary flags may be adjusted afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimePoint {
  timestamp: DateTime<Utc>,
  pub flags: BoundaryFlags,
}

impl TimePoint {
  /// A point at an injected or deserialized reading.
  pub fn new(timestamp: DateTime<Utc>) -> Self {
    Self { timestamp, flags: BoundaryFlags::NONE }
  }

  pub fn with_flags(timestamp: DateTime<Utc>, flags: BoundaryFlags) -> Self {
    Self { timestamp, flags }
  }

  /// A point at the clock's current reading.
  pub fn now(clock: &impl Clock) -> Result<Self> {
    Ok(Self::new(clock.now()?))
  }

  pub fn timestamp(&self) -> DateTime<Utc> { self.timestamp }

  pub fn hour(&self) -> u32 { self.timestamp.hour() }

  pub fn minute(&self) -> u32 { self.timestamp.minute() }

  /// Whole minutes since the Unix epoch, truncated toward zero.
  pub fn epoch_minutes(&self) -> i64 {
    self.timestamp.timestamp_millis() / (1000 * 60)
  }

  /// Whole seconds since the Unix epoch, truncated toward zero.
  pub fn epoch_seconds(&self) -> i64 { self.timestamp.timestamp_millis() / 1000 }

  /// The machine-comparable value of this point in the given unit.
  pub fn comparable(&self, granularity: Granularity) -> i64 {
    match granularity {
      Granularity::Minutes => self.epoch_minutes(),
      Granularity::Seconds => self.epoch_seconds(),
    }
  }

  pub fn is_wakeup(&self) -> bool { self.flags.wakeup }

  pub fn is_sleep(&self) -> bool { self.flags.sleep }
}

/// `HH:MM`, zero-padded.
impl fmt::Display for TimePoint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:02}:{:02}", self.hour(), self.minute())
  }
}

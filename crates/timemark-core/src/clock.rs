//! Time sources.
//!
//! Marks never read the system time directly; they go through a [`Clock`] so
//! tests can drive time by hand and so an unreliable reading fails the mark
//! instead of recording garbage.

use std::{
  sync::Mutex,
  time::{SystemTime, UNIX_EPOCH},
};

use chrono::{DateTime, Duration, Utc};

use crate::{Error, Result};

/// A source of "now".
pub trait Clock {
  fn now(&self) -> Result<DateTime<Utc>>;
}

impl<C: Clock + ?Sized> Clock for &C {
  fn now(&self) -> Result<DateTime<Utc>> { (**self).now() }
}

// ─── System clock ────────────────────────────────────────────────────────────

/// Wall-clock time from the operating system.
///
/// A reading before the Unix epoch is treated as unavailable: it only happens
/// when the host clock is unset or badly skewed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> Result<DateTime<Utc>> {
    let since_epoch = SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .map_err(|e| Error::ClockUnavailable(e.to_string()))?;
    let millis = i64::try_from(since_epoch.as_millis())
      .map_err(|e| Error::ClockUnavailable(e.to_string()))?;
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
      Error::ClockUnavailable(format!("reading out of range: {millis} ms"))
    })
  }
}

// ─── Manual clock ────────────────────────────────────────────────────────────

/// A clock that only moves when told to. Useful for tests and replays.
#[derive(Debug)]
pub struct ManualClock {
  now: Mutex<Option<DateTime<Utc>>>,
}

impl ManualClock {
  pub fn new(start: DateTime<Utc>) -> Self {
    Self { now: Mutex::new(Some(start)) }
  }

  /// A clock with no reading; every [`Clock::now`] call fails.
  pub fn stopped() -> Self { Self { now: Mutex::new(None) } }

  pub fn set(&self, at: DateTime<Utc>) {
    *self.now.lock().unwrap_or_else(|e| e.into_inner()) = Some(at);
  }

  pub fn advance(&self, by: Duration) {
    let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(t) = now.as_mut() {
      *t += by;
    }
  }
}

impl Clock for ManualClock {
  fn now(&self) -> Result<DateTime<Utc>> {
    let now = *self.now.lock().unwrap_or_else(|e| e.into_inner());
    now.ok_or_else(|| Error::ClockUnavailable("manual clock is stopped".into()))
  }
}

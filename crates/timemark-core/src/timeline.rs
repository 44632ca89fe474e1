//! Timelines: the alternating point/span sequence grown by marks.
//!
//! A timeline is either empty or has the shape `P, (S, P)*`: it starts and
//! ends with a point, and every span sits between the two points it was built
//! from. [`Timeline::add_mark`] is the only operation that grows it; nothing
//! ever removes an entry.

use chrono::{DateTime, Utc};

use crate::{
  Error, Result,
  clock::Clock,
  point::{BoundaryFlags, TimePoint},
  span::TimeSpan,
};

// ─── Mark ────────────────────────────────────────────────────────────────────

/// One entry of a timeline's sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mark {
  Point(TimePoint),
  Span(TimeSpan),
}

impl Mark {
  pub fn as_point(&self) -> Option<&TimePoint> {
    match self {
      Self::Point(p) => Some(p),
      Self::Span(_) => None,
    }
  }

  pub fn as_span(&self) -> Option<&TimeSpan> {
    match self {
      Self::Span(s) => Some(s),
      Self::Point(_) => None,
    }
  }
}

// ─── Timeline ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
  sequence:   Vec<Mark>,
  created_at: DateTime<Utc>,
}

impl Timeline {
  pub fn new(created_at: DateTime<Utc>) -> Self {
    Self { sequence: Vec::new(), created_at }
  }

  /// Rebuild a timeline from decoded parts, checking the sequence shape.
  pub fn from_parts(sequence: Vec<Mark>, created_at: DateTime<Utc>) -> Result<Self> {
    let timeline = Self { sequence, created_at };
    timeline.check_invariants()?;
    Ok(timeline)
  }

  pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

  /// Creation date as `DD-MM-YYYY`.
  pub fn date_label(&self) -> String { self.created_at.format("%d-%m-%Y").to_string() }

  pub fn sequence(&self) -> &[Mark] { &self.sequence }

  pub fn is_empty(&self) -> bool { self.sequence.is_empty() }

  pub fn len(&self) -> usize { self.sequence.len() }

  /// Number of marks recorded, i.e. the number of points.
  pub fn mark_count(&self) -> usize { self.sequence.len().div_ceil(2) }

  pub fn first_point(&self) -> Option<&TimePoint> {
    self.sequence.first().and_then(Mark::as_point)
  }

  pub fn last_point(&self) -> Option<&TimePoint> {
    self.sequence.last().and_then(Mark::as_point)
  }

  pub fn points(&self) -> impl Iterator<Item = &TimePoint> {
    self.sequence.iter().filter_map(Mark::as_point)
  }

  pub fn spans(&self) -> impl Iterator<Item = &TimeSpan> {
    self.sequence.iter().filter_map(Mark::as_span)
  }

  /// The `n`-th span (zero-based).
  pub fn span(&self, n: usize) -> Option<&TimeSpan> { self.spans().nth(n) }

  pub fn span_mut(&mut self, n: usize) -> Option<&mut TimeSpan> {
    let idx = n.checked_mul(2)?.checked_add(1)?;
    self.sequence.get_mut(idx).and_then(|m| match m {
      Mark::Span(s) => Some(s),
      Mark::Point(_) => None,
    })
  }

  // ── Mutation ─────────────────────────────────────────────────────────────

  /// Record a mark at the clock's current reading.
  ///
  /// Returns the entries appended by this call in creation order: the new
  /// point alone on the first mark, otherwise `[span, point]`.
  pub fn add_mark(&mut self, clock: &impl Clock, flags: BoundaryFlags) -> Result<&[Mark]> {
    let now = clock.now()?;
    Ok(self.add_mark_at(now, flags))
  }

  /// Record a mark at an injected reading.
  pub fn add_mark_at(&mut self, timestamp: DateTime<Utc>, flags: BoundaryFlags) -> &[Mark] {
    let point = TimePoint::with_flags(timestamp, flags);
    let first_new = self.sequence.len();

    if let Some(previous) = self.last_point().copied() {
      let span = TimeSpan::new(previous, point);
      if span.is_negative() {
        tracing::warn!(
          start = %previous.timestamp(),
          end = %point.timestamp(),
          "mark precedes the previous one; span delta is negative"
        );
      }
      self.sequence.push(Mark::Span(span));
    }
    self.sequence.push(Mark::Point(point));

    debug_assert!(self.check_invariants().is_ok());
    &self.sequence[first_new..]
  }

  /// Append a tag to the `n`-th span (zero-based).
  pub fn tag_span(&mut self, n: usize, tag: impl Into<String>) -> Result<&TimeSpan> {
    let span = self.span_mut(n).ok_or(Error::SpanNotFound(n))?;
    span.add_tag(tag);
    let span: &TimeSpan = span;
    Ok(span)
  }

  /// Replace the boundary flags of the `n`-th point (zero-based), keeping the
  /// endpoint copies held by its neighbouring spans in step.
  pub fn set_point_flags(&mut self, n: usize, flags: BoundaryFlags) -> Result<&TimePoint> {
    let idx = n.checked_mul(2).ok_or(Error::PointNotFound(n))?;
    match self.sequence.get_mut(idx) {
      Some(Mark::Point(p)) => p.flags = flags,
      _ => return Err(Error::PointNotFound(n)),
    }
    if let Some(Mark::Span(before)) = idx.checked_sub(1).and_then(|i| self.sequence.get_mut(i)) {
      before.end.flags = flags;
    }
    let after = idx.checked_add(1).and_then(|i| self.sequence.get_mut(i));
    if let Some(Mark::Span(after)) = after {
      after.start.flags = flags;
    }

    debug_assert!(self.check_invariants().is_ok());
    match &self.sequence[idx] {
      Mark::Point(p) => Ok(p),
      Mark::Span(_) => Err(Error::PointNotFound(n)),
    }
  }

  // ── Invariants ───────────────────────────────────────────────────────────

  /// Verify the `P, (S, P)*` shape and that every span's endpoints equal
  /// its neighbouring points.
  pub fn check_invariants(&self) -> Result<()> {
    let seq = &self.sequence;
    if !seq.is_empty() && seq.len() % 2 == 0 {
      return Err(Error::InvariantViolation(format!(
        "sequence has even length {}",
        seq.len()
      )));
    }

    for (i, mark) in seq.iter().enumerate() {
      match (i % 2, mark) {
        (0, Mark::Point(_)) => {}
        (1, Mark::Span(span)) => {
          let before = seq[i - 1].as_point();
          let after = seq.get(i + 1).and_then(Mark::as_point);
          if before != Some(&span.start) {
            return Err(Error::InvariantViolation(format!(
              "span at {i} does not start at the preceding point"
            )));
          }
          if after != Some(&span.end) {
            return Err(Error::InvariantViolation(format!(
              "span at {i} does not end at the following point"
            )));
          }
        }
        (0, Mark::Span(_)) => {
          return Err(Error::InvariantViolation(format!(
            "expected a point at {i}, found a span"
          )));
        }
        _ => {
          return Err(Error::InvariantViolation(format!(
            "expected a span at {i}, found a point"
          )));
        }
      }
    }
    Ok(())
  }
}

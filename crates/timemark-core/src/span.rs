//! Time spans: the elapsed time between two consecutive marks.

use std::fmt;

use crate::point::{Granularity, TimePoint};

/// The interval between two points, annotated with free-text tags.
///
/// Spans hold copies of their endpoints rather than references into the
/// owning timeline, so a span can be serialized on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSpan {
  pub(crate) start: TimePoint,
  pub(crate) end:   TimePoint,
  tags:             Vec<String>,
}

impl TimeSpan {
  /// Ordering is not validated; a span whose end precedes its start is kept
  /// as-is and reports a negative delta.
  pub fn new(start: TimePoint, end: TimePoint) -> Self {
    Self::with_tags(start, end, Vec::new())
  }

  pub fn with_tags(start: TimePoint, end: TimePoint, tags: Vec<String>) -> Self {
    Self { start, end, tags }
  }

  pub fn start(&self) -> &TimePoint { &self.start }

  pub fn end(&self) -> &TimePoint { &self.end }

  pub fn tags(&self) -> &[String] { &self.tags }

  /// Append a tag. Duplicates and empty strings are kept.
  pub fn add_tag(&mut self, tag: impl Into<String>) { self.tags.push(tag.into()); }

  /// Elapsed time in whole minutes.
  pub fn delta(&self) -> i64 { self.delta_in(Granularity::Minutes) }

  pub fn delta_in(&self, granularity: Granularity) -> i64 {
    self.end.comparable(granularity) - self.start.comparable(granularity)
  }

  /// True when the end point precedes the start point (clock skew or a
  /// hand-edited document).
  pub fn is_negative(&self) -> bool { self.end.timestamp() < self.start.timestamp() }
}

/// `"<delta> mins"`.
impl fmt::Display for TimeSpan {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.delta(), Granularity::Minutes.unit())
  }
}

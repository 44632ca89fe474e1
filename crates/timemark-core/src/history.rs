//! History: every timeline ever started, plus the one receiving marks.

use chrono::{DateTime, Utc};

use crate::{Error, Result, timeline::Timeline};

/// An ordered, never-empty collection of timelines.
///
/// `current` always indexes an existing timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
  timelines: Vec<Timeline>,
  current:   usize,
}

impl History {
  /// A history holding a single empty timeline.
  pub fn new(created_at: DateTime<Utc>) -> Self {
    Self { timelines: vec![Timeline::new(created_at)], current: 0 }
  }

  /// Rebuild from decoded timelines; the last one becomes current.
  /// Returns `None` when `timelines` is empty.
  pub fn from_timelines(timelines: Vec<Timeline>) -> Option<Self> {
    let current = timelines.len().checked_sub(1)?;
    Some(Self { timelines, current })
  }

  pub fn timelines(&self) -> &[Timeline] { &self.timelines }

  pub fn len(&self) -> usize { self.timelines.len() }

  pub fn is_empty(&self) -> bool { self.timelines.is_empty() }

  pub fn current_index(&self) -> usize { self.current }

  pub fn current(&self) -> &Timeline { &self.timelines[self.current] }

  pub fn current_mut(&mut self) -> &mut Timeline { &mut self.timelines[self.current] }

  /// Append an empty timeline and make it current.
  pub fn new_timeline(&mut self, created_at: DateTime<Utc>) -> &mut Timeline {
    self.timelines.push(Timeline::new(created_at));
    self.current = self.timelines.len() - 1;
    &mut self.timelines[self.current]
  }

  /// Drop every timeline and start over with one empty timeline.
  pub fn clear(&mut self, created_at: DateTime<Utc>) { *self = Self::new(created_at); }

  /// Make the timeline at `index` (zero-based) current.
  pub fn select(&mut self, index: usize) -> Result<&mut Timeline> {
    if index >= self.timelines.len() {
      return Err(Error::TimelineNotFound(index));
    }
    self.current = index;
    Ok(&mut self.timelines[index])
  }
}

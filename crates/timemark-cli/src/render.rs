//! Plain-text rendering of timelines.

use std::fmt::Display;

use chrono::TimeZone;
use timemark_core::{
  history::History,
  point::{Granularity, TimePoint},
  span::TimeSpan,
  timeline::{Mark, Timeline},
};

/// `HH:MM` in `tz`, followed by any boundary markers.
pub fn point_line<Tz: TimeZone>(point: &TimePoint, tz: &Tz) -> String
where
  Tz::Offset: Display,
{
  let mut line = point.timestamp().with_timezone(tz).format("%H:%M").to_string();
  if point.is_wakeup() {
    line.push_str("  (wakeup)");
  }
  if point.is_sleep() {
    line.push_str("  (sleep)");
  }
  line
}

/// `#n  <delta> <unit>  tag, tag`. `n` is the 1-based span number.
pub fn span_line(number: usize, span: &TimeSpan, granularity: Granularity) -> String {
  let mut line = format!("#{number}  {} {}", span.delta_in(granularity), granularity.unit());
  if span.is_negative() {
    line.push_str("  (!)");
  }
  if !span.tags().is_empty() {
    line.push_str("  ");
    line.push_str(&span.tags().join(", "));
  }
  line
}

/// Lines for a batch of marks. Spans in `marks` are numbered starting at
/// `first_span`.
pub fn mark_lines<Tz: TimeZone>(
  marks: &[Mark],
  first_span: usize,
  granularity: Granularity,
  tz: &Tz,
) -> Vec<String>
where
  Tz::Offset: Display,
{
  let mut next_span = first_span;
  marks
    .iter()
    .map(|mark| match mark {
      Mark::Point(p) => point_line(p, tz),
      Mark::Span(s) => {
        let line = format!("  │ {}", span_line(next_span, s, granularity));
        next_span += 1;
        line
      }
    })
    .collect()
}

/// A header followed by every point and span of `timeline`.
pub fn timeline<Tz: TimeZone>(timeline: &Timeline, granularity: Granularity, tz: &Tz) -> String
where
  Tz::Offset: Display,
{
  let mut out = format!(
    "Timeline {} ({} marks)\n",
    timeline.date_label(),
    timeline.mark_count()
  );
  if timeline.is_empty() {
    out.push_str("  no marks yet\n");
    return out;
  }
  for line in mark_lines(timeline.sequence(), 1, granularity, tz) {
    out.push_str(&line);
    out.push('\n');
  }
  out
}

/// One line per timeline; the current one is starred.
pub fn history(history: &History) -> String {
  let mut out = String::new();
  for (i, tl) in history.timelines().iter().enumerate() {
    let marker = if i == history.current_index() { '*' } else { ' ' };
    out.push_str(&format!(
      "{marker} {:>3}  {}  {} marks\n",
      i + 1,
      tl.date_label(),
      tl.mark_count()
    ));
  }
  out
}

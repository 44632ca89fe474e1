//! The `$type`-tagged JSON document format.
//!
//! Every object carries a `$type` discriminant (`TimePoint`, `TimeSpan` or
//! `Timeline`). Encoding goes through a serde-tagged wire enum. Decoding walks
//! the untyped JSON tree, dispatching on the tag at each level and rebuilding
//! the nested structure; unknown tags and misplaced types are rejected.
//!
//! Timestamps are written as RFC 3339 in UTC with as many fractional digits as
//! needed to be exact. On read, two older forms are also accepted: the
//! JavaScript `Date.prototype.toString()` rendering for points, and
//! `DD-MM-YYYY` / `DD/MM/YYYY` for timeline creation dates.

use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
  history::History,
  point::{BoundaryFlags, TimePoint},
  span::TimeSpan,
  timeline::{Mark, Timeline},
};

const TYPE_KEY: &str = "$type";

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Why a persisted document could not be turned back into a history.
#[derive(Debug, Error)]
pub enum DecodeError {
  #[error("invalid json: {0}")]
  Json(#[from] serde_json::Error),

  #[error("unknown $type {0:?}")]
  UnknownType(String),

  #[error("expected {expected}, found {found}")]
  UnexpectedType {
    expected: &'static str,
    found:    String,
  },

  #[error("{ty} is missing field {field:?}")]
  MissingField {
    ty:    &'static str,
    field: &'static str,
  },

  #[error("invalid date {0:?}")]
  InvalidDate(String),

  #[error("broken timeline sequence: {0}")]
  BrokenSequence(String),

  #[error("history contains no timelines")]
  EmptyHistory,
}

// ─── Wire form ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(tag = "$type")]
enum Node<'a> {
  TimePoint {
    date:        String,
    #[serde(rename = "wakeupTime", skip_serializing_if = "is_false")]
    wakeup_time: bool,
    #[serde(rename = "sleepTime", skip_serializing_if = "is_false")]
    sleep_time:  bool,
  },
  TimeSpan {
    #[serde(rename = "startPoint")]
    start_point: Box<Node<'a>>,
    #[serde(rename = "endPoint")]
    end_point:   Box<Node<'a>>,
    tags:        &'a [String],
  },
  Timeline {
    #[serde(rename = "markArr")]
    mark_arr: Vec<Node<'a>>,
    date:     String,
  },
}

fn is_false(b: &bool) -> bool { !*b }

impl<'a> Node<'a> {
  fn point(p: &TimePoint) -> Self {
    Node::TimePoint {
      date:        encode_instant(p.timestamp()),
      wakeup_time: p.flags.wakeup,
      sleep_time:  p.flags.sleep,
    }
  }

  fn span(s: &'a TimeSpan) -> Self {
    Node::TimeSpan {
      start_point: Box::new(Self::point(s.start())),
      end_point:   Box::new(Self::point(s.end())),
      tags:        s.tags(),
    }
  }

  fn timeline(t: &'a Timeline) -> Self {
    Node::Timeline {
      mark_arr: t
        .sequence()
        .iter()
        .map(|m| match m {
          Mark::Point(p) => Self::point(p),
          Mark::Span(s) => Self::span(s),
        })
        .collect(),
      date:     encode_instant(t.created_at()),
    }
  }
}

// ─── Encoding ────────────────────────────────────────────────────────────────

pub fn encode_instant(at: DateTime<Utc>) -> String {
  at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Compact JSON array of every timeline in the history.
pub fn encode_history(history: &History) -> serde_json::Result<String> {
  let nodes: Vec<_> = history.timelines().iter().map(Node::timeline).collect();
  serde_json::to_string(&nodes)
}

/// Same document as [`encode_history`], indented for humans.
pub fn encode_history_pretty(history: &History) -> serde_json::Result<String> {
  let nodes: Vec<_> = history.timelines().iter().map(Node::timeline).collect();
  serde_json::to_string_pretty(&nodes)
}

/// A single `Timeline` object.
pub fn encode_timeline(timeline: &Timeline) -> serde_json::Result<String> {
  serde_json::to_string(&Node::timeline(timeline))
}

// ─── Decoding ────────────────────────────────────────────────────────────────

/// Decode a persisted history.
///
/// The canonical document is an array of `Timeline` objects. A lone
/// `Timeline` object is accepted as a one-element history.
pub fn decode_history(text: &str) -> Result<History, DecodeError> {
  let root: Value = serde_json::from_str(text)?;
  let timelines = match &root {
    Value::Array(items) => items.iter().map(timeline_from).collect::<Result<Vec<_>, _>>()?,
    Value::Object(_) => vec![timeline_from(&root)?],
    other => {
      return Err(DecodeError::UnexpectedType {
        expected: "array of Timeline",
        found:    describe(other),
      });
    }
  };
  History::from_timelines(timelines).ok_or(DecodeError::EmptyHistory)
}

/// Decode a single `Timeline` object.
pub fn decode_timeline(text: &str) -> Result<Timeline, DecodeError> {
  let root: Value = serde_json::from_str(text)?;
  timeline_from(&root)
}

fn timeline_from(value: &Value) -> Result<Timeline, DecodeError> {
  let obj = tagged(value, "Timeline")?;
  let marks_value = field(obj, "Timeline", "markArr")?;
  let marks = marks_value
    .as_array()
    .ok_or_else(|| DecodeError::UnexpectedType {
      expected: "markArr array",
      found:    describe(marks_value),
    })?;
  let created_at = decode_creation_date(str_field(obj, "Timeline", "date")?)?;

  let sequence = marks.iter().map(mark_from).collect::<Result<Vec<_>, _>>()?;
  Timeline::from_parts(sequence, created_at)
    .map_err(|e| DecodeError::BrokenSequence(e.to_string()))
}

fn mark_from(value: &Value) -> Result<Mark, DecodeError> {
  match type_tag(value)? {
    "TimePoint" => Ok(Mark::Point(point_from(value)?)),
    "TimeSpan" => Ok(Mark::Span(span_from(value)?)),
    "Timeline" => Err(DecodeError::UnexpectedType {
      expected: "TimePoint or TimeSpan",
      found:    "Timeline".into(),
    }),
    other => Err(DecodeError::UnknownType(other.into())),
  }
}

fn span_from(value: &Value) -> Result<TimeSpan, DecodeError> {
  let obj = tagged(value, "TimeSpan")?;
  let start = point_from(field(obj, "TimeSpan", "startPoint")?)?;
  let end = point_from(field(obj, "TimeSpan", "endPoint")?)?;

  let tags = match obj.get("tags") {
    None | Some(Value::Null) => Vec::new(),
    Some(Value::Array(items)) => items
      .iter()
      .map(|t| {
        t.as_str()
          .map(str::to_owned)
          .ok_or_else(|| DecodeError::UnexpectedType {
            expected: "string tag",
            found:    describe(t),
          })
      })
      .collect::<Result<_, _>>()?,
    Some(other) => {
      return Err(DecodeError::UnexpectedType {
        expected: "tags array",
        found:    describe(other),
      });
    }
  };

  Ok(TimeSpan::with_tags(start, end, tags))
}

fn point_from(value: &Value) -> Result<TimePoint, DecodeError> {
  let obj = tagged(value, "TimePoint")?;
  let timestamp = decode_instant(str_field(obj, "TimePoint", "date")?)?;
  let flags = BoundaryFlags {
    wakeup: flag(obj, "wakeupTime")?,
    sleep:  flag(obj, "sleepTime")?,
  };
  Ok(TimePoint::with_flags(timestamp, flags))
}

// ── Tree helpers ─────────────────────────────────────────────────────────────

fn tagged_object(value: &Value) -> Result<(&Map<String, Value>, &str), DecodeError> {
  let tag = value
    .as_object()
    .and_then(|obj| Some((obj, obj.get(TYPE_KEY)?.as_str()?)));
  tag.ok_or_else(|| DecodeError::UnexpectedType {
    expected: "object with a $type string",
    found:    describe(value),
  })
}

fn type_tag(value: &Value) -> Result<&str, DecodeError> {
  tagged_object(value).map(|(_, tag)| tag)
}

/// The object behind `value`, provided its `$type` is `expected`.
fn tagged<'v>(
  value: &'v Value,
  expected: &'static str,
) -> Result<&'v Map<String, Value>, DecodeError> {
  match tagged_object(value)? {
    (obj, tag) if tag == expected => Ok(obj),
    (_, "TimePoint" | "TimeSpan" | "Timeline") => Err(DecodeError::UnexpectedType {
      expected,
      found: describe(value),
    }),
    (_, unknown) => Err(DecodeError::UnknownType(unknown.into())),
  }
}

fn field<'v>(
  obj: &'v Map<String, Value>,
  ty: &'static str,
  name: &'static str,
) -> Result<&'v Value, DecodeError> {
  obj.get(name).ok_or(DecodeError::MissingField { ty, field: name })
}

fn str_field<'v>(
  obj: &'v Map<String, Value>,
  ty: &'static str,
  name: &'static str,
) -> Result<&'v str, DecodeError> {
  let value = field(obj, ty, name)?;
  value.as_str().ok_or_else(|| DecodeError::UnexpectedType {
    expected: "string",
    found:    describe(value),
  })
}

/// Optional boolean flag; absent means `false`.
fn flag(obj: &Map<String, Value>, name: &'static str) -> Result<bool, DecodeError> {
  match obj.get(name) {
    None | Some(Value::Null) => Ok(false),
    Some(Value::Bool(b)) => Ok(*b),
    Some(other) => Err(DecodeError::UnexpectedType {
      expected: "boolean flag",
      found:    describe(other),
    }),
  }
}

fn describe(value: &Value) -> String {
  match value {
    Value::Null => "null".into(),
    Value::Bool(_) => "boolean".into(),
    Value::Number(_) => "number".into(),
    Value::String(_) => "string".into(),
    Value::Array(_) => "array".into(),
    Value::Object(obj) => match obj.get(TYPE_KEY).and_then(Value::as_str) {
      Some(tag) => tag.to_owned(),
      None => "untagged object".into(),
    },
  }
}

// ── Dates ────────────────────────────────────────────────────────────────────

/// RFC 3339, or the `Date.prototype.toString()` form
/// (`Sun Oct 19 2025 10:00:00 GMT+0200 (Central European Summer Time)`).
pub fn decode_instant(s: &str) -> Result<DateTime<Utc>, DecodeError> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Ok(dt.with_timezone(&Utc));
  }
  // Years outside 0000..=9999 are written with a sign (`+10000-01-01T..`),
  // which strict RFC 3339 parsing rejects.
  if let Ok(dt) = s.parse::<DateTime<FixedOffset>>() {
    return Ok(dt.with_timezone(&Utc));
  }
  let without_zone_name = s.split(" (").next().unwrap_or(s);
  DateTime::parse_from_str(without_zone_name, "%a %b %d %Y %H:%M:%S GMT%z")
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|_| DecodeError::InvalidDate(s.to_owned()))
}

/// An instant, or a bare `DD-MM-YYYY` / `DD/MM/YYYY` date read as midnight UTC.
fn decode_creation_date(s: &str) -> Result<DateTime<Utc>, DecodeError> {
  if let Ok(at) = decode_instant(s) {
    return Ok(at);
  }
  ["%d-%m-%Y", "%d/%m/%Y"]
    .iter()
    .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .map(|naive| naive.and_utc())
    .ok_or_else(|| DecodeError::InvalidDate(s.to_owned()))
}

#[cfg(test)]
mod tests {
  use chrono::Duration;
  use serde_json::json;

  use super::*;

  fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-10-19T06:30:00.125Z")
      .unwrap()
      .with_timezone(&Utc)
  }

  fn timeline_with(marks: i64) -> Timeline {
    let mut tl = Timeline::new(t0());
    for m in 0..marks {
      let flags = if m == 0 { BoundaryFlags::WAKEUP } else { BoundaryFlags::NONE };
      tl.add_mark_at(t0() + Duration::milliseconds(m * 1_234_567), flags);
    }
    for n in 0..(marks - 1).max(0) as usize {
      tl.tag_span(n, format!("tag-{n}")).unwrap();
      tl.tag_span(n, "shared").unwrap();
    }
    tl
  }

  #[test]
  fn timeline_round_trips_for_zero_one_and_many_marks() {
    for marks in [0, 1, 2, 7] {
      let original = timeline_with(marks);
      let text = encode_timeline(&original).unwrap();
      let decoded = decode_timeline(&text).unwrap();
      assert_eq!(decoded, original, "round trip with {marks} marks");
    }
  }

  #[test]
  fn history_round_trips_and_keeps_last_as_current() {
    let mut history = History::new(t0());
    *history.current_mut() = timeline_with(4);
    history.new_timeline(t0() + Duration::days(1));
    history.current_mut().add_mark_at(t0() + Duration::days(1), BoundaryFlags::SLEEP);

    let decoded = decode_history(&encode_history(&history).unwrap()).unwrap();
    assert_eq!(decoded, history);
    assert_eq!(decoded.current_index(), 1);

    let pretty = decode_history(&encode_history_pretty(&history).unwrap()).unwrap();
    assert_eq!(pretty, history);
  }

  #[test]
  fn wire_shape_matches_the_document_format() {
    let tl = timeline_with(2);
    let value: Value = serde_json::from_str(&encode_timeline(&tl).unwrap()).unwrap();

    assert_eq!(value["$type"], "Timeline");
    assert_eq!(value["date"], "2025-10-19T06:30:00.125Z");
    let marks = value["markArr"].as_array().unwrap();
    assert_eq!(marks.len(), 3);
    assert_eq!(marks[0]["$type"], "TimePoint");
    assert_eq!(marks[0]["wakeupTime"], true);
    assert!(marks[0].get("sleepTime").is_none());
    assert_eq!(marks[1]["$type"], "TimeSpan");
    assert_eq!(marks[1]["startPoint"]["$type"], "TimePoint");
    assert_eq!(marks[1]["endPoint"], marks[2]);
    assert_eq!(marks[1]["tags"], json!(["tag-0", "shared"]));
  }

  #[test]
  fn unknown_type_is_rejected() {
    let doc = json!([{ "$type": "Timeline", "date": "2025-10-19T00:00:00Z", "markArr": [
      { "$type": "Nap", "date": "2025-10-19T00:00:00Z" }
    ]}]);
    let err = decode_history(&doc.to_string()).unwrap_err();
    assert!(matches!(err, DecodeError::UnknownType(t) if t == "Nap"));
  }

  #[test]
  fn misplaced_type_is_rejected() {
    let point = json!({ "$type": "TimePoint", "date": "2025-10-19T00:00:00Z" });
    let doc = json!({ "$type": "Timeline", "date": "2025-10-19T00:00:00Z", "markArr": [
      point,
      { "$type": "TimeSpan", "startPoint": point, "endPoint": { "$type": "Timeline", "markArr": [], "date": "x" }, "tags": [] },
      point,
    ]});
    let err = decode_timeline(&doc.to_string()).unwrap_err();
    assert!(matches!(err, DecodeError::UnexpectedType { expected: "TimePoint", .. }));
  }

  #[test]
  fn missing_fields_and_bad_json_are_reported() {
    let err = decode_history(r#"[{"$type":"Timeline","date":"2025-10-19T00:00:00Z"}]"#).unwrap_err();
    assert!(matches!(err, DecodeError::MissingField { ty: "Timeline", field: "markArr" }));

    assert!(matches!(decode_history("[{"), Err(DecodeError::Json(_))));
    assert!(matches!(decode_history("[]"), Err(DecodeError::EmptyHistory)));
    assert!(matches!(decode_history("42"), Err(DecodeError::UnexpectedType { .. })));
  }

  #[test]
  fn broken_alternation_is_corrupt() {
    let point = json!({ "$type": "TimePoint", "date": "2025-10-19T00:00:00Z" });
    let doc = json!({ "$type": "Timeline", "date": "2025-10-19T00:00:00Z", "markArr": [point, point] });
    assert!(matches!(
      decode_timeline(&doc.to_string()),
      Err(DecodeError::BrokenSequence(_))
    ));
  }

  #[test]
  fn legacy_dates_and_extra_fields_are_accepted() {
    let start = json!({ "$type": "TimePoint", "date": "Sun Oct 19 2025 10:00:00 GMT+0200 (Central European Summer Time)" });
    let end = json!({ "$type": "TimePoint", "date": "Sun Oct 19 2025 10:25:00 GMT+0200 (Central European Summer Time)" });
    let doc = json!({
      "$type": "Timeline",
      "date": "19-10-2025",
      "currid": 3,
      "markArr": [start, { "$type": "TimeSpan", "id": 2, "startPoint": start, "endPoint": end, "tags": ["walk"] }, end],
    });

    let history = decode_history(&doc.to_string()).unwrap();
    let tl = history.current();
    assert_eq!(tl.date_label(), "19-10-2025");
    assert_eq!(tl.first_point().unwrap().timestamp().to_rfc3339(), "2025-10-19T08:00:00+00:00");
    assert_eq!(tl.span(0).unwrap().delta(), 25);
    assert_eq!(tl.span(0).unwrap().tags(), ["walk"]);
  }

  #[test]
  fn five_digit_years_round_trip() {
    let far = NaiveDate::from_ymd_opt(10_000, 1, 1)
      .unwrap()
      .and_hms_milli_opt(0, 0, 0, 250)
      .unwrap()
      .and_utc();
    let mut tl = Timeline::new(far);
    tl.add_mark_at(far, BoundaryFlags::NONE);
    tl.add_mark_at(far + Duration::minutes(15), BoundaryFlags::SLEEP);

    let text = encode_timeline(&tl).unwrap();
    assert!(text.contains("\"+10000-01-01T"));
    assert_eq!(decode_timeline(&text).unwrap(), tl);
  }

  #[test]
  fn invalid_dates_are_rejected() {
    let doc = json!({ "$type": "Timeline", "date": "yesterday", "markArr": [] });
    assert!(matches!(
      decode_timeline(&doc.to_string()),
      Err(DecodeError::InvalidDate(d)) if d == "yesterday"
    ));
  }
}

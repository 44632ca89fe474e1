//! Subcommand dispatch over any [`SlotStore`].

use std::{fmt::Display, io::Write, path::PathBuf};

use anyhow::{Context, Result, bail};
use chrono::TimeZone;
use clap::{Args, Subcommand};
use timemark_core::{
  clock::Clock,
  point::BoundaryFlags,
  slot::SlotStore,
  store::TimelineStore,
};

use crate::{config::Settings, render};

// ─── Commands ─────────────────────────────────────────────────────────────────

#[derive(Args, Debug, Clone, Copy, Default)]
pub struct FlagArgs {
  /// Mark the point as the moment the day started.
  #[arg(long)]
  pub wakeup: bool,

  /// Mark the point as the moment the day ended.
  #[arg(long)]
  pub sleep: bool,
}

impl From<FlagArgs> for BoundaryFlags {
  fn from(args: FlagArgs) -> Self { Self { wakeup: args.wakeup, sleep: args.sleep } }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
  /// Record a mark at the current time.
  Mark {
    #[command(flatten)]
    flags: FlagArgs,
  },

  /// Append a tag to a span (numbered from 1).
  Tag { span: usize, text: String },

  /// Replace the boundary flags of a point (numbered from 1).
  Flag {
    point: usize,
    #[command(flatten)]
    flags: FlagArgs,
  },

  /// Print the timeline.
  Show,

  /// List every timeline in the history.
  List,

  /// Start a new empty timeline and make it current.
  New,

  /// Discard every timeline and start over.
  Clear,

  /// Write the full history as indented JSON.
  Export {
    /// Directory to write `timeline-export_<date>.json` into.
    #[arg(long, value_name = "DIR", default_value = ".")]
    out: PathBuf,

    /// Print to stdout instead of writing a file.
    #[arg(long)]
    stdout: bool,
  },

  /// Overwrite the stored history with a fresh one. Recovers from corrupt
  /// data.
  Reset,
}

impl Command {
  fn mutates(&self) -> bool {
    matches!(self, Self::Mark { .. } | Self::Tag { .. } | Self::Flag { .. } | Self::New | Self::Clear)
  }
}

// ─── Dispatch ─────────────────────────────────────────────────────────────────

/// Everything a command needs besides the slot and clock.
pub struct Invocation<'a, Tz> {
  pub settings: &'a Settings,
  /// 1-based timeline to act on; the most recent one when `None`.
  pub timeline: Option<usize>,
  pub tz:       &'a Tz,
}

/// Run `command` against the history stored in `slot`, writing human output
/// to `out`.
pub async fn run<S, C, Tz>(
  slot: S,
  clock: C,
  ctx: Invocation<'_, Tz>,
  command: Command,
  out: &mut impl Write,
) -> Result<()>
where
  S: SlotStore,
  C: Clock,
  Tz: TimeZone,
  Tz::Offset: Display,
{
  let key = ctx.settings.slot_key.as_str();
  let granularity = ctx.settings.granularity;

  if let Command::Reset = command {
    let store = TimelineStore::reset(slot, clock, key).await?;
    tracing::info!(%key, "history reset");
    writeln!(out, "reset history under {:?}", store.key())?;
    return Ok(());
  }

  let mut store = TimelineStore::load(slot, clock, key).await.map_err(|e| {
    if e.is_corrupt() {
      anyhow::Error::new(e).context(format!(
        "history under {key:?} is unreadable; run `timemark reset` to start over"
      ))
    } else {
      anyhow::Error::new(e).context("loading history")
    }
  })?;

  if let Some(n) = ctx.timeline {
    let index = one_based(n, "timeline")?;
    store
      .select(index)
      .with_context(|| format!("selecting timeline {n}"))?;
  }

  let mutates = command.mutates();
  match command {
    Command::Mark { flags } => {
      let added = store.add_mark(flags.into())?.to_vec();
      let first_span = store.current().mark_count().saturating_sub(1).max(1);
      for line in render::mark_lines(&added, first_span, granularity, ctx.tz) {
        writeln!(out, "{line}")?;
      }
    }
    Command::Tag { span, text } => {
      let index = one_based(span, "span")?;
      let tagged = store.current_mut().tag_span(index, text)?;
      writeln!(out, "{}", render::span_line(span, tagged, granularity))?;
    }
    Command::Flag { point, flags } => {
      let index = one_based(point, "point")?;
      let flagged = store.current_mut().set_point_flags(index, flags.into())?;
      writeln!(out, "{}", render::point_line(flagged, ctx.tz))?;
    }
    Command::Show => {
      write!(out, "{}", render::timeline(store.current(), granularity, ctx.tz))?;
    }
    Command::List => {
      write!(out, "{}", render::history(store.history()))?;
    }
    Command::New => {
      let label = store.new_timeline()?.date_label();
      writeln!(out, "started timeline {} ({label})", store.history().len())?;
    }
    Command::Clear => {
      store.clear()?;
      writeln!(out, "cleared history")?;
    }
    Command::Export { out: dir, stdout } => {
      let snapshot = store.export_snapshot()?;
      if stdout {
        writeln!(out, "{snapshot}")?;
      } else {
        let path = dir.join(store.export_file_name());
        tokio::fs::write(&path, snapshot)
          .await
          .with_context(|| format!("writing export {}", path.display()))?;
        writeln!(out, "exported to {}", path.display())?;
      }
    }
    // Handled before loading.
    Command::Reset => {}
  }

  if mutates {
    store.save().await.context("saving history")?;
  }
  Ok(())
}

fn one_based(n: usize, what: &str) -> Result<usize> {
  match n.checked_sub(1) {
    Some(index) => Ok(index),
    None => bail!("{what}s are numbered from 1"),
  }
}

#[cfg(test)]
mod tests {
  use std::path::PathBuf;

  use chrono::{DateTime, Duration, Utc};
  use timemark_core::{
    clock::ManualClock,
    point::Granularity,
    slot::MemorySlot,
    store::{DEFAULT_KEY, read_history},
  };

  use super::*;
  use crate::config::Backend;

  fn t0() -> DateTime<Utc> { DateTime::from_timestamp(1_760_860_800, 0).unwrap() }

  fn settings() -> Settings {
    Settings {
      backend:     Backend::Sqlite,
      data_path:   PathBuf::from("unused"),
      slot_key:    DEFAULT_KEY.to_string(),
      granularity: Granularity::Minutes,
    }
  }

  async fn exec(
    slot: &MemorySlot,
    clock: &ManualClock,
    timeline: Option<usize>,
    command: Command,
  ) -> Result<String> {
    let settings = settings();
    let ctx = Invocation { settings: &settings, timeline, tz: &Utc };
    let mut out = Vec::new();
    run(slot, clock, ctx, command, &mut out).await?;
    Ok(String::from_utf8(out).unwrap())
  }

  fn mark() -> Command { Command::Mark { flags: FlagArgs::default() } }

  #[tokio::test]
  async fn mark_prints_and_persists() {
    let slot = MemorySlot::new();
    let clock = ManualClock::new(t0());

    let first = exec(&slot, &clock, None, Command::Mark {
      flags: FlagArgs { wakeup: true, sleep: false },
    })
    .await
    .unwrap();
    assert_eq!(first, "08:00  (wakeup)\n");

    clock.advance(Duration::minutes(20));
    let second = exec(&slot, &clock, None, mark()).await.unwrap();
    assert_eq!(second, "  │ #1  20 mins\n08:20\n");

    let history = read_history(&slot, DEFAULT_KEY).await.unwrap();
    assert_eq!(history.current().mark_count(), 2);
    assert!(history.current().first_point().unwrap().is_wakeup());
  }

  #[tokio::test]
  async fn tag_and_flag_use_one_based_numbers() {
    let slot = MemorySlot::new();
    let clock = ManualClock::new(t0());
    exec(&slot, &clock, None, mark()).await.unwrap();
    clock.advance(Duration::minutes(45));
    exec(&slot, &clock, None, mark()).await.unwrap();

    let tagged = exec(&slot, &clock, None, Command::Tag { span: 1, text: "email".into() })
      .await
      .unwrap();
    assert_eq!(tagged, "#1  45 mins  email\n");

    let flagged = exec(&slot, &clock, None, Command::Flag {
      point: 2,
      flags: FlagArgs { wakeup: false, sleep: true },
    })
    .await
    .unwrap();
    assert_eq!(flagged, "08:45  (sleep)\n");

    let history = read_history(&slot, DEFAULT_KEY).await.unwrap();
    let span = history.current().span(0).unwrap();
    assert_eq!(span.tags(), ["email"]);
    assert!(span.end().is_sleep());

    let err = exec(&slot, &clock, None, Command::Tag { span: 0, text: "x".into() })
      .await
      .unwrap_err();
    assert!(err.to_string().contains("numbered from 1"));
    assert!(exec(&slot, &clock, None, Command::Tag { span: 2, text: "x".into() }).await.is_err());

    let huge = usize::MAX / 2 + 2;
    assert!(exec(&slot, &clock, None, Command::Tag { span: huge, text: "x".into() }).await.is_err());
    assert!(
      exec(&slot, &clock, None, Command::Flag { point: huge, flags: FlagArgs::default() })
        .await
        .is_err()
    );
    let history = read_history(&slot, DEFAULT_KEY).await.unwrap();
    assert_eq!(history.current().span(0).unwrap().tags(), ["email"]);
  }

  #[tokio::test]
  async fn new_and_list_walk_the_history() {
    let slot = MemorySlot::new();
    let clock = ManualClock::new(t0());
    exec(&slot, &clock, None, mark()).await.unwrap();
    clock.advance(Duration::days(1));

    let started = exec(&slot, &clock, None, Command::New).await.unwrap();
    assert_eq!(started, "started timeline 2 (20-10-2025)\n");

    let listed = exec(&slot, &clock, None, Command::List).await.unwrap();
    assert_eq!(listed, "    1  19-10-2025  1 marks\n*   2  20-10-2025  0 marks\n");

    let shown = exec(&slot, &clock, Some(1), Command::Show).await.unwrap();
    assert!(shown.starts_with("Timeline 19-10-2025 (1 marks)\n"));

    assert!(exec(&slot, &clock, Some(3), Command::Show).await.is_err());
  }

  #[tokio::test]
  async fn clear_leaves_one_empty_timeline() {
    let slot = MemorySlot::new();
    let clock = ManualClock::new(t0());
    exec(&slot, &clock, None, mark()).await.unwrap();
    exec(&slot, &clock, None, Command::New).await.unwrap();
    exec(&slot, &clock, None, Command::Clear).await.unwrap();

    let history = read_history(&slot, DEFAULT_KEY).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history.current().is_empty());
  }

  #[tokio::test]
  async fn corrupt_slot_suggests_reset_and_reset_recovers() {
    let slot = MemorySlot::with_entry(DEFAULT_KEY, "not json");
    let clock = ManualClock::new(t0());

    let err = exec(&slot, &clock, None, Command::Show).await.unwrap_err();
    assert!(err.to_string().contains("timemark reset"));
    assert_eq!(slot.get(DEFAULT_KEY).await.unwrap().as_deref(), Some("not json"));

    exec(&slot, &clock, None, Command::Reset).await.unwrap();
    let shown = exec(&slot, &clock, None, Command::Show).await.unwrap();
    assert!(shown.ends_with("no marks yet\n"));
  }

  #[tokio::test]
  async fn export_writes_a_dated_file() {
    let tmp = tempfile::tempdir().unwrap();
    let slot = MemorySlot::new();
    let clock = ManualClock::new(t0());
    exec(&slot, &clock, None, mark()).await.unwrap();

    let printed = exec(&slot, &clock, None, Command::Export {
      out:    tmp.path().to_path_buf(),
      stdout: false,
    })
    .await
    .unwrap();

    let path = tmp.path().join("timeline-export_19-10-2025.json");
    assert_eq!(printed, format!("exported to {}\n", path.display()));
    let written = std::fs::read_to_string(&path).unwrap();
    let reread = timemark_core::codec::decode_history(&written).unwrap();
    assert_eq!(reread, read_history(&slot, DEFAULT_KEY).await.unwrap());
  }

  #[tokio::test]
  async fn read_only_commands_do_not_rewrite_the_slot() {
    let slot = MemorySlot::new();
    let clock = ManualClock::new(t0());
    exec(&slot, &clock, None, mark()).await.unwrap();
    let before = slot.get(DEFAULT_KEY).await.unwrap();

    clock.advance(Duration::hours(1));
    exec(&slot, &clock, Some(1), Command::Show).await.unwrap();
    exec(&slot, &clock, None, Command::Export { out: PathBuf::from("."), stdout: true })
      .await
      .unwrap();

    assert_eq!(slot.get(DEFAULT_KEY).await.unwrap(), before);
  }
}

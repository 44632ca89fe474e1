//! `timemark`: record and review a timeline of marks from the terminal.
//!
//! # Usage
//!
//! ```
//! timemark mark --wakeup
//! timemark tag 1 email
//! timemark show
//! timemark --backend file --data-path ~/timemark export --out ~/exports
//! ```

mod commands;
mod config;
mod render;

use std::{io, path::PathBuf};

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use commands::{Command, Invocation};
use config::{Backend, ConfigFile, Overrides, Settings};
use timemark_core::{clock::SystemClock, point::Granularity, slot::SlotStore};
use timemark_store_file::FileSlot;
use timemark_store_sqlite::SqliteSlot;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "timemark", version, about = "Track how the day is spent, one mark at a time")]
struct Args {
  /// Path to a TOML config file (backend, data_path, slot_key, granularity).
  #[arg(short, long, value_name = "FILE", env = "TIMEMARK_CONFIG")]
  config: Option<PathBuf>,

  /// Storage backend.
  #[arg(long, value_enum, env = "TIMEMARK_BACKEND")]
  backend: Option<Backend>,

  /// Database file (sqlite) or slot directory (file).
  #[arg(long, value_name = "PATH", env = "TIMEMARK_DATA_PATH")]
  data_path: Option<PathBuf>,

  /// Slot key the history is stored under.
  #[arg(long, env = "TIMEMARK_KEY")]
  key: Option<String>,

  /// Unit used to measure spans: minutes or seconds.
  #[arg(long, env = "TIMEMARK_GRANULARITY")]
  granularity: Option<Granularity>,

  /// Act on this timeline (numbered from 1) instead of the most recent one.
  #[arg(short, long, global = true, value_name = "N")]
  timeline: Option<usize>,

  #[command(subcommand)]
  command: Command,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .with_writer(io::stderr)
    .init();

  let args = Args::parse();

  let file_cfg = match &args.config {
    Some(path) => ConfigFile::read(path)?,
    None => ConfigFile::default(),
  };
  let overrides = Overrides {
    backend:     args.backend,
    data_path:   args.data_path,
    slot_key:    args.key,
    granularity: args.granularity,
  };
  let settings = Settings::resolve(overrides, file_cfg);
  tracing::debug!(?settings, "resolved settings");

  match settings.backend {
    Backend::Sqlite => {
      let slot = SqliteSlot::open(&settings.data_path).await?;
      dispatch(slot, &settings, args.timeline, args.command).await
    }
    Backend::File => {
      let slot = FileSlot::open(&settings.data_path).await?;
      dispatch(slot, &settings, args.timeline, args.command).await
    }
  }
}

async fn dispatch<S: SlotStore>(
  slot: S,
  settings: &Settings,
  timeline: Option<usize>,
  command: Command,
) -> Result<()> {
  let ctx = Invocation { settings, timeline, tz: &Local };
  let mut stdout = io::stdout().lock();
  commands::run(slot, SystemClock, ctx, command, &mut stdout).await
}

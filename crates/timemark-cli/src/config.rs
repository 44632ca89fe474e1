//! Settings resolution: command-line flags, then the TOML config file, then
//! defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Deserialize;
use timemark_core::{point::Granularity, store::DEFAULT_KEY};

// ─── Backend ──────────────────────────────────────────────────────────────────

/// Where slots are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
  /// A single SQLite database file.
  #[default]
  Sqlite,
  /// A directory of JSON files, one per slot.
  File,
}

impl Backend {
  fn default_data_path(self) -> &'static str {
    match self {
      Self::Sqlite => "~/.local/share/timemark/timemark.db",
      Self::File => "~/.local/share/timemark/slots",
    }
  }
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file. Every key is optional.
#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
  pub backend:     Option<Backend>,
  pub data_path:   Option<PathBuf>,
  pub slot_key:    Option<String>,
  pub granularity: Option<Granularity>,
}

impl ConfigFile {
  pub fn read(path: &Path) -> Result<Self> {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    Self::parse(&raw).with_context(|| format!("parsing config file {}", path.display()))
  }

  pub fn parse(raw: &str) -> Result<Self> { Ok(toml::from_str(raw)?) }
}

// ─── Overrides ────────────────────────────────────────────────────────────────

/// Values given on the command line (or through `TIMEMARK_*` variables).
#[derive(Debug, Default, Clone)]
pub struct Overrides {
  pub backend:     Option<Backend>,
  pub data_path:   Option<PathBuf>,
  pub slot_key:    Option<String>,
  pub granularity: Option<Granularity>,
}

// ─── Settings ─────────────────────────────────────────────────────────────────

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
  pub backend:     Backend,
  pub data_path:   PathBuf,
  pub slot_key:    String,
  pub granularity: Granularity,
}

impl Settings {
  /// Command-line overrides win over the config file, which wins over
  /// defaults.
  pub fn resolve(overrides: Overrides, file: ConfigFile) -> Self {
    let backend = overrides.backend.or(file.backend).unwrap_or_default();
    let data_path = overrides
      .data_path
      .or(file.data_path)
      .unwrap_or_else(|| PathBuf::from(backend.default_data_path()));

    Self {
      backend,
      data_path: expand_tilde(&data_path),
      slot_key: overrides
        .slot_key
        .or(file.slot_key)
        .filter(|k| !k.is_empty())
        .unwrap_or_else(|| DEFAULT_KEY.to_string()),
      granularity: overrides.granularity.or(file.granularity).unwrap_or_default(),
    }
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/") {
    if let Ok(home) = std::env::var("HOME") {
      return PathBuf::from(home).join(rest);
    }
  }
  path.to_path_buf()
}

//! [`FileSlot`]: slots stored as JSON files in a directory.

use std::{
  io::ErrorKind,
  path::{Path, PathBuf},
};

use timemark_core::slot::SlotStore;
use tokio::io::AsyncWriteExt as _;

use crate::{Error, Result};

const EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "json.tmp";

/// A directory of slot files.
#[derive(Debug, Clone)]
pub struct FileSlot {
  dir: PathBuf,
}

impl FileSlot {
  /// Use `dir` for slot files, creating it if needed.
  pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
    let dir = dir.into();
    tokio::fs::create_dir_all(&dir)
      .await
      .map_err(|source| Error::Io { path: dir.clone(), source })?;
    tracing::debug!(dir = %dir.display(), "opened file slot store");
    Ok(Self { dir })
  }

  pub fn dir(&self) -> &Path { &self.dir }

  /// The file backing `key`.
  pub fn path_for(&self, key: &str) -> Result<PathBuf> {
    validate_key(key)?;
    Ok(self.dir.join(format!("{key}.{EXTENSION}")))
  }

  fn temp_path_for(&self, key: &str) -> PathBuf {
    self.dir.join(format!("{key}.{TEMP_EXTENSION}"))
  }
}

fn validate_key(key: &str) -> Result<()> {
  let bad = key.is_empty()
    || key == "."
    || key == ".."
    || key.contains(['/', '\\', '\0']);
  if bad {
    return Err(Error::InvalidKey(key.to_owned()));
  }
  Ok(())
}

// ─── SlotStore impl ──────────────────────────────────────────────────────────

impl SlotStore for FileSlot {
  type Error = Error;

  async fn get(&self, key: &str) -> Result<Option<String>> {
    let path = self.path_for(key)?;
    match tokio::fs::read_to_string(&path).await {
      Ok(text) => Ok(Some(text)),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
      Err(source) => Err(Error::Io { path, source }),
    }
  }

  async fn set(&self, key: &str, value: String) -> Result<()> {
    let path = self.path_for(key)?;
    let temp = self.temp_path_for(key);
    tracing::debug!(path = %path.display(), bytes = value.len(), "writing file slot");

    let written = async {
      write_synced(&temp, value.as_bytes())
        .await
        .map_err(|source| Error::Io { path: temp.clone(), source })?;
      tokio::fs::rename(&temp, &path)
        .await
        .map_err(|source| Error::Io { path: path.clone(), source })
    }
    .await;

    if written.is_err() {
      match tokio::fs::remove_file(&temp).await {
        Err(e) if e.kind() != ErrorKind::NotFound => {
          tracing::warn!(path = %temp.display(), error = %e, "could not remove temp slot file");
        }
        _ => {}
      }
    }
    written
  }
}

/// Write `data` to a fresh file at `path` and flush it to disk before
/// returning.
async fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
  let mut file = tokio::fs::File::create(path).await?;
  file.write_all(data).await?;
  file.sync_all().await
}

//! The `SlotStore` trait: the key-value persistence boundary.
//!
//! A slot holds one opaque string under a key. Backends (e.g.
//! `timemark-store-sqlite`, `timemark-store-file`) implement this trait;
//! [`TimelineStore`](crate::store::TimelineStore) depends only on it.

use std::{collections::HashMap, convert::Infallible, future::Future, sync::Mutex};

/// Abstraction over a durable key-value slot.
///
/// `set` replaces the whole value in one step: a reader never observes a
/// partially written value.
pub trait SlotStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// The value stored under `key`, or `None` if it was never written.
  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  /// Overwrite the value stored under `key`.
  fn set<'a>(
    &'a self,
    key: &'a str,
    value: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

impl<T: SlotStore> SlotStore for &T {
  type Error = T::Error;

  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a {
    (**self).get(key)
  }

  fn set<'a>(
    &'a self,
    key: &'a str,
    value: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a {
    (**self).set(key, value)
  }
}

// ─── In-memory slot──────────────────────────────────────────────────────────

/// A process-local slot map; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemorySlot {
  slots: Mutex<HashMap<String, String>>,
}

impl MemorySlot {
  pub fn new() -> Self { Self::default() }

  /// A slot map pre-populated with one entry.
  pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
    let slot = Self::new();
    slot.lock().insert(key.into(), value.into());
    slot
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
    self.slots.lock().unwrap_or_else(|e| e.into_inner())
  }
}

impl SlotStore for MemorySlot {
  type Error = Infallible;

  async fn get(&self, key: &str) -> Result<Option<String>, Infallible> {
    Ok(self.lock().get(key).cloned())
  }

  async fn set(&self, key: &str, value: String) -> Result<(), Infallible> {
    self.lock().insert(key.to_owned(), value);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn missing_key_is_none() {
    let slot = MemorySlot::new();
    assert_eq!(slot.get("nothing").await.unwrap(), None);
  }

  #[tokio::test]
  async fn set_overwrites() {
    let slot = MemorySlot::with_entry("k", "one");
    slot.set("k", "two".into()).await.unwrap();
    assert_eq!(slot.get("k").await.unwrap().as_deref(), Some("two"));
  }
}

//! [`TimelineStore`]: the bridge between a [`History`] and its persisted
//! slot.
//!
//! The whole history is persisted as one `$type`-tagged JSON array under a
//! single key. Loading either decodes that document or, when the slot has
//! never been written, creates and immediately persists a fresh history.
//! Every other mutation stays in memory until [`TimelineStore::save`].

use crate::{
  Error, Result,
  clock::{Clock, SystemClock},
  codec,
  history::History,
  point::BoundaryFlags,
  slot::SlotStore,
  timeline::{Mark, Timeline},
};

/// The slot key used when the caller has no preference.
pub const DEFAULT_KEY: &str = "timelineHistory";

/// A loaded history bound to the slot it came from.
pub struct TimelineStore<S, C = SystemClock> {
  slot:    S,
  clock:   C,
  key:     String,
  history: History,
}

impl<S: SlotStore, C: Clock> TimelineStore<S, C> {
  /// Load the history stored under `key`.
  ///
  /// An absent slot is initialized with a single empty timeline and written
  /// back before returning. Corrupt data is returned as [`Error::Corrupt`];
  /// recovering from it (e.g. with [`TimelineStore::reset`]) is the caller's
  /// decision.
  pub async fn load(slot: S, clock: C, key: impl Into<String>) -> Result<Self> {
    let key = key.into();
    match read_history(&slot, &key).await {
      Ok(history) => Ok(Self { slot, clock, key, history }),
      Err(Error::Absent { .. }) => {
        tracing::info!(%key, "no persisted history; starting a new one");
        Self::reset(slot, clock, key).await
      }
      Err(e) => {
        if e.is_corrupt() {
          tracing::warn!(%key, error = %e, "persisted history is corrupt");
        }
        Err(e)
      }
    }
  }

  /// Replace whatever is stored under `key` with a fresh history holding one
  /// empty timeline, and persist it.
  pub async fn reset(slot: S, clock: C, key: impl Into<String>) -> Result<Self> {
    let key = key.into();
    let history = History::new(clock.now()?);
    let store = Self { slot, clock, key, history };
    store.save().await?;
    Ok(store)
  }

  /// Overwrite the slot with the full history.
  pub async fn save(&self) -> Result<()> {
    let document = codec::encode_history(&self.history)?;
    tracing::debug!(key = %self.key, bytes = document.len(), "saving history");
    self
      .slot
      .set(&self.key, document)
      .await
      .map_err(|e| Error::Slot(Box::new(e)))
  }

  // ── In-memory operations ─────────────────────────────────────────────────

  /// Start a new empty timeline and make it current. Not persisted until
  /// [`save`](Self::save).
  pub fn new_timeline(&mut self) -> Result<&Timeline> {
    let now = self.clock.now()?;
    let timeline: &Timeline = self.history.new_timeline(now);
    Ok(timeline)
  }

  /// Discard every timeline and start over with one empty timeline. Not
  /// persisted until [`save`](Self::save).
  pub fn clear(&mut self) -> Result<()> {
    let now = self.clock.now()?;
    self.history.clear(now);
    Ok(())
  }

  /// Record a mark on the current timeline.
  pub fn add_mark(&mut self, flags: BoundaryFlags) -> Result<&[Mark]> {
    self.history.current_mut().add_mark(&self.clock, flags)
  }

  /// Make the timeline at `index` (zero-based) current.
  pub fn select(&mut self, index: usize) -> Result<&Timeline> {
    let timeline: &Timeline = self.history.select(index)?;
    Ok(timeline)
  }

  // ── Export ───────────────────────────────────────────────────────────────

  /// The full history as indented JSON. Has no effect on the store.
  pub fn export_snapshot(&self) -> Result<String> {
    Ok(codec::encode_history_pretty(&self.history)?)
  }

  /// `timeline-export_<DD-MM-YYYY>.json`, dated by the current timeline.
  pub fn export_file_name(&self) -> String {
    format!("timeline-export_{}.json", self.history.current().date_label())
  }

  // ── Accessors ────────────────────────────────────────────────────────────

  pub fn history(&self) -> &History { &self.history }

  pub fn history_mut(&mut self) -> &mut History { &mut self.history }

  pub fn current(&self) -> &Timeline { self.history.current() }

  pub fn current_mut(&mut self) -> &mut Timeline { self.history.current_mut() }

  pub fn key(&self) -> &str { &self.key }

  pub fn slot(&self) -> &S { &self.slot }
}

/// Read and decode the history under `key` without initializing anything.
pub async fn read_history<S: SlotStore>(slot: &S, key: &str) -> Result<History> {
  let raw = slot
    .get(key)
    .await
    .map_err(|e| Error::Slot(Box::new(e)))?
    .ok_or_else(|| Error::Absent { key: key.to_owned() })?;
  tracing::debug!(%key, bytes = raw.len(), "read persisted history");
  Ok(codec::decode_history(&raw)?)
}

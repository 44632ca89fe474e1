//! Core types for the Timemark time-tracking timeline.
//!
//! A [`Timeline`](timeline::Timeline) is grown one mark at a time; each mark
//! after the first also produces a [`TimeSpan`](span::TimeSpan) covering the
//! time since the previous mark. Timelines are collected in a
//! [`History`](history::History), which [`TimelineStore`](store::TimelineStore)
//! loads from and saves to a key-value [`SlotStore`](slot::SlotStore).
//!
//! This crate is free of database and filesystem dependencies; backends live
//! in their own crates.

pub mod clock;
pub mod codec;
pub mod error;
pub mod history;
pub mod point;
pub mod slot;
pub mod span;
pub mod store;
pub mod timeline;

pub use error::{Error, Result};
